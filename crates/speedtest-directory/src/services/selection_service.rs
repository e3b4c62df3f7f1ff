//! Ранжирование и выбор узлов для клиентов.
//!
//! Каждый вызов читает реестр заново: кэша перед хранилищем нет.

use crate::error::AppError;
use crate::services::registry_service::RegistryStore;
use speedtest_entities::servers::{Model, ServerStatus};
use std::cmp::Ordering;

/// Порядок активных узлов: `load` ↑, затем `last_latency_ms` ↑ (без замера — в конце),
/// затем `updated_at` ↓, затем `id` ↑.
pub fn active_order(a: &Model, b: &Model) -> Ordering {
    a.load
        .total_cmp(&b.load)
        .then_with(|| match (a.last_latency_ms, b.last_latency_ms) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Оставить только узлы со статусом UP и упорядочить их.
pub fn rank_active(servers: Vec<Model>) -> Vec<Model> {
    let mut active: Vec<Model> = servers
        .into_iter()
        .filter(|s| s.status == ServerStatus::Up)
        .collect();
    active.sort_by(active_order);
    active
}

/// Все записи, самые свежие первыми.
pub fn order_all(mut servers: Vec<Model>) -> Vec<Model> {
    servers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    servers
}

/// Первый узел нужного региона, иначе первый узел вообще.
pub fn pick_best(ranked: &[Model], region: Option<&str>) -> Option<Model> {
    region
        .and_then(|r| ranked.iter().find(|s| s.region == r))
        .or_else(|| ranked.first())
        .cloned()
}

/// Активные узлы в порядке ранжирования; `region` оставляет только узлы этого региона.
pub async fn list_active(
    store: &dyn RegistryStore,
    region: Option<&str>,
) -> Result<Vec<Model>, AppError> {
    let ranked = rank_active(store.list_all().await?);
    Ok(match region {
        Some(r) => ranked.into_iter().filter(|s| s.region == r).collect(),
        None => ranked,
    })
}

pub async fn list_all(store: &dyn RegistryStore) -> Result<Vec<Model>, AppError> {
    Ok(order_all(store.list_all().await?))
}

/// Выбрать лучший узел. `None`, если активных узлов нет.
pub async fn choose(
    store: &dyn RegistryStore,
    region: Option<&str>,
) -> Result<Option<Model>, AppError> {
    let ranked = rank_active(store.list_all().await?);
    Ok(pick_best(&ranked, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn server(id: &str, region: &str, load: f64, latency: Option<f64>, age_secs: i64) -> Model {
        let base = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let updated = base - Duration::seconds(age_secs);
        Model {
            id: id.to_string(),
            region: region.to_string(),
            city: "Denpasar".to_string(),
            url: format!("http://{id}.example.com"),
            status: ServerStatus::Up,
            load,
            last_ping_at: Some(updated),
            last_latency_ms: latency,
            created_at: base - Duration::days(1),
            updated_at: updated,
        }
    }

    fn ids(servers: &[Model]) -> Vec<&str> {
        servers.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_rank_load_then_latency_nulls_last() {
        let a = server("a", "r1", 1.0, Some(50.0), 0);
        let b = server("b", "r1", 1.0, None, 0);
        let c = server("c", "r1", 0.0, Some(999.0), 0);

        let ranked = rank_active(vec![a, b, c]);
        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_rank_ties_broken_by_freshest_update() {
        let old = server("old", "r1", 0.5, Some(10.0), 120);
        let fresh = server("fresh", "r1", 0.5, Some(10.0), 5);

        let ranked = rank_active(vec![old, fresh]);
        assert_eq!(ids(&ranked), vec!["fresh", "old"]);
    }

    #[test]
    fn test_rank_excludes_down_and_unknown() {
        let up = server("up", "r1", 0.0, Some(1.0), 0);
        let mut down = server("down", "r1", 0.0, Some(1.0), 0);
        down.status = ServerStatus::Down;
        let mut unknown = server("unknown", "r1", 0.0, None, 0);
        unknown.status = ServerStatus::Unknown;

        let ranked = rank_active(vec![down, up, unknown]);
        assert_eq!(ids(&ranked), vec!["up"]);
    }

    #[test]
    fn test_rank_equal_keys_ordered_by_id_regardless_of_read_order() {
        let first = server("first", "r1", 0.0, None, 0);
        let second = server("second", "r1", 0.0, None, 0);

        let ranked = rank_active(vec![first.clone(), second.clone()]);
        assert_eq!(ids(&ranked), vec!["first", "second"]);

        let ranked = rank_active(vec![second, first]);
        assert_eq!(ids(&ranked), vec!["first", "second"]);
    }

    #[test]
    fn test_pick_best_prefers_region() {
        let ranked = rank_active(vec![
            server("jkt", "id-jkt", 0.0, Some(5.0), 0),
            server("dps", "id-dps", 0.3, Some(40.0), 0),
        ]);

        let best = pick_best(&ranked, Some("id-dps")).unwrap();
        assert_eq!(best.id, "dps");
    }

    #[test]
    fn test_pick_best_falls_back_to_global_first() {
        let ranked = rank_active(vec![
            server("jkt", "id-jkt", 0.0, Some(5.0), 0),
            server("dps", "id-dps", 0.3, Some(40.0), 0),
        ]);

        let best = pick_best(&ranked, Some("sg-sin")).unwrap();
        assert_eq!(best.id, "jkt");

        let best = pick_best(&ranked, None).unwrap();
        assert_eq!(best.id, "jkt");
    }

    #[test]
    fn test_pick_best_empty() {
        assert!(pick_best(&[], Some("id-dps")).is_none());
        assert!(pick_best(&[], None).is_none());
    }

    #[test]
    fn test_order_all_newest_first_regardless_of_status() {
        let mut down = server("down", "r1", 0.0, None, 1);
        down.status = ServerStatus::Down;
        let up = server("up", "r1", 0.0, Some(3.0), 60);
        let mut unknown = server("unknown", "r1", 0.0, None, 0);
        unknown.status = ServerStatus::Unknown;

        let all = order_all(vec![up, down, unknown]);
        assert_eq!(ids(&all), vec!["unknown", "down", "up"]);
    }
}
