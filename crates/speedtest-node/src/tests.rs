//! Тесты HTTP API узла: конфигурация, задержка, скачивание и выгрузка.

#[cfg(test)]
mod tests {
    use crate::config::{NodeConfig, MAX_DURATION_CEILING};
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.max_streams, 16);
        assert_eq!(config.max_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_max_duration_is_capped() {
        let config = NodeConfig {
            max_duration_sec: u64::MAX,
            ..NodeConfig::default()
        };
        assert_eq!(config.max_duration(), MAX_DURATION_CEILING);
    }

    // ── Интеграционные тесты: маршруты узла ───────────────────────────────────

    mod integration {
        use crate::api::{build_router, NodeState};
        use crate::config::NodeConfig;
        use crate::services::download_service::{random_block, BLOCK_SIZE};
        use axum::body::Body;
        use axum::http::{header, Request, StatusCode};
        use axum::response::Response;
        use axum::Router;
        use futures_util::StreamExt;
        use serde_json::Value;
        use std::sync::Arc;
        use std::time::{Duration, Instant};
        use tower::ServiceExt;

        fn test_app(config: NodeConfig) -> Router {
            let state = NodeState {
                config: Arc::new(config),
                block: random_block(BLOCK_SIZE).unwrap(),
            };
            build_router(state)
        }

        fn node_config() -> NodeConfig {
            NodeConfig {
                node_id: "node-dps-1".to_string(),
                region: "id-dps".to_string(),
                ..NodeConfig::default()
            }
        }

        async fn get(app: &Router, uri: &str) -> Response {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(req).await.unwrap()
        }

        async fn post(app: &Router, uri: &str, body: Body) -> Response {
            let req = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/octet-stream")
                .body(body)
                .unwrap();
            app.clone().oneshot(req).await.unwrap()
        }

        /// Прочитать тело ответа, считая байты без накопления.
        async fn count_body(response: Response) -> u64 {
            let mut stream = response.into_body().into_data_stream();
            let mut total = 0u64;
            while let Some(chunk) = stream.next().await {
                total += chunk.unwrap().len() as u64;
            }
            total
        }

        async fn json_body(response: Response) -> Value {
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        #[tokio::test]
        async fn test_config_reports_node_identity() {
            let app = test_app(node_config());
            let response = get(&app, "/api/v1/config").await;
            assert_eq!(response.status(), StatusCode::OK);

            let body = json_body(response).await;
            assert_eq!(body["nodeId"], "node-dps-1");
            assert_eq!(body["region"], "id-dps");
            assert_eq!(body["maxStreams"], 16);
            assert_eq!(body["maxDurationSec"], 30);
        }

        #[tokio::test]
        async fn test_latency_is_empty_no_content() {
            let app = test_app(node_config());
            let response = get(&app, "/api/v1/latency?t=12345").await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
            assert_eq!(count_body(response).await, 0);
        }

        #[tokio::test]
        async fn test_healthz() {
            let app = test_app(node_config());
            let response = get(&app, "/healthz").await;
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&bytes[..], b"ok");
        }

        #[tokio::test]
        async fn test_download_by_bytes_overshoots_less_than_one_block() {
            let app = test_app(node_config());
            let response = get(&app, "/api/v1/download?bytes=5000000").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/octet-stream"
            );

            let total = count_body(response).await;
            assert!(total >= 5_000_000, "получено {total}");
            assert!(total < 5_000_000 + BLOCK_SIZE as u64, "получено {total}");
        }

        #[tokio::test]
        async fn test_download_by_time_stops_after_deadline() {
            let app = test_app(node_config());
            let start = Instant::now();
            let response = get(&app, "/api/v1/download?time=1").await;
            let total = count_body(response).await;
            let elapsed = start.elapsed();

            assert!(total > 0);
            assert!(elapsed >= Duration::from_secs(1), "длилось {elapsed:?}");
            assert!(elapsed < Duration::from_secs(3), "длилось {elapsed:?}");
        }

        #[tokio::test]
        async fn test_download_time_is_clamped_to_max_duration() {
            let app = test_app(NodeConfig {
                max_duration_sec: 1,
                ..node_config()
            });
            let start = Instant::now();
            let response = get(&app, "/api/v1/download?time=60").await;
            count_body(response).await;
            assert!(start.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_download_without_limits_is_empty() {
            let app = test_app(node_config());
            let response = get(&app, "/api/v1/download").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(count_body(response).await, 0);
        }

        #[tokio::test]
        async fn test_download_rejects_non_numeric_time() {
            let app = test_app(node_config());
            let response = get(&app, "/api/v1/download?time=abc").await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_upload_counts_full_body() {
            let app = test_app(node_config());
            let response = post(&app, "/api/v1/upload", Body::from(vec![42u8; 3_000_000])).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

            let body = json_body(response).await;
            assert_eq!(body["receivedBytes"], 3_000_000);
            assert!(body["durationMs"].is_u64());
        }

        #[tokio::test]
        async fn test_upload_never_closing_is_cut_off() {
            let app = test_app(node_config());
            let stalled = futures_util::stream::once(async {
                Ok::<_, std::io::Error>(bytes::Bytes::from(vec![0u8; 64 * 1024]))
            })
            .chain(futures_util::stream::pending());

            let start = Instant::now();
            let response = tokio::time::timeout(
                Duration::from_secs(6),
                post(&app, "/api/v1/upload?time=1", Body::from_stream(stalled)),
            )
            .await
            .expect("выгрузка должна завершиться по отсечке");
            let elapsed = start.elapsed();

            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["receivedBytes"], 64 * 1024);
            let duration_ms = body["durationMs"].as_u64().unwrap();
            assert!(duration_ms >= 2000, "durationMs = {duration_ms}");
            assert!(duration_ms < 3000, "durationMs = {duration_ms}");
            assert!(elapsed >= Duration::from_secs(2), "длилось {elapsed:?}");
            assert!(elapsed < Duration::from_secs(4), "длилось {elapsed:?}");
        }
    }
}
