//! Сервисы каталога: реестр, проверка, ранжирование.

pub mod admin_service;
pub mod probe_service;
pub mod registry_service;
pub mod selection_service;
pub mod worker_pool;
