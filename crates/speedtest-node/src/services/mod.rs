//! Измерения: поток скачивания и приём выгрузки.

pub mod download_service;
pub mod upload_service;
