//! Сущности базы данных реестра узлов speedtest.

pub mod servers;
