// src/lib.rs
pub mod client;
pub mod config;
pub mod health;
pub mod launcher;
pub mod metrics;
pub mod proxy;
pub mod server;
