pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ui;
