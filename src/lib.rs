pub mod app;
pub mod config;
pub mod engine;
pub mod event;
pub mod store;
pub mod ui;
