pub mod app;
pub mod commands;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod interact;
pub mod runtime;
