pub mod app;
pub mod config;
pub mod reply;
pub mod telegram;

pub use app::{run, run_from_default_config};
pub use config::AppConfig;
