/// Shared modules used across the application
pub mod config;

// Re-export commonly used items
pub use config::Config;
