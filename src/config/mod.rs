/// Database configuration and connection management
pub mod database;

/// Economy settings loading from economy.toml
pub mod economy;
