// Library for tests to access modules

pub mod aggregation;
pub mod classify;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod recommendations;
pub mod registry;
pub mod routes;
pub mod store;
pub mod valve;
pub mod worker;

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");
