// Library for the two binaries and for tests

pub mod analysis;
pub mod charts;
pub mod config;
pub mod logging;
pub mod models;
pub mod provider;
pub mod result_store;
pub mod scheduler;
pub mod version;
