pub mod commands;
pub mod config;
pub mod dates;
pub mod intake;
pub mod models;
pub mod schedule;
pub mod scanner;
pub mod service;
pub mod stock;
pub mod store;

pub use config::AdapterConfig;
pub use service::MedPlanService;
pub use store::{SqliteStore, StateStore, StoreError};
