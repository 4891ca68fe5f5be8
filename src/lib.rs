pub mod config;
pub mod error;
pub mod evaluation;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
