pub mod aggregation;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod report;
pub mod services;
pub mod state;
pub mod store;
