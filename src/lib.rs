// Library for the binary and for tests

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod history;
pub mod models;
pub mod monitor;
pub mod rate;
pub mod samplers;
pub mod version;
