pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod report;
pub mod session;
pub mod stats;
