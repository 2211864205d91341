//! Data domain: CSV ingestion and train/test splitting.

pub mod domain;
pub mod service;

pub use domain::Dataset;
