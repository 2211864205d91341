// lib.rs - heart-disease risk scoring core
pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
pub mod training;

pub use common::{AppCfg, CardioError, CardioResult};
pub use inference::ServiceContext;
