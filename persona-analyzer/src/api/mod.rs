//! HTTP API handlers for persona-analyzer

pub mod analyze;
pub mod health;

pub use analyze::{analyze_routes, AnalyzeRequest, AnalyzeResponse};
pub use health::health_routes;
