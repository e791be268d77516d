//! # Data Models
//!
//! SeaORM entity models and shared API types for the Reports service.

pub mod connector;
pub mod report_history;
pub mod tenant;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic service information returned by the root endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// Service name
    #[schema(example = "reports")]
    pub name: String,
    /// Service version
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
