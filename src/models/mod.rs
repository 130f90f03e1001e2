//! Models Module
//!
//! Request/response bodies for the operational HTTP surface.

mod responses;

pub use responses::{ClearResponse, HealthResponse, StatsResponse, SweepResponse};
