//! HTTP surface for the extraction pipeline.
//!
//! A thin axum layer: one upload endpoint, a health probe, and the error
//! translation in [`error`]. This module is the *sole* place pipeline
//! errors become HTTP responses — everything below it returns
//! [`ExtractError`](crate::ExtractError) untouched.
//!
//! Requests are fully independent: [`AppState`] is immutable after startup
//! (client and config behind `Arc`), so no lock is held across the model
//! call.

mod api;
mod error;

pub use api::UPLOAD_FIELD;
pub use error::ApiError;

use crate::config::ExtractionConfig;
use crate::pipeline::model::ModelClient;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The model client; a live provider in production, a stub in tests.
    pub client: Arc<dyn ModelClient>,
    /// Pipeline configuration, fixed at startup.
    pub config: Arc<ExtractionConfig>,
}

impl AppState {
    pub fn new(client: Arc<dyn ModelClient>, config: ExtractionConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

/// Build the API router.
///
/// Static-asset and observability layers are wired by the binary; keeping
/// them out of here lets integration tests drive exactly the routes that
/// carry the contract.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(api::handle_health))
        .route(
            "/api/extract-loan-details/",
            post(api::handle_extract_loan_details),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
