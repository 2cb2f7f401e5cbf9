pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use actix_web::web;

use classifier::Classifier;
use features::{DefaultPolicy, FeatureOrder};

/// Read-only state shared by every worker.
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub feature_order: FeatureOrder,
    pub policy: DefaultPolicy,
    /// Largest `/predict` body accepted, in bytes.
    pub body_limit: usize,
}

pub const DEFAULT_BODY_LIMIT: usize = 256 * 1024;

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, feature_order: FeatureOrder) -> Self {
        Self {
            classifier,
            feature_order,
            policy: DefaultPolicy::standard(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::home)))
        .service(web::resource("/predict").route(web::post().to(handlers::predict)))
        .service(web::resource("/health").route(web::get().to(handlers::health)));
}
