use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cvd_backend::classifier::OnnxClassifier;
use cvd_backend::config::Config;
use cvd_backend::features::FeatureOrder;
use cvd_backend::{configure, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let feature_order = FeatureOrder::load(&config.feature_order).with_context(|| {
        format!("loading feature order from {}", config.feature_order.display())
    })?;
    let classifier = OnnxClassifier::load(&config.model, &feature_order)
        .with_context(|| format!("loading model from {}", config.model.display()))?;

    info!(
        model = %config.model.display(),
        features = feature_order.len(),
        inputs = classifier.input_count(),
        "model loaded"
    );

    let state = web::Data::new(
        AppState::new(Arc::new(classifier), feature_order).with_body_limit(config.max_body_bytes),
    );

    info!(bind = %config.bind, "server starting");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.bind)
    .with_context(|| format!("binding {}", config.bind))?
    .run()
    .await?;

    Ok(())
}
