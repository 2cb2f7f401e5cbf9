use std::path::PathBuf;

use clap::Parser;

/// Serves cardiovascular disease predictions from a pre-trained model.
#[derive(Debug, Clone, Parser)]
#[command(name = "cvd-backend", version, about)]
pub struct Config {
    /// ONNX export of the fitted classifier.
    #[arg(long, env = "CVD_MODEL_PATH", default_value = "heart_model.onnx")]
    pub model: PathBuf,

    /// JSON list of field names in the order the model expects them.
    #[arg(long, env = "CVD_FEATURE_ORDER", default_value = "feature_order.json")]
    pub feature_order: PathBuf,

    #[arg(long, env = "CVD_BIND", default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// Largest accepted `/predict` body in bytes.
    #[arg(long, env = "CVD_MAX_BODY_BYTES", default_value_t = crate::DEFAULT_BODY_LIMIT)]
    pub max_body_bytes: usize,

    /// Log filter, e.g. `info` or `cvd_backend=debug,actix_web=info`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_artifact_names() {
        let config = Config::try_parse_from(["cvd-backend"]).unwrap();
        assert_eq!(config.model, PathBuf::from("heart_model.onnx"));
        assert_eq!(config.feature_order, PathBuf::from("feature_order.json"));
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(config.max_body_bytes, 256 * 1024);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "cvd-backend",
            "--model",
            "/srv/model.onnx",
            "--bind",
            "0.0.0.0:8080",
            "--max-body-bytes",
            "1024",
        ])
        .unwrap();
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.model, PathBuf::from("/srv/model.onnx"));
        assert_eq!(config.bind, "0.0.0.0:8080");
    }
}
