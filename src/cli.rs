use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::model::ModelBackend;
use crate::service::ModelSource;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Hand tool recognition service", long_about = None)]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// JSON object mapping class label to output index
    #[arg(long, env = "CLASSES_PATH", default_value = "clases_herramientas_traductor.json")]
    pub classes: PathBuf,

    /// Weights record (burn) or model graph (onnx)
    #[arg(long, env = "WEIGHTS_PATH", default_value = "pesos_herramientas.mpk")]
    pub weights: PathBuf,

    #[arg(long, env = "MODEL_BACKEND", value_enum, default_value_t = ModelBackend::Burn)]
    pub backend: ModelBackend,

    /// Use the CUDA execution provider (onnx backend only)
    #[arg(long)]
    pub cuda: bool,

    /// Verbose logging
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 20)]
    pub max_upload_mb: usize,
}

impl Args {
    pub fn model_source(&self) -> ModelSource {
        ModelSource {
            backend: self.backend,
            classes: self.classes.clone(),
            weights: self.weights.clone(),
            cuda: self.cuda,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    /// `RUST_LOG` style filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "tool_recognizer=debug,tower_http=debug"
        } else {
            "tool_recognizer=info,tower_http=info"
        }
    }

    /// `RUST_LOG` when it is set and parses, the default filter otherwise.
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_log_filter()))
    }
}
