pub mod cli;
pub mod error;
pub mod mapping;
pub mod model;
pub mod postprocess;
pub mod preprocess;
pub mod routes;
pub mod service;
pub mod translate;

pub use crate::cli::Args;
pub use crate::error::{Error, RecognizeError};
pub use crate::mapping::{ClassMapping, load_class_mapping};
pub use crate::model::{Classifier, ModelBackend, load_classifier};
pub use crate::postprocess::{Prediction, top1};
pub use crate::preprocess::{PreprocessConfig, Processor};
pub use crate::routes::router;
pub use crate::service::{ModelSource, Recognition, ServiceContext};
pub use crate::translate::translate;
