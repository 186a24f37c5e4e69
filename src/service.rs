use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, RecognizeError, Result};
use crate::mapping::{ClassMapping, load_class_mapping};
use crate::model::{Classifier, ModelBackend, load_classifier};
use crate::postprocess::top1;
use crate::preprocess::Processor;
use crate::translate::translate;

/// Successful `/reconocer` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub herramienta: String,
    pub confianza: f32,
}

/// Where the model comes from.
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub backend: ModelBackend,
    pub classes: PathBuf,
    pub weights: PathBuf,
    pub cuda: bool,
}

/// Read-only state shared by every request.
pub struct ServiceContext {
    classifier: Option<Arc<dyn Classifier>>,
    classes: ClassMapping,
    processor: Processor,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("classifier", &self.classifier.as_ref().map(|c| c.name()))
            .field("classes", &self.classes.len())
            .field("processor", &self.processor)
            .finish()
    }
}

impl ServiceContext {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        classes: ClassMapping,
        processor: Processor,
    ) -> Self {
        Self {
            classifier,
            classes,
            processor,
        }
    }

    /// Loads the class index and the model. Failures are logged and leave
    /// the service running without a model.
    pub fn load(source: &ModelSource, processor: Processor) -> Self {
        let _span = tracing::info_span!(
            "model_load",
            classes = %source.classes.display(),
            weights = %source.weights.display(),
        )
        .entered();
        Self::load_with(processor, |processor| Self::try_load(source, processor))
    }

    /// Runs `loader` and keeps whatever it produced. An error or a panic
    /// (the dynamically loaded ONNX Runtime panics when its library is
    /// missing) leaves the model unset.
    pub fn load_with<F>(processor: Processor, loader: F) -> Self
    where
        F: FnOnce(&Processor) -> Result<(Arc<dyn Classifier>, ClassMapping)>,
    {
        match panic::catch_unwind(AssertUnwindSafe(|| loader(&processor))) {
            Ok(Ok((classifier, classes))) => {
                tracing::info!(
                    backend = classifier.name(),
                    classes = classes.len(),
                    "model ready"
                );
                Self::new(Some(classifier), classes, processor)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "failed to load model, recognition disabled");
                Self::new(None, ClassMapping::default(), processor)
            }
            Err(payload) => {
                tracing::error!(
                    panic = panic_message(payload.as_ref()),
                    "model loader panicked, recognition disabled"
                );
                Self::new(None, ClassMapping::default(), processor)
            }
        }
    }

    fn try_load(
        source: &ModelSource,
        processor: &Processor,
    ) -> Result<(Arc<dyn Classifier>, ClassMapping)> {
        let classes = load_class_mapping(&source.classes)?;
        tracing::info!(classes = classes.len(), "class index loaded");

        tracing::info!(path = %source.weights.display(), "loading weights");
        let classifier = load_classifier(
            source.backend,
            &source.weights,
            classes.len(),
            &processor.config,
            source.cuda,
        )?;
        Ok((classifier, classes))
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn classes(&self) -> &ClassMapping {
        &self.classes
    }

    /// The classifier, or the error every recognition gets without one.
    pub fn classifier(&self) -> Result<&dyn Classifier, RecognizeError> {
        self.classifier.as_deref().ok_or(RecognizeError::ModelNotLoaded)
    }

    /// Decode, classify and translate one uploaded image.
    pub fn recognize(&self, image: &[u8]) -> Result<Recognition, RecognizeError> {
        let classifier = self.classifier()?;

        let batch = self.processor.decode(image)?;
        let probabilities = classifier.predict(&batch)?;
        let prediction = top1(&probabilities)
            .ok_or_else(|| Error::Inference("model returned no usable probabilities".to_string()))?;

        let label = self.classes.resolve(prediction.index);
        let herramienta = translate(label);
        tracing::debug!(
            index = prediction.index,
            label,
            herramienta = %herramienta,
            confianza = prediction.confidence,
            "prediction"
        );

        Ok(Recognition {
            herramienta,
            confianza: prediction.confidence,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(&message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
