use crate::core::{Classification, ResultError};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Registers an image file with the platform and returns its descriptor.
///
/// Persistence is the platform's concern; the body only keeps what the
/// registrar hands back.
pub trait AttachmentRegistrar: Send + Sync {
    fn register(
        &self,
        path: &Path,
        name: &str,
        description: &str,
        classification: Option<&Classification>,
    ) -> anyhow::Result<Value>;
}

#[derive(Clone)]
pub struct ImageBody {
    registrar: Arc<dyn AttachmentRegistrar>,
    images: Vec<Value>,
}

impl ImageBody {
    pub fn new(registrar: Arc<dyn AttachmentRegistrar>) -> Self {
        Self {
            registrar,
            images: Vec::new(),
        }
    }

    pub fn add_image(
        &mut self,
        path: impl AsRef<Path>,
        name: &str,
        description: &str,
        classification: Option<&Classification>,
    ) -> Result<(), ResultError> {
        let descriptor = self
            .registrar
            .register(path.as_ref(), name, description, classification)
            .map_err(|e| ResultError::Attachment {
                name: name.to_string(),
                reason: format!("{e:#}"),
            })?;
        self.images.push(descriptor);
        Ok(())
    }

    pub fn images(&self) -> &[Value] {
        &self.images
    }

    pub(crate) fn payload(&self) -> Value {
        Value::Array(self.images.clone())
    }
}

impl fmt::Debug for ImageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBody")
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}
