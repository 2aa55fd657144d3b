use crate::body::TextBody;
use crate::core::classification::Classification;
use crate::core::sanitize::{SafeStr, TextSanitizer};
use crate::heuristics::{AttackIdentifierResolver, AttackMap, HeuristicCatalog};
use crate::manifest::ServiceManifest;
use std::fmt;
use std::sync::Arc;

/// Collaborators injected into every heuristic and section of a result.
///
/// One context is shared (behind an `Arc`) by all sections of a result, and
/// may be shared by many results built from the same service manifest.
#[derive(Clone)]
pub struct ResultContext {
    catalog: Arc<dyn HeuristicCatalog>,
    attack_resolver: Arc<dyn AttackIdentifierResolver>,
    sanitizer: Arc<dyn TextSanitizer>,
    default_classification: Classification,
}

impl ResultContext {
    /// Context with an empty attack map, the default sanitizer and the
    /// default classification.
    pub fn new(catalog: impl HeuristicCatalog + 'static) -> Self {
        Self {
            catalog: Arc::new(catalog),
            attack_resolver: Arc::new(AttackMap::default()),
            sanitizer: Arc::new(SafeStr),
            default_classification: Classification::default(),
        }
    }

    pub fn from_manifest(manifest: &ServiceManifest, attack_map: AttackMap) -> Self {
        Self::new(manifest.heuristic_table())
            .with_attack_resolver(attack_map)
            .with_default_classification(manifest.default_result_classification.as_str())
    }

    pub fn with_attack_resolver(mut self, resolver: impl AttackIdentifierResolver + 'static) -> Self {
        self.attack_resolver = Arc::new(resolver);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: impl TextSanitizer + 'static) -> Self {
        self.sanitizer = Arc::new(sanitizer);
        self
    }

    pub fn with_default_classification(mut self, classification: impl Into<Classification>) -> Self {
        self.default_classification = classification.into();
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn catalog(&self) -> &dyn HeuristicCatalog {
        self.catalog.as_ref()
    }

    pub fn attack_resolver(&self) -> &dyn AttackIdentifierResolver {
        self.attack_resolver.as_ref()
    }

    pub(crate) fn attack_resolver_handle(&self) -> Arc<dyn AttackIdentifierResolver> {
        Arc::clone(&self.attack_resolver)
    }

    pub(crate) fn sanitizer_handle(&self) -> Arc<dyn TextSanitizer> {
        Arc::clone(&self.sanitizer)
    }

    pub fn default_classification(&self) -> &Classification {
        &self.default_classification
    }

    pub fn safe(&self, text: &str) -> String {
        self.sanitizer.safe(text)
    }

    /// Text body that sanitizes lines with this context's sanitizer.
    pub fn text_body(&self) -> TextBody {
        TextBody::with_sanitizer(Arc::clone(&self.sanitizer))
    }
}

impl fmt::Debug for ResultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultContext")
            .field("default_classification", &self.default_classification)
            .finish_non_exhaustive()
    }
}
