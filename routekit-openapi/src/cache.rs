use crate::builder::assemble;
use crate::config::OpenApiConfig;
use routekit_core::{ApiResponse, RouteRegistry};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// The document of a frozen registry, assembled on first use.
///
/// The registry is held behind an `Arc`, so no route can be added once the
/// cache exists and the memoized document never goes stale.
pub struct CachedDocument {
    config: OpenApiConfig,
    registry: Arc<RouteRegistry>,
    document: OnceLock<(Value, String)>,
}

impl CachedDocument {
    pub fn new(config: OpenApiConfig, registry: Arc<RouteRegistry>) -> Self {
        Self {
            config,
            registry,
            document: OnceLock::new(),
        }
    }

    fn document(&self) -> &(Value, String) {
        self.document.get_or_init(|| {
            let value = assemble(&self.config, &self.registry);
            let json = value.to_string();
            (value, json)
        })
    }

    pub fn value(&self) -> &Value {
        &self.document().0
    }

    /// Compact JSON text of the document.
    pub fn json(&self) -> &str {
        &self.document().1
    }

    pub fn is_built(&self) -> bool {
        self.document.get().is_some()
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// The document as a `200 application/json` response.
    pub fn response(&self) -> ApiResponse {
        ApiResponse::ok(self.value().clone())
    }
}

impl std::fmt::Debug for CachedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedDocument")
            .field("title", &self.config.title)
            .field("routes", &self.registry.routes().len())
            .field("built", &self.is_built())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::assemble_json;

    #[test]
    fn builds_once_on_first_access() {
        let registry = Arc::new(RouteRegistry::new());
        let config = OpenApiConfig::new("Cached", "1.0.0");
        let cache = CachedDocument::new(config.clone(), registry.clone());
        assert!(!cache.is_built());
        let first = cache.json().as_ptr();
        assert!(cache.is_built());
        assert_eq!(cache.json().as_ptr(), first);
        assert_eq!(cache.json(), assemble_json(&config, &registry));
        assert_eq!(cache.response().body()["info"]["title"], "Cached");
    }
}
