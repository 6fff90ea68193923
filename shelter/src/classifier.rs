//! Request classification.
//!
//! Maps an intercepted request to the [`Strategy`] used to serve it. The
//! mapping is a pure function of the request: same method, URL, headers
//! and mode always give the same strategy.

use std::sync::Arc;

use shelter_core::{InterceptedRequest, Strategy};

use crate::config::{ClassifierRules, RouteOverride, WorkerConfig};

/// Chooses a strategy for each intercepted request.
pub trait Classify: Send + Sync {
    /// Returns the strategy for `request`.
    fn classify(&self, request: &InterceptedRequest) -> Strategy;
}

impl<T> Classify for Arc<T>
where
    T: Classify + ?Sized,
{
    fn classify(&self, request: &InterceptedRequest) -> Strategy {
        self.as_ref().classify(request)
    }
}

/// Classifies by route overrides first, then by URL shape.
///
/// In order:
///
/// 1. the first [`RouteOverride`] whose prefix matches the path;
/// 2. static assets (known file extension, or an asset path marker) are
///    served cache-first;
/// 3. API calls and data documents are served network-first;
/// 4. navigations and HTML documents are served network-first;
/// 5. anything else is served cache-first.
#[derive(Debug, Clone, Default)]
pub struct DefaultClassifier {
    routes: Vec<RouteOverride>,
    rules: ClassifierRules,
}

impl DefaultClassifier {
    /// Creates a classifier from explicit overrides and rules.
    pub fn new(routes: Vec<RouteOverride>, rules: ClassifierRules) -> Self {
        Self { routes, rules }
    }

    /// Creates a classifier from a worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.routes.clone(), config.classifier.clone())
    }

    fn is_static_asset(&self, path: &str) -> bool {
        let has_static_ext = extension(path).is_some_and(|ext| {
            self.rules
                .static_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
        has_static_ext || contains_any(path, &self.rules.asset_markers)
    }

    fn is_api(&self, path: &str) -> bool {
        contains_any(path, &self.rules.api_markers) || contains_any(path, &self.rules.data_markers)
    }

    fn is_document(&self, path: &str) -> bool {
        extension(path).is_some_and(|ext| {
            self.rules
                .document_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }
}

impl Classify for DefaultClassifier {
    fn classify(&self, request: &InterceptedRequest) -> Strategy {
        let path = request.path();

        if let Some(route) = self
            .routes
            .iter()
            .find(|route| path.starts_with(&route.path_prefix))
        {
            return route.strategy;
        }

        if self.is_static_asset(path) {
            Strategy::CacheFirst
        } else if self.is_api(path) {
            Strategy::NetworkFirst
        } else if request.is_navigation() || self.is_document(path) {
            Strategy::NetworkFirst
        } else {
            Strategy::CacheFirst
        }
    }
}

fn contains_any(path: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| path.contains(marker.as_str()))
}

/// Extension of the last path segment, without the dot.
fn extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
