//! Rendition catalog: resolves a URL into metadata plus ordered renditions.
//!
//! Successful resolutions are memoized by the exact URL string for the
//! lifetime of the catalog; a cache hit never reaches the provider. Failures
//! are not cached.

mod types;

pub use types::{resolution_key, CatalogEntry, Rendition, TransferHandle, VideoMetadata};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::control::AbortToken;
use crate::error::ResolutionError;
use crate::provider::SourceProvider;

/// Container kept when no other is configured.
pub const DEFAULT_CONTAINER: &str = "mp4";

/// Memoizing front of a [`SourceProvider`].
pub struct RenditionCatalog {
    provider: Arc<dyn SourceProvider>,
    container_format: String,
    cache: RwLock<HashMap<String, Arc<CatalogEntry>>>,
}

impl RenditionCatalog {
    /// Catalog keeping only `container_format` renditions (case-insensitive).
    pub fn new(provider: Arc<dyn SourceProvider>, container_format: impl Into<String>) -> Self {
        Self {
            provider,
            container_format: container_format.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SourceProvider> {
        &self.provider
    }

    /// Resolves `url`, serving from cache when possible.
    pub fn resolve(&self, url: &str) -> Result<Arc<CatalogEntry>, ResolutionError> {
        self.resolve_with(url, &AbortToken::new())
    }

    /// Like [`resolve`](Self::resolve); `abort` is forwarded to the provider on a miss.
    pub fn resolve_with(
        &self,
        url: &str,
        abort: &AbortToken,
    ) -> Result<Arc<CatalogEntry>, ResolutionError> {
        if let Some(entry) = self.cached(url) {
            tracing::debug!(url, "catalog cache hit");
            return Ok(entry);
        }

        self.provider.validate_url(url)?;
        if abort.is_aborted() {
            return Err(ResolutionError::Aborted);
        }

        tracing::debug!(url, provider = self.provider.name(), "resolving");
        let (metadata, renditions) = self.provider.probe(url, abort)?;

        let mut renditions: Vec<Rendition> = renditions
            .into_iter()
            .filter(|r| r.container_format.eq_ignore_ascii_case(&self.container_format))
            .collect();
        if renditions.is_empty() {
            return Err(ResolutionError::NoRenditions);
        }
        // Stable: equal keys keep provider order.
        renditions.sort_by_key(Rendition::resolution_key);

        let entry = Arc::new(CatalogEntry {
            metadata,
            renditions,
        });
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), Arc::clone(&entry));
        tracing::info!(
            url,
            title = %entry.metadata.title,
            renditions = entry.renditions.len(),
            "resolved"
        );
        Ok(entry)
    }

    pub fn cached(&self, url: &str) -> Option<Arc<CatalogEntry>> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.cached(url).is_some()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
