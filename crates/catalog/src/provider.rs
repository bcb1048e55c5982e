//! The provider seam shared by the HTTP and directory backends.
//!
//! - `GalleryLayout` names where the listing, fragment shaders and vertex
//!   shader live relative to a gallery root.
//! - `ShaderProvider` lists and fetches sources.
//! - `SourceCache` wraps a provider and memoizes the vertex shader, which never
//!   changes for the lifetime of a session.
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::listing::ShaderId;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("invalid gallery url {0}")]
    InvalidUrl(String),

    #[error("shader listing at {0} is empty")]
    EmptyListing(String),
}

/// How the fragment directory is enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingKind {
    /// Scrape anchors out of an HTML directory index.
    #[default]
    DirectoryIndex,
    /// Read a JSON array of file names.
    Manifest,
}

/// Paths of the gallery resources, relative to the gallery root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryLayout {
    pub listing: ListingKind,
    pub fragment_dir: String,
    pub manifest: String,
    pub vertex_shader: String,
}

impl Default for GalleryLayout {
    fn default() -> Self {
        Self {
            listing: ListingKind::DirectoryIndex,
            fragment_dir: "frag/".to_string(),
            manifest: "manifest.json".to_string(),
            vertex_shader: "vertexShader.glsl".to_string(),
        }
    }
}

impl GalleryLayout {
    /// Fragment directory with exactly one trailing slash.
    pub fn fragment_dir(&self) -> String {
        let trimmed = self.fragment_dir.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }
}

pub trait ShaderProvider {
    /// Human readable origin, used in logs.
    fn describe(&self) -> String;

    /// Sorted, de-duplicated fragment shader identifiers.
    fn list(&self) -> Result<Vec<ShaderId>, CatalogError>;

    /// Current source of one fragment shader. Never served from a cache.
    fn fetch(&self, id: &ShaderId) -> Result<String, CatalogError>;

    /// Source of the shared vertex shader.
    fn fetch_vertex(&self) -> Result<String, CatalogError>;
}

impl<P: ShaderProvider + ?Sized> ShaderProvider for Box<P> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn list(&self) -> Result<Vec<ShaderId>, CatalogError> {
        (**self).list()
    }

    fn fetch(&self, id: &ShaderId) -> Result<String, CatalogError> {
        (**self).fetch(id)
    }

    fn fetch_vertex(&self) -> Result<String, CatalogError> {
        (**self).fetch_vertex()
    }
}

/// Provider wrapper that fetches the vertex shader at most once.
pub struct SourceCache<P> {
    provider: P,
    vertex: Option<Arc<str>>,
}

impl<P: ShaderProvider> SourceCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            vertex: None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn list(&self) -> Result<Vec<ShaderId>, CatalogError> {
        let listing = self.provider.list()?;
        if listing.is_empty() {
            return Err(CatalogError::EmptyListing(self.provider.describe()));
        }
        Ok(listing)
    }

    pub fn fragment(&self, id: &ShaderId) -> Result<String, CatalogError> {
        self.provider.fetch(id)
    }

    /// Vertex source, fetched on first use. A failed fetch is not memoized.
    pub fn vertex(&mut self) -> Result<Arc<str>, CatalogError> {
        if let Some(vertex) = &self.vertex {
            return Ok(Arc::clone(vertex));
        }
        let source: Arc<str> = Arc::from(self.provider.fetch_vertex()?);
        tracing::debug!(origin = %self.provider.describe(), bytes = source.len(), "cached vertex shader");
        self.vertex = Some(Arc::clone(&source));
        Ok(source)
    }
}
