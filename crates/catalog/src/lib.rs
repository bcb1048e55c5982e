//! Shader source provider for the gallery.
//!
//! A gallery root is either a web server (`http://` / `https://`) or a local
//! directory. Both share the same layout: fragment shaders live under a
//! fragment directory that is enumerated through an HTML directory index or a
//! JSON manifest, and a single vertex shader sits next to it. The viewer only
//! talks to the [`ShaderProvider`] trait, so the two backends are
//! interchangeable.
mod listing;
mod local;
mod provider;
mod remote;

pub use listing::{
    normalize_listing, parse_directory_index, parse_manifest, strip_extension, ShaderId,
    SHADER_EXTENSION,
};
pub use local::DirectoryProvider;
pub use provider::{CatalogError, GalleryLayout, ListingKind, ShaderProvider, SourceCache};
pub use remote::{cache_busted, HttpProvider};

use std::path::PathBuf;

use reqwest::Url;

/// Where the gallery's shaders come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GallerySource {
    Remote(Url),
    Local(PathBuf),
}

impl GallerySource {
    pub fn from_input(input: &str) -> Result<Self, CatalogError> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|err| CatalogError::InvalidUrl(format!("{trimmed}: {err}")))?;
            Ok(Self::Remote(url))
        } else {
            Ok(Self::Local(PathBuf::from(trimmed)))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Builds the provider matching this source.
    pub fn into_provider(
        self,
        layout: GalleryLayout,
    ) -> Result<Box<dyn ShaderProvider + Send>, CatalogError> {
        match self {
            Self::Remote(url) => Ok(Box::new(HttpProvider::new(url, layout)?)),
            Self::Local(root) => Ok(Box::new(DirectoryProvider::new(root, layout))),
        }
    }
}

impl std::fmt::Display for GallerySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_source() {
        let source = GallerySource::from_input("http://localhost:8000/").unwrap();
        assert!(matches!(source, GallerySource::Remote(ref url) if url.port() == Some(8000)));
        assert!(!source.is_local());
    }

    #[test]
    fn parses_local_path() {
        assert!(matches!(
            GallerySource::from_input("galleries/demo"),
            Ok(GallerySource::Local(path)) if path == PathBuf::from("galleries/demo")
        ));
    }

    #[test]
    fn rejects_malformed_url() {
        let err = GallerySource::from_input("http://[::1").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidUrl(_)));
    }
}
