use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use reqwest::Url;
use tracing::debug;

use crate::listing::{parse_directory_index, parse_manifest, ShaderId};
use crate::provider::{CatalogError, GalleryLayout, ListingKind, ShaderProvider};

/// Gallery served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    http: Client,
    root: Url,
    fragment_root: Url,
    layout: GalleryLayout,
}

impl HttpProvider {
    pub fn new(root: Url, layout: GalleryLayout) -> Result<Self, CatalogError> {
        let root = with_trailing_slash(root);
        let fragment_root = join(&root, &layout.fragment_dir())?;
        let http = Client::builder()
            .build()
            .map_err(|source| CatalogError::Http {
                url: root.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            root,
            fragment_root,
            layout,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Location of a fragment shader, without the cache-busting parameter.
    pub fn fragment_url(&self, id: &ShaderId) -> Result<Url, CatalogError> {
        join(&self.fragment_root, id.as_str())
    }

    fn get_text(&self, url: Url) -> Result<String, CatalogError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|source| CatalogError::Http {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|source| CatalogError::Http {
            url: url.to_string(),
            source,
        })
    }
}

impl ShaderProvider for HttpProvider {
    fn describe(&self) -> String {
        self.root.to_string()
    }

    fn list(&self) -> Result<Vec<ShaderId>, CatalogError> {
        match self.layout.listing {
            ListingKind::DirectoryIndex => {
                let body = self.get_text(self.fragment_root.clone())?;
                Ok(parse_directory_index(&body))
            }
            ListingKind::Manifest => {
                let url = join(&self.root, &self.layout.manifest)?;
                let body = self.get_text(url)?;
                parse_manifest(&body)
            }
        }
    }

    fn fetch(&self, id: &ShaderId) -> Result<String, CatalogError> {
        let url = cache_busted(&self.fragment_url(id)?, now_millis());
        self.get_text(url)
    }

    fn fetch_vertex(&self) -> Result<String, CatalogError> {
        let url = join(&self.root, &self.layout.vertex_shader)?;
        self.get_text(url)
    }
}

/// Appends `cache=<stamp>` so intermediaries never serve a stale shader.
pub fn cache_busted(url: &Url, stamp: u128) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair("cache", &stamp.to_string());
    busted
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn join(base: &Url, relative: &str) -> Result<Url, CatalogError> {
    base.join(relative)
        .map_err(|err| CatalogError::InvalidUrl(format!("{base} + {relative}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(root: &str, layout: GalleryLayout) -> HttpProvider {
        HttpProvider::new(Url::parse(root).unwrap(), layout).unwrap()
    }

    #[test]
    fn root_gains_trailing_slash() {
        let provider = provider("http://localhost:8000/gallery", GalleryLayout::default());
        assert_eq!(provider.root().as_str(), "http://localhost:8000/gallery/");
    }

    #[test]
    fn fragments_resolve_under_fragment_dir() {
        let provider = provider("http://localhost:8000/", GalleryLayout::default());
        let url = provider.fragment_url(&ShaderId::new("waves.glsl")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/frag/waves.glsl");
    }

    #[test]
    fn cache_parameter_is_appended() {
        let url = Url::parse("http://localhost:8000/frag/waves.glsl").unwrap();
        let busted = cache_busted(&url, 1_700_000_000_123);
        assert_eq!(
            busted.as_str(),
            "http://localhost:8000/frag/waves.glsl?cache=1700000000123"
        );
        let with_query = Url::parse("http://localhost:8000/frag/a.glsl?v=2").unwrap();
        assert_eq!(
            cache_busted(&with_query, 5).as_str(),
            "http://localhost:8000/frag/a.glsl?v=2&cache=5"
        );
    }
}
