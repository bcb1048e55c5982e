use std::fs;
use std::path::{Path, PathBuf};

use crate::listing::{normalize_listing, parse_manifest, ShaderId};
use crate::provider::{CatalogError, GalleryLayout, ListingKind, ShaderProvider};

/// Gallery laid out in a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
    layout: GalleryLayout,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>, layout: GalleryLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fragment_root(&self) -> PathBuf {
        self.root.join(self.layout.fragment_dir())
    }

    /// On-disk path of a fragment shader.
    pub fn fragment_path(&self, id: &ShaderId) -> PathBuf {
        self.fragment_root().join(id.as_str())
    }

    fn list_directory(&self) -> Result<Vec<ShaderId>, CatalogError> {
        let dir = self.fragment_root();
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let is_file = entry
                .file_type()
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(normalize_listing(names))
    }
}

impl ShaderProvider for DirectoryProvider {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list(&self) -> Result<Vec<ShaderId>, CatalogError> {
        match self.layout.listing {
            ListingKind::DirectoryIndex => self.list_directory(),
            ListingKind::Manifest => {
                let path = self.root.join(&self.layout.manifest);
                let raw = read(&path)?;
                parse_manifest(&raw)
            }
        }
    }

    fn fetch(&self, id: &ShaderId) -> Result<String, CatalogError> {
        read(&self.fragment_path(id))
    }

    fn fetch_vertex(&self) -> Result<String, CatalogError> {
        read(&self.root.join(&self.layout.vertex_shader))
    }
}

fn read(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> CatalogError {
    CatalogError::Io {
        path: path.to_path_buf(),
        source,
    }
}
