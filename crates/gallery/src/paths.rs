use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SHADER_GALLERY_CONFIG_DIR";
pub const ENV_CACHE_DIR: &str = "SHADER_GALLERY_CACHE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "ShaderGallery";
const APPLICATION: &str = "shader-gallery";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION);

        let config_dir = resolve_dir(
            ENV_CONFIG_DIR,
            project_dirs.as_ref().map(|dirs| dirs.config_dir()),
        )
        .context("failed to resolve shader-gallery config directory")?;
        let cache_dir = resolve_dir(
            ENV_CACHE_DIR,
            project_dirs.as_ref().map(|dirs| dirs.cache_dir()),
        )
        .context("failed to resolve shader-gallery cache directory")?;

        Ok(Self {
            config_dir,
            cache_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("gallery.toml")
    }

    pub fn editor_buffer(&self) -> PathBuf {
        self.cache_dir.join("editor.glsl")
    }

    /// Last reflected location, read back as the startup route.
    pub fn location_file(&self) -> PathBuf {
        self.cache_dir.join("location")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            config_dir,
            cache_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: Option<&Path>) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    default
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("failed to determine user directories; set {env_var}"))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let cache_dir = root.path().join("cache");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _cache_guard = EnvGuard::set(ENV_CACHE_DIR, &cache_dir);

        let paths = AppPaths::discover().unwrap();

        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.cache_dir(), cache_dir.as_path());
        assert_eq!(paths.config_file(), config_dir.join("gallery.toml"));
        assert_eq!(paths.editor_buffer(), cache_dir.join("editor.glsl"));
        assert_eq!(paths.location_file(), cache_dir.join("location"));
    }
}
