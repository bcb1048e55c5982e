use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    #[default]
    Index,
    Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    #[default]
    Path,
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeymapMode {
    #[default]
    Default,
    Vim,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GalleryConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub listing: ListingMode,
    #[serde(default = "default_fragment_dir")]
    pub fragment_dir: String,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default = "default_vertex_shader")]
    pub vertex_shader: String,
    #[serde(default)]
    pub routing: RoutingMode,
    #[serde(
        default = "default_debounce",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub debounce: Duration,
    #[serde(default)]
    pub editor_buffer: Option<PathBuf>,
    #[serde(default)]
    pub keymap: KeymapMode,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            source: None,
            listing: ListingMode::default(),
            fragment_dir: default_fragment_dir(),
            manifest: default_manifest(),
            vertex_shader: default_vertex_shader(),
            routing: RoutingMode::default(),
            debounce: default_debounce(),
            editor_buffer: None,
            keymap: KeymapMode::default(),
            window: WindowConfig::default(),
        }
    }
}

fn default_fragment_dir() -> String {
    "frag/".to_string()
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

fn default_vertex_shader() -> String {
    "vertexShader.glsl".to_string()
}

/// Longest accepted debounce window.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(60 * 60);

fn default_debounce() -> Duration {
    Duration::from_secs(1)
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_title() -> String {
    "Shader Gallery".to_string()
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl de::Visitor<'_> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl GalleryConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GalleryConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Loads `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(source) = &self.source {
            if source.trim().is_empty() {
                return Err(ConfigError::Invalid("source may not be empty".into()));
            }
        }

        if self.vertex_shader.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "vertex_shader may not be empty".into(),
            ));
        }

        if self.listing == ListingMode::Manifest && self.manifest.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "manifest may not be empty when listing = \"manifest\"".into(),
            ));
        }

        if self.debounce.is_zero() {
            return Err(ConfigError::Invalid(
                "debounce must be greater than zero".into(),
            ));
        }
        if self.debounce > MAX_DEBOUNCE {
            return Err(ConfigError::Invalid(format!(
                "debounce {} exceeds the maximum of {}",
                humantime::format_duration(self.debounce),
                humantime::format_duration(MAX_DEBOUNCE)
            )));
        }

        if let Some(buffer) = &self.editor_buffer {
            if buffer.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "editor_buffer may not be empty".into(),
                ));
            }
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }

        Ok(())
    }
}
