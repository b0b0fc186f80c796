//! `shaderpad.toml` loading and validation.
//!
//! Every section and key is optional; a missing file yields the defaults.
//!
//! ```toml
//! [window]
//! width = 800
//! height = 800
//!
//! [playback]
//! speed_level = 5
//! refresh_rate = 60
//! start_paused = false
//!
//! [editor]
//! shader = "shaders/stripes.wgsl"
//! watch = true
//! auto_recompile = true
//! debounce = "200ms"
//!
//! [gpu]
//! power = "high"
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::{GpuPowerPreference, SpeedMapper, DEFAULT_REFRESH_RATE};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("speed level {0} is outside {min}..={max}", min = SpeedMapper::MIN_LEVEL, max = SpeedMapper::MAX_LEVEL)]
    SpeedLevel(f32),
    #[error("refresh rate must be a positive number of Hz, got {0}")]
    RefreshRate(f32),
    #[error("window size must be non-zero, got {width}x{height}")]
    WindowSize { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub window: WindowSection,
    pub playback: PlaybackSection,
    pub editor: EditorSection,
    pub gpu: GpuSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackSection {
    pub speed_level: f32,
    pub refresh_rate: f32,
    pub start_paused: bool,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            speed_level: SpeedMapper::DEFAULT_LEVEL,
            refresh_rate: DEFAULT_REFRESH_RATE,
            start_paused: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorSection {
    /// Shader file to open; relative paths resolve against the config file.
    pub shader: Option<PathBuf>,
    pub watch: bool,
    pub auto_recompile: bool,
    /// Quiet period after the last file event before the file is reloaded.
    #[serde(deserialize_with = "deserialize_duration")]
    pub debounce: Duration,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            shader: None,
            watch: true,
            auto_recompile: true,
            debounce: default_debounce(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct GpuSection {
    #[serde(deserialize_with = "deserialize_power")]
    pub power: GpuPowerPreference,
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config = Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.playback.speed_level;
        if !SpeedMapper::range().contains(&level) {
            return Err(ConfigError::SpeedLevel(level));
        }
        let rate = self.playback.refresh_rate;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::RefreshRate(rate));
        }
        let WindowSection { width, height } = self.window;
        if width == 0 || height == 0 {
            return Err(ConfigError::WindowSize { width, height });
        }
        Ok(())
    }

    fn resolve_relative(&mut self, base: &Path) {
        if let Some(shader) = self.editor.shader.as_mut() {
            if shader.is_relative() {
                *shader = base.join(&*shader);
            }
        }
    }
}

fn default_debounce() -> Duration {
    Duration::from_millis(200)
}

fn deserialize_power<'de, D>(deserializer: D) -> Result<GpuPowerPreference, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(de::Error::custom)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
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
            if !v.is_finite() || v < 0.0 {
                return Err(E::custom("duration must be a non-negative number of seconds"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}
