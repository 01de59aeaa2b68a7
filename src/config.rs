use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::allocate::Ratio;
use crate::error::{EditorError, IoContext, Result};

pub const DEFAULT_CONFIG_FILE: &str = "dataset_editor.toml";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discover: DiscoverConfig,
    #[serde(default)]
    pub separate: SeparateConfig,
    #[serde(default)]
    pub numbering: NumberingConfig,
    #[serde(default)]
    pub chunk: ChunkConfig,
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).at(path)?;
        let cfg: Config = toml::from_str(&raw)
            .map_err(|e| EditorError::config(format!("parse {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `path` when given; otherwise `dataset_editor.toml` in the working directory if present;
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        fn check_exts(name: &str, exts: &[String]) -> Result<()> {
            if exts.is_empty() {
                return Err(EditorError::config(format!("{name} must not be empty")));
            }
            for e in exts {
                if e.is_empty() || e.starts_with('.') || e.contains('/') {
                    return Err(EditorError::config(format!(
                        "{name} entries must be bare extensions like \"jpg\", got {e:?}"
                    )));
                }
            }
            Ok(())
        }
        check_exts("discover.image_extensions", &self.discover.image_extensions)?;
        check_exts(
            "discover.annotation_extensions",
            &self.discover.annotation_extensions,
        )?;

        Ratio::new(self.separate.ratio).map_err(|_| {
            EditorError::config(format!(
                "separate.ratio must be in (0, 1), got {}",
                self.separate.ratio
            ))
        })?;
        if !(1..=12).contains(&self.numbering.width) {
            return Err(EditorError::config(format!(
                "numbering.width must be in [1, 12], got {}",
                self.numbering.width
            )));
        }
        if self.numbering.map_file.trim().is_empty() {
            return Err(EditorError::config("numbering.map_file must not be empty"));
        }
        if self.chunk.size == 0 {
            return Err(EditorError::config("invalid chunk.size=0 (must be > 0)"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DiscoverConfig {
    /// Image extensions, matched case-insensitively.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_annotation_extensions")]
    pub annotation_extensions: Vec<String>,
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            annotation_extensions: default_annotation_extensions(),
        }
    }
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

fn default_annotation_extensions() -> Vec<String> {
    vec!["xml".to_string()]
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeparateConfig {
    /// Target test fraction. train:test = (1-ratio):ratio.
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    /// Fixed seed for reproducible splits; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SeparateConfig {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            seed: None,
        }
    }
}

fn default_ratio() -> f64 {
    0.4
}

#[derive(Clone, Debug, Deserialize)]
pub struct NumberingConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_map_file")]
    pub map_file: String,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            map_file: default_map_file(),
        }
    }
}

fn default_width() -> usize {
    5
}

fn default_map_file() -> String {
    "numbering2org.json".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
