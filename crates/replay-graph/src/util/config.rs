use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::graph::animation::DEFAULT_MAX_FPS;
use crate::graph::layout::{self, or_default, LayoutParams};

/// Persisted layout tuning. A constant of zero means "use the default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub attract: f64,
    pub repel: f64,
    pub central_pull: f64,
    pub friction: f64,
    pub spring_length: f64,
    pub max_fps: u32,
    pub two_dimensional: bool,
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            attract: layout::DEFAULT_ATTRACT,
            repel: layout::DEFAULT_REPEL,
            central_pull: layout::DEFAULT_CENTRAL_PULL,
            friction: layout::DEFAULT_FRICTION,
            spring_length: layout::DEFAULT_SPRING_LENGTH,
            max_fps: DEFAULT_MAX_FPS,
            two_dimensional: false,
            seed: None,
        }
    }
}

impl LayoutConfig {
    pub fn params(&self) -> LayoutParams {
        LayoutParams {
            central_pull: or_default(self.central_pull, layout::DEFAULT_CENTRAL_PULL),
            attract: or_default(self.attract, layout::DEFAULT_ATTRACT),
            repel: or_default(self.repel, layout::DEFAULT_REPEL),
            friction: or_default(self.friction, layout::DEFAULT_FRICTION),
            spring_length: or_default(self.spring_length, layout::DEFAULT_SPRING_LENGTH),
            two_dimensional: self.two_dimensional,
        }
    }

    pub fn max_fps(&self) -> u32 {
        if self.max_fps == 0 {
            DEFAULT_MAX_FPS
        } else {
            self.max_fps
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "replay")?;
    Some(proj.config_dir().join("layout.toml"))
}

pub fn load_or_default() -> LayoutConfig {
    let Some(path) = config_file_path() else {
        return LayoutConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> LayoutConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return LayoutConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "ignoring invalid layout config");
        LayoutConfig::default()
    })
}

/// Strict variant for a path the user named explicitly.
pub fn load_from_path(path: &Path) -> anyhow::Result<LayoutConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read layout config {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse layout config {}", path.display()))
}

pub fn save(cfg: &LayoutConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

pub fn save_to_path(cfg: &LayoutConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize layout config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write layout config {}", path.display()))?;
    Ok(())
}
