use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How chatty the optimizer is on the `tracing` channel.
/// `Silent` suppresses every event, including unresolved-tile warnings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Normal,
    Verbose,
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "none" | "quiet" | "0" => Ok(Self::Silent),
            "normal" | "1" => Ok(Self::Normal),
            "verbose" | "2" => Ok(Self::Verbose),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Tile edge in pixels. Every source tileset must use square tiles of this size.
    pub tile_size: u32,
    /// Edge of a full atlas chunk in pixels; a positive multiple of `tile_size`.
    pub atlas_size: u32,
    /// Atlas image name prefix (`{prefix}-{n}.png`).
    pub prefix: String,
    /// Optional atlas image name suffix (`{prefix}-{n}-{suffix}.png`).
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    /// Also pack source tiles carrying a `name` property when no layer uses them.
    #[serde(default = "default_keep_named_tiles")]
    pub keep_named_tiles: bool,
    /// Extract chunk tiles in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            atlas_size: 512,
            prefix: "chunk".into(),
            suffix: None,
            log_level: default_log_level(),
            keep_named_tiles: default_keep_named_tiles(),
            parallel: false,
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Normal
}
fn default_keep_named_tiles() -> bool {
    true
}

impl OptimizerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `tile_size` or `atlas_size` is zero
    /// - `atlas_size` is not a multiple of `tile_size`
    /// - `prefix` is empty
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::OptimizerError;

        if self.tile_size == 0 {
            return Err(OptimizerError::InvalidConfig(
                "tile_size must be positive".into(),
            ));
        }
        if self.atlas_size == 0 || self.atlas_size % self.tile_size != 0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "atlas_size ({}) must be a positive multiple of tile_size ({})",
                self.atlas_size, self.tile_size
            )));
        }
        if self.prefix.is_empty() {
            return Err(OptimizerError::InvalidConfig(
                "atlas name prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Maximum number of tiles per chunk: `(atlas_size / tile_size)²`.
    pub fn capacity(&self) -> usize {
        let columns = (self.atlas_size / self.tile_size.max(1)) as usize;
        columns * columns
    }

    /// File name of the atlas with 1-based sequence number `index`.
    pub fn atlas_name(&self, index: usize) -> String {
        match self.suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => {
                format!("{}-{}-{}.png", self.prefix, index, suffix)
            }
            _ => format!("{}-{}.png", self.prefix, index),
        }
    }

    pub(crate) fn logs(&self) -> bool {
        self.log_level >= LogLevel::Normal
    }

    pub(crate) fn verbose(&self) -> bool {
        self.log_level >= LogLevel::Verbose
    }
}

/// Builder for `OptimizerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct OptimizerConfigBuilder {
    cfg: OptimizerConfig,
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: OptimizerConfig::default(),
        }
    }
    pub fn tile_size(mut self, v: u32) -> Self {
        self.cfg.tile_size = v;
        self
    }
    pub fn atlas_size(mut self, v: u32) -> Self {
        self.cfg.atlas_size = v;
        self
    }
    pub fn prefix(mut self, v: impl Into<String>) -> Self {
        self.cfg.prefix = v.into();
        self
    }
    pub fn suffix(mut self, v: Option<String>) -> Self {
        self.cfg.suffix = v;
        self
    }
    pub fn log_level(mut self, v: LogLevel) -> Self {
        self.cfg.log_level = v;
        self
    }
    pub fn keep_named_tiles(mut self, v: bool) -> Self {
        self.cfg.keep_named_tiles = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> OptimizerConfig {
        self.cfg
    }
}

impl OptimizerConfig {
    /// Create a fluent builder for `OptimizerConfig`.
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::new()
    }
}
