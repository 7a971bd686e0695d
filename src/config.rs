//! Optional settings file.
//!
//! Read from `<config dir>/qsift/config.toml`. A missing file means defaults.
//!
//! ```toml
//! database_url = "postgres://localhost/shop"
//! default_table = "products"
//! sort_fields = ["code", "price", "created_at"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{QsiftError, QsiftResult};
use crate::pagination::{AllowList, Passthrough, SortGuard};

/// Settings shared by the CLI and the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Database connection URL
    pub database_url: Option<String>,

    /// Table used when none is given on the command line
    pub default_table: Option<String>,

    /// Columns accepted in `sort`. Empty means unvalidated passthrough.
    pub sort_fields: Vec<String>,
}

impl Settings {
    /// Default location of the settings file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qsift").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> QsiftResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> QsiftResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> QsiftResult<Self> {
        let settings: Settings = toml::from_str(text)?;
        if settings.sort_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(QsiftError::Config("sort_fields contains an empty name".to_string()));
        }
        Ok(settings)
    }

    /// The sort guard these settings ask for.
    pub fn sort_guard(&self) -> Box<dyn SortGuard> {
        if self.sort_fields.is_empty() {
            Box::new(Passthrough)
        } else {
            Box::new(AllowList::new(self.sort_fields.iter().cloned()))
        }
    }
}
