//! # Column presets
//!
//! Named column selections saved as one JSON file per preset,
//! `<name>.json` holding `{"sheet_name": ..., "columns": [...]}`.
use crate::error::ResultMessage;
use crate::error::SheetPipelineError;
use glob::Pattern;
use log::debug;
use log::info;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

const EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Preset '{0}' not found")]
    NotFound(String),

    #[error("Invalid preset name '{0}': use letters, digits, spaces, '-' or '_'")]
    InvalidName(String),

    #[error("No columns selected to save in preset '{0}'")]
    NoColumns(String),

    #[error("Cannot determine the user configuration directory")]
    NoConfigDirectory,
}

/// A saved column selection and the sheet it was captured from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Preset name; the file stem, not stored inside the file.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl ColumnConfig {
    pub fn new(sheet_name: Option<&str>, columns: &[String]) -> Self {
        ColumnConfig {
            name: String::new(),
            sheet_name: sheet_name.map(str::to_owned),
            columns: columns.to_vec(),
        }
    }
}

/// Directory of preset files.
#[derive(Clone, Debug)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Uses `dir` for presets, creating it when absent.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SheetPipelineError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(SheetPipelineError::from)
            .with_prefix(&format!("Create preset directory '{}' failed", dir.display()))?;
        Ok(PresetStore { dir })
    }

    /// `<user config dir>/sheet_pipeline/presets`.
    pub fn default_location() -> Result<PathBuf, SheetPipelineError> {
        let dir = dirs::config_dir().ok_or(PresetError::NoConfigDirectory)?;
        Ok(dir.join("sheet_pipeline").join("presets"))
    }

    pub fn open_default() -> Result<Self, SheetPipelineError> {
        Self::open(Self::default_location()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `config` under `name`, replacing any preset with the same sanitized name.
    ///
    /// Returns the config as stored, with its sanitized name. A config without columns
    /// is refused with `NoColumns`.
    pub fn save(&self, name: &str, config: &ColumnConfig) -> Result<ColumnConfig, SheetPipelineError> {
        let name = sanitize_name(name)?;
        if config.columns.is_empty() {
            return Err(PresetError::NoColumns(name).into());
        }
        let path = self.path_for(&name);
        let write = || -> Result<(), SheetPipelineError> {
            let mut writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(&mut writer, config)?;
            writer.flush()?;
            Ok(())
        };
        write().with_prefix(&format!("Save preset '{}' failed", name))?;
        info!("Saved preset '{}' with {} columns to '{}'", name, config.columns.len(), path.display());
        Ok(ColumnConfig {
            name,
            ..config.clone()
        })
    }

    /// Loads a preset, failing with `NotFound` when it does not exist.
    pub fn load(&self, name: &str) -> Result<ColumnConfig, SheetPipelineError> {
        let name = sanitize_name(name)?;
        let path = self.path_for(&name);
        if !path.is_file() {
            Err(PresetError::NotFound(name.to_owned()))?
        }
        let read = || -> Result<ColumnConfig, SheetPipelineError> {
            let reader = BufReader::new(File::open(&path)?);
            Ok(serde_json::from_reader(reader)?)
        };
        let config = read().with_prefix(&format!("Load preset '{}' failed", name))?;
        debug!("Loaded preset '{}' from '{}'", name, path.display());
        Ok(ColumnConfig { name, ..config })
    }

    /// Names of all saved presets, sorted.
    pub fn list(&self) -> Result<BTreeSet<String>, SheetPipelineError> {
        let pattern = format!("{}/*.{}", Pattern::escape(&self.dir.to_string_lossy()), EXTENSION);
        let mut names = BTreeSet::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if let Some(stem) = path.file_stem().filter(|_| path.is_file()) {
                names.insert(stem.to_string_lossy().to_string());
            }
        }
        Ok(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        sanitize_name(name)
            .map(|name| self.path_for(&name).is_file())
            .unwrap_or(false)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }
}

/// Keeps letters, digits, spaces, `-` and `_`; a name with nothing left is invalid.
pub fn sanitize_name(name: &str) -> Result<String, SheetPipelineError> {
    let sanitized: String = name
        .chars()
        .filter(|character| character.is_alphanumeric() || matches!(character, ' ' | '-' | '_'))
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        Err(PresetError::InvalidName(name.to_owned()))?
    }
    Ok(sanitized.to_owned())
}
