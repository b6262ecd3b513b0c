use serde::{Deserialize, Serialize};
use sldview_layout::{Chrome, KindLimits};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubstationLayout {
    #[default]
    Horizontal,
    Vertical,
}

impl SubstationLayout {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SubstationLayout::Horizontal => "horizontal",
            SubstationLayout::Vertical => "vertical",
        }
    }
}

/// Parameters that change the server-rendered SVG. Any change invalidates
/// every pane's fetch URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParameters {
    pub use_name: bool,
    pub center_label: bool,
    pub diagonal_label: bool,
    pub topological_coloring: bool,
    pub substation_layout: SubstationLayout,
    pub component_library: Option<String>,
    pub language: String,
}

impl Default for DisplayParameters {
    fn default() -> Self {
        Self {
            use_name: true,
            center_label: false,
            diagonal_label: false,
            topological_coloring: true,
            substation_layout: SubstationLayout::Horizontal,
            component_library: None,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub base_url: String,
    pub max_width: KindLimits,
    pub max_height: KindLimits,
    pub min_width: f64,
    pub min_height: f64,
    pub chrome: Chrome,
    pub arrow_color: String,
    pub display: DisplayParameters,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api/gateway/study".to_string(),
            max_width: KindLimits::new(800.0, 1200.0),
            max_height: KindLimits::new(800.0, 1000.0),
            min_width: 200.0,
            min_height: 100.0,
            chrome: Chrome {
                header_height: 36.0,
                border_thickness: 1.0,
                right_offset: 0.0,
                bottom_offset: 0.0,
            },
            arrow_color: "#5C5C5C".to_string(),
            display: DisplayParameters::default(),
        }
    }
}

impl ViewerSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Get the default file path for saving settings.
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("sldview").join("settings.json")
        } else {
            PathBuf::from("sldview-settings.json")
        }
    }

    /// Load from the default location, or fall back to defaults.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            match Self::load(&path) {
                Ok(settings) => return settings,
                Err(e) => tracing::warn!(path = %path.display(), "Ignoring settings file: {e}"),
            }
        }
        Self::default()
    }
}
