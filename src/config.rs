use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a board projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BoardConfig {
    /// Display name of the synthetic trailing swimlane
    pub none_lane_name: String,
    /// Log a warning when a change-set's view is not the successor of the current one
    pub warn_on_view_gap: bool,
    /// Swimlane facet selected when the first snapshot arrives
    pub initial_swimlane: Option<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            none_lane_name: "None".to_string(),
            warn_on_view_gap: true,
            initial_swimlane: None,
        }
    }
}

impl BoardConfig {
    /// Parses and validates a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BoardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.none_lane_name.trim().is_empty() {
            return Err(BoardError::ConfigError(
                "none-lane-name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_initial_swimlane(mut self, swimlane: impl Into<String>) -> Self {
        self.initial_swimlane = Some(swimlane.into());
        self
    }
}
