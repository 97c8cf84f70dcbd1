use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CopresenceError, CopresenceResult};

/// What to do with a received rotation that is not a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Use the rotation exactly as it was sent.
    #[default]
    AsIs,
    /// Normalize the rotation before applying it. A zero length rotation is rejected.
    Normalize,
    /// Reject the update if the rotation's length is further than [`UNIT_TOLERANCE`] from one.
    Reject,
}

/// How far a quaternion's length may stray from one before [`RotationPolicy::Reject`] refuses it.
pub const UNIT_TOLERANCE: f32 = 1e-3;

/// Configuration for the remote head registry and its placeholders.
///
/// ```toml
/// eager_entry_creation = true
/// placeholder_scale = 0.2
/// rotation_policy = "as_is"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CopresenceConfig {
    /// Create a participant's placeholder as soon as they join. When `false`, placeholders only
    /// appear once the participant's first pose update arrives.
    pub eager_entry_creation: bool,
    /// Uniform scale applied to each placeholder.
    pub placeholder_scale: f32,
    /// What to do with rotations that are not unit quaternions.
    pub rotation_policy: RotationPolicy,
}

impl Default for CopresenceConfig {
    fn default() -> Self {
        Self {
            eager_entry_creation: true,
            placeholder_scale: 0.2,
            rotation_policy: RotationPolicy::AsIs,
        }
    }
}

impl CopresenceConfig {
    /// Load and validate a configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> CopresenceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> CopresenceResult<Self> {
        let config: CopresenceConfig =
            toml::from_str(contents).map_err(|e| CopresenceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values make sense
    pub fn validate(&self) -> CopresenceResult<()> {
        if !self.placeholder_scale.is_finite() || self.placeholder_scale <= 0.0 {
            return Err(CopresenceError::Config(format!(
                "placeholder_scale must be a positive number, got {}",
                self.placeholder_scale
            )));
        }

        Ok(())
    }
}
