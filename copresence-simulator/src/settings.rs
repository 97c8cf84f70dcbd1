use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use copresence::CopresenceConfig;
use serde::{Deserialize, Serialize};

/// Command line arguments. Anything given here wins over the settings file.
#[derive(Parser, Debug, Default)]
#[command(name = "copresence-simulator")]
#[command(about = "Drive a copresence engine with simulated remote participants")]
pub struct Args {
    /// Settings file, with `[copresence]` and `[simulator]` tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of simulated remote participants
    #[arg(short, long)]
    pub participants: Option<usize>,

    /// Ticks per second
    #[arg(long)]
    pub tick_rate: Option<f32>,

    /// How many ticks each participant stays for
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Radius of the circle participants walk around the stage origin
    #[arg(long)]
    pub orbit_radius: Option<f32>,

    /// Only create placeholders once a participant's first pose arrives
    #[arg(long)]
    pub lazy: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub participants: usize,
    pub tick_rate: f32,
    pub ticks: u64,
    pub orbit_radius: f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            participants: 3,
            tick_rate: 30.0,
            ticks: 300,
            orbit_radius: 1.5,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            bail!("tick_rate must be a positive number, got {}", self.tick_rate);
        }
        if !self.orbit_radius.is_finite() || self.orbit_radius < 0.0 {
            bail!("orbit_radius must not be negative, got {}", self.orbit_radius);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub copresence: CopresenceConfig,
    pub simulator: SimulatorConfig,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        if let Some(participants) = args.participants {
            settings.simulator.participants = participants;
        }
        if let Some(tick_rate) = args.tick_rate {
            settings.simulator.tick_rate = tick_rate;
        }
        if let Some(ticks) = args.ticks {
            settings.simulator.ticks = ticks;
        }
        if let Some(orbit_radius) = args.orbit_radius {
            settings.simulator.orbit_radius = orbit_radius;
        }
        if args.lazy {
            settings.copresence.eager_entry_creation = false;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read settings from {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        self.copresence.validate()?;
        self.simulator.validate()
    }
}

#[cfg(test)]
mod tests {
    use copresence::RotationPolicy;

    use super::*;

    #[test]
    pub fn test_parse_settings() {
        let settings = Settings::from_toml_str(
            r#"
            [copresence]
            rotation_policy = "normalize"

            [simulator]
            participants = 5
            tick_rate = 72.0
            "#,
        )
        .unwrap();

        assert_eq!(settings.copresence.rotation_policy, RotationPolicy::Normalize);
        assert!(settings.copresence.eager_entry_creation);
        assert_eq!(settings.simulator.participants, 5);
        assert_eq!(settings.simulator.tick_rate, 72.0);
        assert_eq!(settings.simulator.ticks, 300);
    }

    #[test]
    pub fn test_args_override_settings() {
        let args = Args::parse_from([
            "copresence-simulator",
            "--participants",
            "7",
            "--ticks",
            "10",
            "--lazy",
        ]);
        let settings = Settings::from_args(&args).unwrap();

        assert_eq!(settings.simulator.participants, 7);
        assert_eq!(settings.simulator.ticks, 10);
        assert_eq!(settings.simulator.tick_rate, 30.0);
        assert!(!settings.copresence.eager_entry_creation);
    }

    #[test]
    pub fn test_invalid_settings() {
        assert!(Settings::from_toml_str("[simulator]\ntick_rate = 0.0").is_err());
        assert!(Settings::from_toml_str("[copresence]\nplaceholder_scale = -2.0").is_err());

        let args = Args {
            config: Some("does/not/exist.toml".into()),
            ..Default::default()
        };
        assert!(Settings::from_args(&args).is_err());
    }
}
