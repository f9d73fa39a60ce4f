use std::path::PathBuf;

use serde::Deserialize;

use crate::reports::TargetPolicy;

pub const ENV_PREFIX: &str = "TRACKER_";

/// Runtime settings read from `TRACKER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_weekly_target")]
    pub weekly_target: usize,
    #[serde(default = "default_video_target_minutes")]
    pub video_target_minutes: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_weekly_target() -> usize {
    6
}

fn default_video_target_minutes() -> f64 {
    90.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weekly_target: default_weekly_target(),
            video_target_minutes: default_video_target_minutes(),
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env::<Settings>()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    pub fn target_policy(&self) -> TargetPolicy {
        TargetPolicy {
            weekly_topics: self.weekly_target,
            video_minutes: self.video_target_minutes,
        }
    }
}
