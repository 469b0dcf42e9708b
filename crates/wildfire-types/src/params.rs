//! Simulation parameters supplied by the client when a session is created.
//!
//! The transition rule is the classic forest-fire family: trees next to a
//! fire ignite with [`SimulationParameters::ignition_probability`], fires burn
//! for [`SimulationParameters::burn_duration`] generations, and optionally
//! empty ground regrows and trees are struck by lightning.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Errors produced by [`SimulationParameters::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    /// The update interval is not a finite, positive number of seconds.
    #[error("updateIntervalSeconds must be a finite number > 0, got {0}")]
    UpdateInterval(f64),

    /// A probability is negative, NaN, or infinite.
    #[error("{name} must be a finite number >= 0, got {value}")]
    Probability {
        /// Wire name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The burn duration must be at least one generation.
    #[error("burnDuration must be >= 1")]
    BurnDuration,
}

/// Per-session simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationParameters {
    /// Wall-clock seconds between generations.
    pub update_interval_seconds: f64,

    /// Chance that a tree next to a burning cell ignites in one generation.
    #[serde(default = "default_ignition_probability")]
    pub ignition_probability: f64,

    /// Chance that an empty cell regrows into a tree in one generation.
    #[serde(default)]
    pub growth_probability: f64,

    /// Chance that a tree ignites spontaneously in one generation.
    #[serde(default)]
    pub lightning_probability: f64,

    /// Generations a cell burns before it becomes empty.
    #[serde(default = "default_burn_duration")]
    pub burn_duration: u32,

    /// Optional RNG seed. The same seed and field replay identically.
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_ignition_probability() -> f64 {
    1.0
}

const fn default_burn_duration() -> u32 {
    1
}

impl SimulationParameters {
    /// Deterministic spread with the given update interval and defaults
    /// for everything else.
    pub const fn with_interval(update_interval_seconds: f64) -> Self {
        Self {
            update_interval_seconds,
            ignition_probability: default_ignition_probability(),
            growth_probability: 0.0,
            lightning_probability: 0.0,
            burn_duration: default_burn_duration(),
            seed: None,
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.update_interval_seconds.is_finite() && self.update_interval_seconds > 0.0) {
            return Err(ParamsError::UpdateInterval(self.update_interval_seconds));
        }
        for (name, value) in [
            ("ignitionProbability", self.ignition_probability),
            ("growthProbability", self.growth_probability),
            ("lightningProbability", self.lightning_probability),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParamsError::Probability { name, value });
            }
        }
        if self.burn_duration == 0 {
            return Err(ParamsError::BurnDuration);
        }
        Ok(())
    }

    /// The update interval as a [`Duration`].
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded; an
    /// out-of-range value saturates to [`Duration::MAX`].
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval_seconds).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let params: Result<SimulationParameters, _> =
            serde_json::from_str(r#"{"updateIntervalSeconds": 0.5}"#);
        let params = params.ok();
        assert_eq!(params, Some(SimulationParameters::with_interval(0.5)));
    }

    #[test]
    fn interval_is_required() {
        let params: Result<SimulationParameters, _> = serde_json::from_str("{}");
        assert!(params.is_err());
    }

    #[test]
    fn validate_accepts_probabilities_above_one() {
        let mut params = SimulationParameters::with_interval(1.0);
        params.ignition_probability = 3.0;
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut params = SimulationParameters::with_interval(0.0);
        assert!(matches!(params.validate(), Err(ParamsError::UpdateInterval(_))));

        params.update_interval_seconds = f64::NAN;
        assert!(matches!(params.validate(), Err(ParamsError::UpdateInterval(_))));

        params.update_interval_seconds = 1.0;
        params.growth_probability = -0.1;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::Probability { name: "growthProbability", .. })
        ));

        params.growth_probability = 0.0;
        params.burn_duration = 0;
        assert_eq!(params.validate(), Err(ParamsError::BurnDuration));
    }

    #[test]
    fn update_interval_converts_to_duration() {
        let params = SimulationParameters::with_interval(0.25);
        assert_eq!(params.update_interval(), Duration::from_millis(250));
    }
}
