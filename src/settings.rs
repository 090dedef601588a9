//! Simulation settings and partial updates
//!
//! [`SimulationSettings`] is the full, live configuration the force step
//! reads. [`SettingsUpdate`] is the partial form accepted by
//! `Simulation::update_settings` and by settings files: unset fields keep
//! their previous values.

use serde::{Deserialize, Serialize};

/// Number of ticks the default cooling schedule takes to reach `alpha_min`
pub const DEFAULT_TARGET_TICKS: u32 = 300;

const DEFAULT_ALPHA_MIN: f64 = 0.001;

/// Cooling rate that takes `alpha` from 1 to `alpha_min` in `ticks` steps
pub fn alpha_decay_for(alpha_min: f64, ticks: u32) -> f64 {
    1.0 - alpha_min.powf(1.0 / f64::from(ticks.max(1)))
}

/// Live configuration of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    /// Current temperature; forces scale with it
    pub alpha: f64,
    /// The loop stops once alpha falls below this
    pub alpha_min: f64,
    /// Fraction of the gap to `alpha_target` closed per tick
    pub alpha_decay: f64,
    /// Temperature alpha relaxes toward
    pub alpha_target: f64,
    /// Velocity multiplier applied every tick, in `[0, 1)`
    pub velocity_decay: f64,
    /// Fraction of the centroid offset removed from positions per tick
    pub centering_force: f64,
    /// Half the minimum allowed separation between two nodes
    pub collide_radius: f64,
    /// How much of an overlap is resolved per tick
    pub collide_force: f64,
    /// Rest length of every edge
    pub link_distance: f64,
    /// Many-body strength; negative repels. `None` disables the force.
    pub charge_strength: Option<f64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: alpha_decay_for(DEFAULT_ALPHA_MIN, DEFAULT_TARGET_TICKS),
            alpha_target: 0.0,
            velocity_decay: 0.6,
            centering_force: 0.1,
            collide_radius: 5.0,
            collide_force: 1.0,
            link_distance: 30.0,
            charge_strength: None,
        }
    }
}

impl SimulationSettings {
    /// Merge a partial update into these settings.
    ///
    /// Changing `alpha_min` without an explicit `alpha_decay` re-derives the
    /// decay so cooling still completes in [`DEFAULT_TARGET_TICKS`] steps.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = update.$field {
                    self.$field = value;
                })*
            };
        }

        merge!(
            alpha,
            alpha_min,
            alpha_decay,
            alpha_target,
            velocity_decay,
            centering_force,
            collide_radius,
            collide_force,
            link_distance
        );

        if update.alpha_min.is_some() && update.alpha_decay.is_none() {
            self.alpha_decay = alpha_decay_for(self.alpha_min, DEFAULT_TARGET_TICKS);
        }

        if let Some(charge) = update.charge_strength {
            self.charge_strength = charge;
        }
    }

    /// Settings with a partial update applied on top of the defaults
    pub fn from_update(update: &SettingsUpdate) -> Self {
        let mut settings = Self::default();
        settings.apply(update);
        settings
    }
}

/// Partial settings; every field is optional.
///
/// `charge_strength` is doubly optional: absent leaves it unchanged, `null`
/// disables the many-body force, a number enables it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_decay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_decay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centering_force: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collide_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collide_force: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_distance: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub charge_strength: Option<Option<f64>>,
}

/// Keep `null` distinct from a missing field
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}
