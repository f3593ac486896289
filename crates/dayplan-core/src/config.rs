//! Immutable preference configuration for one optimization run.
//!
//! The engine never reads ambient/global state: the full configuration is
//! passed in as a value and validated up front. Configuration is
//! TOML-compatible so a preference store can keep it on disk, but the core
//! only ever consumes the parsed value.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::item::EnergyProfile;
use crate::protection::{BlockCategory, ProtectionLevel};

/// One segment of the user's daily energy curve.
///
/// Segments whose `end` is before `start` cross midnight (e.g. learning time
/// 22:00-00:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySegment {
    pub profile: EnergyProfile,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// The user's daily energy curve: which activity belongs to which time of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyCurveConfig {
    pub segments: Vec<EnergySegment>,
    /// Alignment degrades linearly to 0 over this many minutes of distance
    /// from the matching segment.
    #[serde(default = "default_falloff_minutes")]
    pub falloff_minutes: i64,
}

impl EnergyCurveConfig {
    /// Find the segment for a given activity profile.
    pub fn segment_for(&self, profile: EnergyProfile) -> Option<&EnergySegment> {
        self.segments.iter().find(|s| s.profile == profile)
    }
}

impl Default for EnergyCurveConfig {
    fn default() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid literal time");
        let seg = |profile, start, end| EnergySegment {
            profile,
            start,
            end,
        };
        Self {
            segments: vec![
                seg(EnergyProfile::Research, t(6, 0), t(8, 0)),
                seg(EnergyProfile::Calls, t(8, 0), t(9, 0)),
                seg(EnergyProfile::Exercise, t(9, 30), t(10, 30)),
                seg(EnergyProfile::Meetings, t(11, 0), t(16, 0)),
                seg(EnergyProfile::Admin, t(16, 0), t(19, 0)),
                seg(EnergyProfile::Family, t(19, 0), t(22, 0)),
                seg(EnergyProfile::Learning, t(22, 0), t(0, 0)),
            ],
            falloff_minutes: default_falloff_minutes(),
        }
    }
}

fn default_falloff_minutes() -> i64 {
    240
}

/// Strategic goal weights, keyed by goal tag.
///
/// Weight bands: 80-100 North Star, 50-79 secondary focus, 0-49 indirect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalConfig {
    pub weights: BTreeMap<String, f64>,
}

impl GoalConfig {
    /// Weight for a single tag, 0 when unknown.
    pub fn weight(&self, tag: &str) -> f64 {
        self.weights.get(tag).copied().unwrap_or(0.0)
    }

    /// Whether a tag is in the North Star band.
    pub fn is_north_star(&self, tag: &str) -> bool {
        self.weight(tag) >= 80.0
    }
}

/// Definition of one recurring protected block.
///
/// Most blocks have fixed daily start/end times. Deep-work blocks instead
/// carry a preferred start plus duration, with an optional alternative start
/// used when the preferred slot collides with a fixed commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedBlockSpec {
    pub category: BlockCategory,
    pub level: ProtectionLevel,
    #[serde(default)]
    pub start: Option<NaiveTime>,
    #[serde(default)]
    pub end: Option<NaiveTime>,
    #[serde(default)]
    pub preferred_start: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub alternative_start: Option<NaiveTime>,
}

/// Full configuration for one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceConfig {
    #[serde(default)]
    pub energy_curve: EnergyCurveConfig,
    #[serde(default)]
    pub goals: GoalConfig,
    #[serde(default = "default_protected_blocks")]
    pub protected_blocks: Vec<ProtectedBlockSpec>,
    /// Schedulable day start (default 06:00).
    #[serde(default = "default_day_start")]
    pub day_start: NaiveTime,
    /// Schedulable day end (default 22:00).
    #[serde(default = "default_day_end")]
    pub day_end: NaiveTime,
    /// Free intervals shorter than this are never offered to the allocator.
    #[serde(default = "default_min_slot_minutes")]
    pub min_slot_minutes: i64,
    /// Horizon for reschedule proposal search, in days.
    #[serde(default = "default_reschedule_horizon_days")]
    pub reschedule_horizon_days: u32,
    /// Maximum candidate intervals per reschedule proposal.
    #[serde(default = "default_max_reschedule_options")]
    pub max_reschedule_options: usize,
    /// Per-call bound on attendee availability lookups, in seconds.
    #[serde(default = "default_availability_timeout_secs")]
    pub availability_timeout_secs: u64,
}

fn default_day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).expect("valid literal time")
}

fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).expect("valid literal time")
}

fn default_min_slot_minutes() -> i64 {
    15
}

fn default_reschedule_horizon_days() -> u32 {
    7
}

fn default_max_reschedule_options() -> usize {
    3
}

fn default_availability_timeout_secs() -> u64 {
    5
}

fn default_protected_blocks() -> Vec<ProtectedBlockSpec> {
    let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid literal time");
    vec![
        ProtectedBlockSpec {
            category: BlockCategory::DeepWork,
            level: ProtectionLevel::High,
            start: None,
            end: None,
            preferred_start: Some(t(11, 0)),
            duration_minutes: Some(60),
            alternative_start: Some(t(14, 0)),
        },
        ProtectedBlockSpec {
            category: BlockCategory::PhysicalWellbeing,
            level: ProtectionLevel::Highest,
            start: Some(t(9, 30)),
            end: Some(t(10, 30)),
            preferred_start: None,
            duration_minutes: None,
            alternative_start: None,
        },
        ProtectedBlockSpec {
            category: BlockCategory::FamilyTime,
            level: ProtectionLevel::Highest,
            start: Some(t(19, 0)),
            end: Some(t(22, 0)),
            preferred_start: None,
            duration_minutes: None,
            alternative_start: None,
        },
        ProtectedBlockSpec {
            category: BlockCategory::Learning,
            level: ProtectionLevel::Medium,
            start: Some(t(22, 0)),
            end: Some(t(0, 0)),
            preferred_start: None,
            duration_minutes: None,
            alternative_start: None,
        },
        ProtectedBlockSpec {
            category: BlockCategory::Research,
            level: ProtectionLevel::Medium,
            start: Some(t(6, 0)),
            end: Some(t(8, 0)),
            preferred_start: None,
            duration_minutes: None,
            alternative_start: None,
        },
    ]
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            energy_curve: EnergyCurveConfig::default(),
            goals: GoalConfig::default(),
            protected_blocks: default_protected_blocks(),
            day_start: default_day_start(),
            day_end: default_day_end(),
            min_slot_minutes: default_min_slot_minutes(),
            reschedule_horizon_days: default_reschedule_horizon_days(),
            max_reschedule_options: default_max_reschedule_options(),
            availability_timeout_secs: default_availability_timeout_secs(),
        }
    }
}

impl PreferenceConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(input).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the date-independent parts of the configuration.
    ///
    /// Protected-block overlap is checked at materialization, since blocks
    /// only become concrete intervals for a target day.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.day_start >= self.day_end {
            return Err(ConfigError::InvalidRange {
                name: "day bounds".to_string(),
                message: format!("day_start {} is not before day_end {}", self.day_start, self.day_end),
            });
        }
        if self.min_slot_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "min_slot_minutes".to_string(),
                message: format!("must be positive, got {}", self.min_slot_minutes),
            });
        }
        if self.energy_curve.falloff_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "energy_curve.falloff_minutes".to_string(),
                message: format!("must be positive, got {}", self.energy_curve.falloff_minutes),
            });
        }
        for (tag, weight) in &self.goals.weights {
            if !(0.0..=100.0).contains(weight) {
                return Err(ConfigError::InvalidValue {
                    key: format!("goals.weights.{tag}"),
                    message: format!("must be in [0, 100], got {weight}"),
                });
            }
        }
        for spec in &self.protected_blocks {
            let timed = spec.start.is_some() && spec.end.is_some();
            let preferred = spec.preferred_start.is_some() && spec.duration_minutes.is_some();
            if !timed && !preferred {
                return Err(ConfigError::InvalidValue {
                    key: format!("protected_blocks.{:?}", spec.category),
                    message: "needs either start+end or preferred_start+duration_minutes"
                        .to_string(),
                });
            }
            if let Some(d) = spec.duration_minutes {
                if d <= 0 {
                    return Err(ConfigError::InvalidValue {
                        key: format!("protected_blocks.{:?}", spec.category),
                        message: format!("duration_minutes must be positive, got {d}"),
                    });
                }
            }
        }
        Ok(())
    }
}
