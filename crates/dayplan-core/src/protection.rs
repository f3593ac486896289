//! Protected block registry.
//!
//! Materializes the recurring protected commitments from configuration into
//! concrete intervals for one target day. Blocks are regenerated fresh every
//! run: an override granted today never leaks into tomorrow's materialization.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{PreferenceConfig, ProtectedBlockSpec};
use crate::error::ConfigError;
use crate::item::Interval;

/// Category of protected time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    DeepWork,
    PhysicalWellbeing,
    FamilyTime,
    Learning,
    Research,
}

impl BlockCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepWork => "deep_work",
            Self::PhysicalWellbeing => "physical_wellbeing",
            Self::FamilyTime => "family_time",
            Self::Learning => "learning",
            Self::Research => "research",
        }
    }
}

/// How hard a block is to override. Ordered: `Low < Medium < High < Highest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    Low,
    Medium,
    High,
    Highest,
}

/// A protected block materialized for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedBlock {
    pub id: String,
    pub category: BlockCategory,
    pub interval: Interval,
    pub level: ProtectionLevel,
}

impl ProtectedBlock {
    pub fn duration_minutes(&self) -> i64 {
        self.interval.duration_minutes()
    }
}

fn instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

/// Materialize a timed spec onto a date, spilling past midnight when the end
/// time is not after the start time.
fn timed_interval(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Interval {
    let start_at = instant(date, start);
    let end_at = if end <= start {
        instant(date, end) + Duration::days(1)
    } else {
        instant(date, end)
    };
    Interval {
        start: start_at,
        end: end_at,
    }
}

fn preferred_interval(
    spec: &ProtectedBlockSpec,
    date: NaiveDate,
    fixed: &[Interval],
) -> Result<Interval, ConfigError> {
    let (start, duration) = match (spec.preferred_start, spec.duration_minutes) {
        (Some(s), Some(d)) => (s, d),
        _ => {
            return Err(ConfigError::InvalidValue {
                key: format!("protected_blocks.{}", spec.category.as_str()),
                message: "missing preferred_start or duration_minutes".to_string(),
            })
        }
    };
    let preferred = Interval {
        start: instant(date, start),
        end: instant(date, start) + Duration::minutes(duration),
    };
    if !fixed.iter().any(|f| f.overlaps(&preferred)) {
        return Ok(preferred);
    }
    // Preferred slot collides with a fixed commitment: try the alternative.
    if let Some(alt) = spec.alternative_start {
        let alternative = Interval {
            start: instant(date, alt),
            end: instant(date, alt) + Duration::minutes(duration),
        };
        if !fixed.iter().any(|f| f.overlaps(&alternative)) {
            return Ok(alternative);
        }
    }
    // Both slots conflict; keep the preferred one and let the allocator
    // record the conflict.
    Ok(preferred)
}

/// Registry that turns block specs into concrete blocks for a day.
pub struct ProtectedBlockRegistry<'a> {
    config: &'a PreferenceConfig,
}

impl<'a> ProtectedBlockRegistry<'a> {
    pub fn new(config: &'a PreferenceConfig) -> Self {
        Self { config }
    }

    /// Materialize all configured blocks for the target day.
    ///
    /// `fixed_intervals` are the day's immovable commitments, consulted only
    /// for preferred/alternative placement of deep-work style blocks.
    ///
    /// # Errors
    /// `ConfigError::OverlappingBlocks` when two materialized blocks overlap:
    /// the configuration is inconsistent and allocation invariants cannot
    /// hold.
    pub fn materialize(
        &self,
        date: NaiveDate,
        fixed_intervals: &[Interval],
    ) -> Result<Vec<ProtectedBlock>, ConfigError> {
        let mut blocks = Vec::with_capacity(self.config.protected_blocks.len());

        for spec in &self.config.protected_blocks {
            let interval = match (spec.start, spec.end) {
                (Some(start), Some(end)) => timed_interval(date, start, end),
                _ => preferred_interval(spec, date, fixed_intervals)?,
            };
            blocks.push(ProtectedBlock {
                id: format!("protected_{}_{}", spec.category.as_str(), date),
                category: spec.category,
                interval,
                level: spec.level,
            });
        }

        blocks.sort_by_key(|b| b.interval.start);

        for pair in blocks.windows(2) {
            if pair[0].interval.overlaps(&pair[1].interval) {
                return Err(ConfigError::OverlappingBlocks {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    #[test]
    fn materializes_default_blocks_sorted() {
        let config = PreferenceConfig::default();
        let registry = ProtectedBlockRegistry::new(&config);
        let blocks = registry.materialize(date(), &[]).unwrap();

        assert_eq!(blocks.len(), 5);
        for pair in blocks.windows(2) {
            assert!(pair[0].interval.start <= pair[1].interval.start);
            assert!(!pair[0].interval.overlaps(&pair[1].interval));
        }
    }

    #[test]
    fn overlapping_blocks_are_fatal() {
        // Shift deep work into the research block (06:00-08:00) with no
        // alternative: materialization must report the inconsistency.
        let mut config = PreferenceConfig::default();
        for spec in &mut config.protected_blocks {
            if spec.category == BlockCategory::DeepWork {
                spec.alternative_start = None;
                spec.preferred_start = Some(NaiveTime::from_hms_opt(6, 30, 0).unwrap());
            }
        }
        let registry = ProtectedBlockRegistry::new(&config);
        let err = registry.materialize(date(), &[]).unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingBlocks { .. }));
    }

    #[test]
    fn midnight_crossing_block_spills_into_next_day() {
        let config = PreferenceConfig::default();
        let registry = ProtectedBlockRegistry::new(&config);
        let blocks = registry.materialize(date(), &[]).unwrap();

        let learning = blocks
            .iter()
            .find(|b| b.category == BlockCategory::Learning)
            .unwrap();
        assert_eq!(learning.interval.start, at(22, 0));
        assert_eq!(
            learning.interval.end,
            Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap()
        );
        assert_eq!(learning.duration_minutes(), 120);
    }

    #[test]
    fn deep_work_falls_back_to_alternative_on_fixed_conflict() {
        let config = PreferenceConfig::default();
        let registry = ProtectedBlockRegistry::new(&config);

        // A fixed commitment covers the preferred 11:00 slot.
        let fixed = vec![Interval {
            start: at(11, 0),
            end: at(12, 0),
        }];
        let blocks = registry.materialize(date(), &fixed).unwrap();
        let deep_work = blocks
            .iter()
            .find(|b| b.category == BlockCategory::DeepWork)
            .unwrap();
        assert_eq!(deep_work.interval.start, at(14, 0));
        assert_eq!(deep_work.interval.end, at(15, 0));
    }

    #[test]
    fn protection_levels_are_ordered() {
        assert!(ProtectionLevel::Highest > ProtectionLevel::High);
        assert!(ProtectionLevel::High > ProtectionLevel::Medium);
        assert!(ProtectionLevel::Medium > ProtectionLevel::Low);
    }
}
