//! Composite priority scoring.
//!
//! Every item gets a score in [0, 100] built from three components:
//!
//! ```text
//! final = 0.5 * quadrant + 0.3 * energy_alignment + 0.2 * goal_alignment
//! ```
//!
//! Scoring is a pure function of item + configuration. The breakdown is kept
//! on the item so downstream consumers can explain why a score came out the
//! way it did.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EnergySegment, PreferenceConfig};
use crate::item::{EnergyProfile, Interval, SchedulableItem, TimeWindow};

/// Neutral alignment for items whose profile has no segment in the curve.
const NEUTRAL_ALIGNMENT: f64 = 50.0;

const QUADRANT_WEIGHT: f64 = 0.5;
const ENERGY_WEIGHT: f64 = 0.3;
const GOAL_WEIGHT: f64 = 0.2;

/// Eisenhower quadrant classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    UrgentImportant,
    Important,
    Urgent,
    Neither,
}

impl Quadrant {
    /// Classify from the urgency/importance flags.
    pub fn classify(urgent: bool, important: bool) -> Self {
        match (urgent, important) {
            (true, true) => Self::UrgentImportant,
            (false, true) => Self::Important,
            (true, false) => Self::Urgent,
            (false, false) => Self::Neither,
        }
    }

    /// Base score for the quadrant.
    pub fn score(&self) -> f64 {
        match self {
            Self::UrgentImportant => 95.0,
            Self::Important => 80.0,
            Self::Urgent => 60.0,
            Self::Neither => 30.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrgentImportant => "urgent_important",
            Self::Important => "important",
            Self::Urgent => "urgent",
            Self::Neither => "neither",
        }
    }
}

/// Full scoring breakdown for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub quadrant: Quadrant,
    pub quadrant_score: f64,
    pub energy_alignment: f64,
    pub goal_alignment: f64,
    pub final_score: f64,
}

/// Priority scorer bound to one configuration.
pub struct PriorityScorer<'a> {
    config: &'a PreferenceConfig,
}

impl<'a> PriorityScorer<'a> {
    pub fn new(config: &'a PreferenceConfig) -> Self {
        Self { config }
    }

    /// Score one item.
    pub fn score(&self, item: &SchedulableItem) -> ScoreBreakdown {
        let quadrant = Quadrant::classify(item.urgent, item.important);
        let quadrant_score = quadrant.score();
        let energy_alignment = self.energy_alignment(item);
        let goal_alignment = self.goal_alignment(&item.goal_tags);
        let final_score = QUADRANT_WEIGHT * quadrant_score
            + ENERGY_WEIGHT * energy_alignment
            + GOAL_WEIGHT * goal_alignment;

        ScoreBreakdown {
            quadrant,
            quadrant_score,
            energy_alignment,
            goal_alignment,
            final_score,
        }
    }

    /// Score every item in place, overwriting any previous breakdown.
    pub fn score_all(&self, items: &mut [SchedulableItem]) {
        for item in items.iter_mut() {
            item.priority = Some(self.score(item));
        }
    }

    /// Energy alignment for an item's own window.
    ///
    /// Fixed items are judged at their actual interval. Flexible items score
    /// 100 when any placement within their bounds can overlap the matching
    /// segment, 0 when none can.
    pub fn energy_alignment(&self, item: &SchedulableItem) -> f64 {
        let Some(profile) = item.energy_profile else {
            return NEUTRAL_ALIGNMENT;
        };
        let Some(segment) = self.config.energy_curve.segment_for(profile) else {
            return NEUTRAL_ALIGNMENT;
        };

        match &item.window {
            TimeWindow::Fixed { interval } => self.alignment_for_interval(segment, interval),
            TimeWindow::Flexible {
                earliest, latest, ..
            } => {
                let bounds = Interval {
                    start: *earliest,
                    end: *latest,
                };
                if segment_occurrences(segment, &bounds)
                    .iter()
                    .any(|occ| occ.overlaps(&bounds))
                {
                    100.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Energy alignment of a concrete candidate interval, with linear falloff.
    ///
    /// Used by the allocator to compare equally-early slots: a slot inside the
    /// matching segment scores 100 and the score drops linearly with distance
    /// until it reaches 0 at `falloff_minutes`.
    pub fn alignment_at(&self, profile: Option<EnergyProfile>, interval: &Interval) -> f64 {
        let Some(profile) = profile else {
            return NEUTRAL_ALIGNMENT;
        };
        let Some(segment) = self.config.energy_curve.segment_for(profile) else {
            return NEUTRAL_ALIGNMENT;
        };
        self.alignment_for_interval(segment, interval)
    }

    fn alignment_for_interval(&self, segment: &EnergySegment, interval: &Interval) -> f64 {
        let falloff = self.config.energy_curve.falloff_minutes as f64;
        let gap = segment_occurrences(segment, interval)
            .iter()
            .map(|occ| occ.gap_minutes(interval))
            .min()
            .unwrap_or(i64::MAX);
        if gap == 0 {
            return 100.0;
        }
        (100.0 * (1.0 - gap as f64 / falloff)).max(0.0)
    }

    /// Goal alignment: the best weight among the item's goal tags.
    pub fn goal_alignment(&self, goal_tags: &[String]) -> f64 {
        goal_tags
            .iter()
            .map(|tag| self.config.goals.weight(tag))
            .fold(0.0, f64::max)
    }
}

/// Concrete occurrences of a daily segment near an interval.
///
/// The segment recurs every day, so the nearest occurrence may fall on the
/// day before or after the interval's start. Midnight-crossing segments are
/// handled by the day spill in the occurrence itself.
fn segment_occurrences(segment: &EnergySegment, near: &Interval) -> Vec<Interval> {
    let base = near.start.date_naive();
    let mut occurrences = Vec::with_capacity(3);
    for offset in -1..=1 {
        let date = base + Duration::days(offset);
        let start: DateTime<Utc> = date.and_time(segment.start).and_utc();
        let end = if segment.end <= segment.start {
            date.and_time(segment.end).and_utc() + Duration::days(1)
        } else {
            date.and_time(segment.end).and_utc()
        };
        occurrences.push(Interval { start, end });
    }
    occurrences
}
