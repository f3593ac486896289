//! Schedule output types and derived metrics.
//!
//! A `Schedule` is produced once per run and owned by the caller. Failure is
//! represented in data: dropped inputs, unplaceable items, and protection
//! overrides all travel inside the schedule instead of being thrown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::GoalConfig;
use crate::item::{Interval, ItemKind, SchedulableItem};
use crate::normalize::DroppedItem;
use crate::proposal::Proposal;
use crate::protection::{BlockCategory, ProtectedBlock};

/// An item with its assigned interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub item: SchedulableItem,
    pub interval: Interval,
}

/// Why an item could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    /// No free interval of sufficient length within the item's bounds
    NoFreeSlot,
    /// The item's window does not intersect the schedulable day
    OutsideWindow,
    /// The item conflicts with protection it is not allowed to override
    DisplacedByProtection,
}

impl UnscheduledReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFreeSlot => "no_free_slot",
            Self::OutsideWindow => "outside_window",
            Self::DisplacedByProtection => "displaced_by_protection",
        }
    }
}

/// An item that could not be placed, with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledItem {
    pub item: SchedulableItem,
    pub reason: UnscheduledReason,
}

/// Audit record of a breached protected block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub block: ProtectedBlock,
    pub item_id: String,
    pub item_title: String,
    /// The interval the overriding item occupies inside the block.
    pub interval: Interval,
    /// Which evaluation rule justified the override.
    pub rule: String,
}

/// Derived metrics for the digest renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    pub deep_work_minutes: i64,
    pub meeting_minutes: i64,
    pub task_minutes: i64,
    pub protected_minutes_defined: i64,
    pub protected_minutes_preserved: i64,
    /// Protected time preserved vs. defined, 0-100.
    pub balance_score: f64,
    pub north_star_items_placed: usize,
    pub total_scheduled_minutes: i64,
}

impl ScheduleMetrics {
    /// Compute metrics from the finalized placement.
    pub fn compute(
        placed: &[PlacedItem],
        protected: &[ProtectedBlock],
        overrides: &[OverrideRecord],
        goals: &GoalConfig,
    ) -> Self {
        let mut metrics = Self::default();

        for entry in placed {
            let minutes = entry.interval.duration_minutes();
            match entry.item.kind {
                ItemKind::Meeting => metrics.meeting_minutes += minutes,
                ItemKind::Task => metrics.task_minutes += minutes,
                ItemKind::DeepWorkSlot => metrics.deep_work_minutes += minutes,
                ItemKind::ProtectedBlock => {}
            }
            metrics.total_scheduled_minutes += minutes;
            if entry.item.goal_tags.iter().any(|t| goals.is_north_star(t)) {
                metrics.north_star_items_placed += 1;
            }
        }

        for block in protected {
            let defined = block.duration_minutes();
            let lost: i64 = overrides
                .iter()
                .filter(|o| o.block.id == block.id)
                .map(|o| overlap_minutes(&o.interval, &block.interval))
                .sum();
            let preserved = (defined - lost).max(0);
            metrics.protected_minutes_defined += defined;
            metrics.protected_minutes_preserved += preserved;
            if block.category == BlockCategory::DeepWork {
                metrics.deep_work_minutes += preserved;
            }
        }

        metrics.balance_score = if metrics.protected_minutes_defined > 0 {
            100.0 * metrics.protected_minutes_preserved as f64
                / metrics.protected_minutes_defined as f64
        } else {
            100.0
        };

        metrics
    }
}

fn overlap_minutes(a: &Interval, b: &Interval) -> i64 {
    if !a.overlaps(b) {
        return 0;
    }
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (end - start).num_minutes()
}

/// The output of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    /// Non-overlapping placed items, ordered by start time.
    pub placed: Vec<PlacedItem>,
    /// The day's protected blocks (overridden ones included, for audit).
    pub protected: Vec<ProtectedBlock>,
    pub unscheduled: Vec<UnscheduledItem>,
    pub overrides: Vec<OverrideRecord>,
    pub proposals: Vec<Proposal>,
    /// Items rejected during normalization, with reasons.
    pub dropped: Vec<DroppedItem>,
    pub metrics: ScheduleMetrics,
}

impl Schedule {
    /// Check the allocator's core invariant: placed intervals are pairwise
    /// non-overlapping.
    pub fn is_conflict_free(&self) -> bool {
        for (i, a) in self.placed.iter().enumerate() {
            for b in &self.placed[i + 1..] {
                if a.interval.overlaps(&b.interval) {
                    return false;
                }
            }
        }
        true
    }

    /// All busy intervals of the primary user on this schedule.
    pub fn busy_intervals(&self) -> Vec<Interval> {
        let mut busy: Vec<Interval> = self
            .placed
            .iter()
            .map(|p| p.interval)
            .chain(self.protected.iter().map(|b| b.interval))
            .collect();
        busy.sort_by_key(|i| i.start);
        busy
    }
}
