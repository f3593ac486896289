//! Greedy, priority-ordered allocator and conflict resolver.
//!
//! Places items on a single-day timeline:
//!
//! 1. Fixed, non-protected items occupy their given intervals unconditionally.
//! 2. Protected blocks join the occupied set; a non-Highest block conflicting
//!    with an `OverrideProtection` item is breached for exactly the item's
//!    interval (recorded, never silent) while the rest of the block stays
//!    protected.
//! 3. Remaining flexible items are placed in a fixed tie-break order into the
//!    earliest free interval that fits, preferring better energy alignment
//!    among slots starting within the same calendar hour.
//!
//! The allocator is a pure function of its inputs. Placement is deliberately
//! greedy under the stated ordering; it makes no claim of global optimality.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use tracing::debug;

use crate::config::PreferenceConfig;
use crate::evaluator::{MeetingVerdict, Verdict};
use crate::item::{Interval, SchedulableItem, TimeWindow};
use crate::protection::{ProtectedBlock, ProtectionLevel};
use crate::schedule::{OverrideRecord, PlacedItem, UnscheduledItem, UnscheduledReason};
use crate::scoring::PriorityScorer;

/// The allocator's output, before proposals and metrics are attached.
#[derive(Debug, Clone, Default)]
pub struct AllocationResult {
    pub placed: Vec<PlacedItem>,
    pub unscheduled: Vec<UnscheduledItem>,
    pub overrides: Vec<OverrideRecord>,
}

/// An item waiting for flexible placement.
struct Pending {
    item: SchedulableItem,
    /// Originally fixed but displaced by a protection conflict.
    displaced: bool,
}

pub struct Allocator<'a> {
    config: &'a PreferenceConfig,
    scorer: PriorityScorer<'a>,
}

impl<'a> Allocator<'a> {
    pub fn new(config: &'a PreferenceConfig) -> Self {
        Self {
            config,
            scorer: PriorityScorer::new(config),
        }
    }

    /// Place all items for one day.
    ///
    /// Items must already be scored; meetings must already carry verdicts in
    /// `verdicts` (keyed by item id).
    pub fn allocate(
        &self,
        date: NaiveDate,
        items: &[SchedulableItem],
        verdicts: &BTreeMap<String, Verdict>,
        protected_blocks: &[ProtectedBlock],
    ) -> AllocationResult {
        let day = Interval {
            start: date.and_time(self.config.day_start).and_utc(),
            end: date.and_time(self.config.day_end).and_utc(),
        };

        let mut result = AllocationResult::default();
        let mut occupied: Vec<Interval> = Vec::new();
        let mut pending: Vec<Pending> = Vec::new();
        let mut overriders: Vec<SchedulableItem> = Vec::new();

        // Step 1: fixed items at their given intervals.
        for item in items {
            let verdict = verdicts.get(&item.id).map(|v| v.verdict);
            if !item.fixed {
                pending.push(Pending {
                    item: item.clone(),
                    displaced: false,
                });
                continue;
            }
            match verdict {
                Some(MeetingVerdict::RescheduleCandidate) => {
                    // Never placed at its original conflicting interval.
                    pending.push(Pending {
                        item: item.clone(),
                        displaced: true,
                    });
                }
                Some(MeetingVerdict::OverrideProtection) => {
                    overriders.push(item.clone());
                }
                _ => {
                    if let Some(interval) = item.window.fixed_interval() {
                        occupied.push(interval);
                        result.placed.push(PlacedItem {
                            item: item.clone(),
                            interval,
                        });
                    }
                }
            }
        }

        // Step 2: protection overrides, then blocks into the occupied set.
        for item in overriders {
            let Some(interval) = item.window.fixed_interval() else {
                continue;
            };
            let conflicting: Vec<&ProtectedBlock> = protected_blocks
                .iter()
                .filter(|b| b.interval.overlaps(&interval))
                .collect();
            let blocked = conflicting
                .iter()
                .any(|b| b.level == ProtectionLevel::Highest)
                || occupied.iter().any(|o| o.overlaps(&interval));
            if blocked {
                // Highest-level protection (or a fixed commitment) holds; the
                // meeting is displaced and competes for another slot.
                debug!(item = %item.id, "override refused, item displaced");
                pending.push(Pending {
                    item,
                    displaced: true,
                });
                continue;
            }
            for block in conflicting {
                result.overrides.push(OverrideRecord {
                    block: block.clone(),
                    item_id: item.id.clone(),
                    item_title: item.title.clone(),
                    interval,
                    rule: verdicts
                        .get(&item.id)
                        .map(|v| v.rule.to_string())
                        .unwrap_or_default(),
                });
            }
            occupied.push(interval);
            result.placed.push(PlacedItem { item, interval });
        }

        // The full block intervals stay occupied even when overridden: only
        // the overriding item sits inside them, never backfill.
        occupied.extend(protected_blocks.iter().map(|b| b.interval));

        // Step 3: fixed tie-break total order over the flexible remainder.
        pending.sort_by(|a, b| compare_pending(a, b));

        // Step 4/5: earliest-fit search with same-hour energy preference.
        for entry in pending {
            let bounds = match search_bounds(&entry, &day) {
                Some(bounds) => bounds,
                None => {
                    result.unscheduled.push(UnscheduledItem {
                        item: entry.item,
                        reason: UnscheduledReason::OutsideWindow,
                    });
                    continue;
                }
            };
            match self.find_slot(&entry.item, &bounds, &occupied) {
                Some(slot) => {
                    occupied.push(slot);
                    result.placed.push(PlacedItem {
                        item: entry.item,
                        interval: slot,
                    });
                }
                None => {
                    let reason = if entry.displaced {
                        UnscheduledReason::DisplacedByProtection
                    } else {
                        UnscheduledReason::NoFreeSlot
                    };
                    result.unscheduled.push(UnscheduledItem {
                        item: entry.item,
                        reason,
                    });
                }
            }
        }

        result.placed.sort_by_key(|p| p.interval.start);
        result
    }

    /// Earliest free interval that fits the item, preferring the
    /// higher-alignment candidate among starts within the same calendar hour.
    pub fn find_slot(
        &self,
        item: &SchedulableItem,
        bounds: &Interval,
        occupied: &[Interval],
    ) -> Option<Interval> {
        let duration = Duration::minutes(item.duration_minutes());
        let candidates: Vec<Interval> = free_intervals(bounds, occupied)
            .into_iter()
            .filter(|f| f.duration_minutes() >= self.config.min_slot_minutes)
            .filter_map(|f| {
                let end = f.start + duration;
                (end <= f.end).then_some(Interval {
                    start: f.start,
                    end,
                })
            })
            .collect();

        let first = *candidates.first()?;
        let mut best = first;
        let mut best_alignment = self
            .scorer
            .alignment_at(item.energy_profile, &first);
        for candidate in candidates.iter().skip(1) {
            if !same_calendar_hour(&first.start, &candidate.start) {
                break;
            }
            let alignment = self.scorer.alignment_at(item.energy_profile, candidate);
            if alignment > best_alignment {
                best = *candidate;
                best_alignment = alignment;
            }
        }
        Some(best)
    }
}

fn same_calendar_hour(a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive() && a.hour() == b.hour()
}

fn search_bounds(entry: &Pending, day: &Interval) -> Option<Interval> {
    match &entry.item.window {
        // Displaced fixed items search the whole day.
        TimeWindow::Fixed { .. } => Some(*day),
        TimeWindow::Flexible {
            earliest, latest, ..
        } => {
            let start = (*earliest).max(day.start);
            let end = (*latest).min(day.end);
            (start < end).then_some(Interval { start, end })
        }
    }
}

/// Tie-break order: score desc, earlier deadline, in-person first, more
/// attendees first, longer duration first. The sort is stable, so full ties
/// preserve input order and results are reproducible.
fn compare_pending(a: &Pending, b: &Pending) -> Ordering {
    b.item
        .priority_score()
        .partial_cmp(&a.item.priority_score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item.window.deadline().cmp(&b.item.window.deadline()))
        .then_with(|| b.item.in_person.cmp(&a.item.in_person))
        .then_with(|| b.item.attendee_count.cmp(&a.item.attendee_count))
        .then_with(|| b.item.duration_minutes().cmp(&a.item.duration_minutes()))
}

/// Free intervals within `bounds` not covered by `occupied`.
pub fn free_intervals(bounds: &Interval, occupied: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = occupied.to_vec();
    sorted.sort_by_key(|i| i.start);

    let mut free = Vec::new();
    let mut cursor = bounds.start;
    for busy in &sorted {
        if busy.end <= cursor {
            continue;
        }
        if busy.start >= bounds.end {
            break;
        }
        if busy.start > cursor {
            free.push(Interval {
                start: cursor,
                end: busy.start.min(bounds.end),
            });
        }
        cursor = cursor.max(busy.end.min(bounds.end));
    }
    if cursor < bounds.end {
        free.push(Interval {
            start: cursor,
            end: bounds.end,
        });
    }
    free
}
