//! Property tests for the allocator's structural invariants.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use dayplan_core::allocator::free_intervals;
use dayplan_core::{
    Interval, ItemKind, Optimizer, PreferenceConfig, SchedulableItem, TimeWindow,
};
use proptest::prelude::*;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
}

/// Fixed 30-minute commitments at distinct hour starts, so the fixed part of
/// the input is conflict-free by construction.
fn fixed_items(hours: &BTreeSet<u32>) -> Vec<SchedulableItem> {
    hours
        .iter()
        .map(|&h| {
            let interval = Interval::try_new(at(h, 0), at(h, 30)).unwrap();
            SchedulableItem::new(
                format!("fixed-{h}"),
                ItemKind::Task,
                format!("fixed-{h}"),
                TimeWindow::Fixed { interval },
            )
        })
        .collect()
}

fn flexible_items(durations: &[i64]) -> Vec<SchedulableItem> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &minutes)| {
            SchedulableItem::new(
                format!("flex-{i}"),
                ItemKind::Task,
                format!("flex-{i}"),
                TimeWindow::flexible(minutes, at(6, 0), at(22, 0)).unwrap(),
            )
            .with_flags(i % 2 == 0, i % 3 == 0)
        })
        .collect()
}

proptest! {
    #[test]
    fn placed_items_never_overlap(
        hours in prop::collection::btree_set(6u32..21, 0..6),
        durations in prop::collection::vec(15i64..90, 0..8),
    ) {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let mut items = fixed_items(&hours);
        items.extend(flexible_items(&durations));

        let schedule = optimizer.optimize(date(), items).unwrap();
        prop_assert!(schedule.is_conflict_free());
    }

    #[test]
    fn flexible_items_respect_protection_and_bounds(
        hours in prop::collection::btree_set(6u32..21, 0..6),
        durations in prop::collection::vec(15i64..90, 0..8),
    ) {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let mut items = fixed_items(&hours);
        items.extend(flexible_items(&durations));

        let schedule = optimizer.optimize(date(), items).unwrap();
        let day_start = at(6, 0);
        let day_end = at(22, 0);

        for placed in schedule.placed.iter().filter(|p| !p.item.fixed) {
            prop_assert!(placed.interval.start >= day_start);
            prop_assert!(placed.interval.end <= day_end);
            for block in &schedule.protected {
                prop_assert!(!placed.interval.overlaps(&block.interval));
            }
        }
    }

    #[test]
    fn every_input_lands_exactly_once(
        hours in prop::collection::btree_set(6u32..21, 0..6),
        durations in prop::collection::vec(15i64..90, 0..8),
    ) {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let mut items = fixed_items(&hours);
        items.extend(flexible_items(&durations));
        let input_ids: BTreeSet<String> = items.iter().map(|i| i.id.clone()).collect();

        let schedule = optimizer.optimize(date(), items).unwrap();
        let mut output_ids = Vec::new();
        output_ids.extend(schedule.placed.iter().map(|p| p.item.id.clone()));
        output_ids.extend(schedule.unscheduled.iter().map(|u| u.item.id.clone()));

        prop_assert_eq!(output_ids.len(), input_ids.len());
        let output_set: BTreeSet<String> = output_ids.into_iter().collect();
        prop_assert_eq!(output_set, input_ids);
    }

    #[test]
    fn free_intervals_partition_the_bounds(
        starts in prop::collection::vec((0i64..900, 10i64..120), 0..10),
    ) {
        let bounds = Interval::try_new(at(6, 0), at(22, 0)).unwrap();
        let occupied: Vec<Interval> = starts
            .iter()
            .map(|&(offset, len)| Interval {
                start: at(6, 0) + Duration::minutes(offset),
                end: at(6, 0) + Duration::minutes(offset + len),
            })
            .collect();

        let free = free_intervals(&bounds, &occupied);
        for gap in &free {
            prop_assert!(gap.start >= bounds.start);
            prop_assert!(gap.end <= bounds.end);
            prop_assert!(gap.start < gap.end);
            for busy in &occupied {
                prop_assert!(!gap.overlaps(busy));
            }
        }
        // Gaps come back ordered and disjoint.
        for pair in free.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }
}
