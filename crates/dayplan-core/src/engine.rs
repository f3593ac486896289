//! Optimization engine.
//!
//! Ties the pipeline together: score, evaluate, materialize protection,
//! allocate, derive metrics, generate proposals. The optimizer owns an
//! immutable configuration and holds no other state, so a single instance can
//! be shared and re-run freely; identical inputs produce identical placements.

use chrono::NaiveDate;
use tracing::{info, info_span};

use crate::allocator::Allocator;
use crate::config::PreferenceConfig;
use crate::error::Result;
use crate::evaluator::MeetingEvaluator;
use crate::item::{Interval, SchedulableItem};
use crate::normalize::NormalizeReport;
use crate::proposal::{AvailabilityProvider, ProposalGenerator};
use crate::protection::ProtectedBlockRegistry;
use crate::schedule::{Schedule, ScheduleMetrics};
use crate::scoring::PriorityScorer;

#[derive(Debug)]
pub struct Optimizer {
    config: PreferenceConfig,
}

impl Optimizer {
    /// Create an optimizer, validating the configuration up front.
    ///
    /// # Errors
    /// `ConfigError` when the configuration is inconsistent. No partial
    /// schedule is ever produced from a bad configuration.
    pub fn new(config: PreferenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreferenceConfig {
        &self.config
    }

    /// Optimize one day of already-shaped items.
    pub fn optimize(&self, date: NaiveDate, items: Vec<SchedulableItem>) -> Result<Schedule> {
        self.run(date, items, Vec::new(), None)
    }

    /// Optimize with attendee availability backing the reschedule search.
    pub fn optimize_with_proposals(
        &self,
        date: NaiveDate,
        items: Vec<SchedulableItem>,
        provider: &dyn AvailabilityProvider,
    ) -> Result<Schedule> {
        self.run(date, items, Vec::new(), Some(provider))
    }

    /// Optimize a normalization report, carrying its dropped items into the
    /// schedule.
    pub fn optimize_report(&self, date: NaiveDate, report: NormalizeReport) -> Result<Schedule> {
        self.run(date, report.items, report.dropped, None)
    }

    fn run(
        &self,
        date: NaiveDate,
        mut items: Vec<SchedulableItem>,
        dropped: Vec<crate::normalize::DroppedItem>,
        provider: Option<&dyn AvailabilityProvider>,
    ) -> Result<Schedule> {
        let span = info_span!("optimize", %date, items = items.len());
        let _guard = span.enter();

        let scorer = PriorityScorer::new(&self.config);
        scorer.score_all(&mut items);

        // Protected blocks are materialized against the day's immovable
        // commitments so preferred/alternative placement can dodge them.
        let fixed: Vec<Interval> = items
            .iter()
            .filter(|i| i.fixed)
            .filter_map(|i| i.window.fixed_interval())
            .collect();
        let blocks = ProtectedBlockRegistry::new(&self.config).materialize(date, &fixed)?;

        let evaluator = MeetingEvaluator::new(&self.config);
        let verdicts = evaluator.evaluate_all(&items, &blocks);

        let allocator = Allocator::new(&self.config);
        let allocation = allocator.allocate(date, &items, &verdicts, &blocks);

        let metrics = ScheduleMetrics::compute(
            &allocation.placed,
            &blocks,
            &allocation.overrides,
            &self.config.goals,
        );

        let mut schedule = Schedule {
            date,
            placed: allocation.placed,
            protected: blocks,
            unscheduled: allocation.unscheduled,
            overrides: allocation.overrides,
            proposals: Vec::new(),
            dropped,
            metrics,
        };
        schedule.proposals =
            ProposalGenerator::new(&self.config).generate(&schedule, &verdicts, provider);

        info!(
            placed = schedule.placed.len(),
            unscheduled = schedule.unscheduled.len(),
            overrides = schedule.overrides.len(),
            proposals = schedule.proposals.len(),
            "optimization complete"
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::item::{ItemKind, MeetingSignals, TimeWindow};
    use chrono::{DateTime, TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn meeting(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> SchedulableItem {
        SchedulableItem::new(
            id,
            ItemKind::Meeting,
            id,
            TimeWindow::Fixed {
                interval: Interval::try_new(start, end).unwrap(),
            },
        )
    }

    #[test]
    fn invalid_config_is_rejected_before_any_run() {
        let mut config = PreferenceConfig::default();
        config.min_slot_minutes = 0;
        let err = Optimizer::new(config).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn full_pipeline_produces_a_conflict_free_schedule() {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let items = vec![
            meeting("m1", at(12, 30), at(13, 30)).with_flags(false, true),
            SchedulableItem::new(
                "t1",
                ItemKind::Task,
                "Draft proposal",
                TimeWindow::flexible(45, at(6, 0), at(22, 0)).unwrap(),
            )
            .with_flags(false, true),
        ];

        let schedule = optimizer.optimize(date(), items).unwrap();

        assert!(schedule.is_conflict_free());
        assert_eq!(schedule.protected.len(), 5);
        assert!(schedule.placed.iter().any(|p| p.item.id == "m1"));
        assert!(schedule.placed.iter().any(|p| p.item.id == "t1"));
        // Flexible items never land inside protected blocks.
        let task = schedule.placed.iter().find(|p| p.item.id == "t1").unwrap();
        assert!(schedule
            .protected
            .iter()
            .all(|b| !b.interval.overlaps(&task.interval)));
    }

    #[test]
    fn urgent_important_meeting_overrides_research_block() {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let item = meeting("m1", at(6, 30), at(7, 0))
            .with_flags(true, true)
            .with_meeting_signals(MeetingSignals {
                has_agenda: true,
                has_outcomes: true,
                presence_criticality: 5,
                strategic_alignment: Some(5),
                decision_authority: true,
            });

        let schedule = optimizer.optimize(date(), vec![item]).unwrap();

        assert_eq!(schedule.overrides.len(), 1);
        assert_eq!(schedule.overrides[0].item_id, "m1");
        assert!(schedule.metrics.protected_minutes_preserved
            < schedule.metrics.protected_minutes_defined);
        assert!(schedule.metrics.balance_score < 100.0);
    }

    #[test]
    fn runs_are_reproducible() {
        let optimizer = Optimizer::new(PreferenceConfig::default()).unwrap();
        let items = vec![
            meeting("m1", at(12, 30), at(13, 30)),
            SchedulableItem::new(
                "t1",
                ItemKind::Task,
                "Task",
                TimeWindow::flexible(30, at(6, 0), at(22, 0)).unwrap(),
            ),
        ];

        let a = optimizer.optimize(date(), items.clone()).unwrap();
        let b = optimizer.optimize(date(), items).unwrap();

        assert_eq!(a.placed, b.placed);
        assert_eq!(a.unscheduled, b.unscheduled);
        assert_eq!(a.metrics, b.metrics);
    }
}
