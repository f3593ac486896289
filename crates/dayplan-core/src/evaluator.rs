//! Meeting evaluation decision procedure.
//!
//! Classifies each meeting before allocation. The procedure is a strict
//! decision tree expressed as an ordered rule table: the first rule that
//! matches wins and later rules are never consulted. The verdict never moves
//! a meeting by itself; the allocator and the proposal generator consume it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PreferenceConfig;
use crate::item::{ItemKind, MeetingSignals, SchedulableItem};
use crate::protection::ProtectedBlock;
use crate::scoring::PriorityScorer;

/// Terminal verdict for a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingVerdict {
    Keep,
    NeedsClarification,
    DelegationCandidate,
    DeclineCandidate,
    RescheduleCandidate,
    OverrideProtection,
}

impl MeetingVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::NeedsClarification => "needs_clarification",
            Self::DelegationCandidate => "delegation_candidate",
            Self::DeclineCandidate => "decline_candidate",
            Self::RescheduleCandidate => "reschedule_candidate",
            Self::OverrideProtection => "override_protection",
        }
    }
}

/// A verdict together with the rule that produced it.
///
/// Verdicts travel in a side table keyed by item id; the item itself is never
/// mutated by evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub verdict: MeetingVerdict,
    /// Stable rule name, surfaced as proposal rationale.
    pub rule: &'static str,
}

/// Inputs a rule predicate sees for one meeting.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub has_agenda: bool,
    pub has_outcomes: bool,
    pub presence_criticality: u8,
    pub strategic_alignment: u8,
    pub decision_authority: bool,
    pub urgent_important: bool,
    pub overlaps_protected: bool,
}

/// One entry in the ordered rule table.
pub struct EvaluationRule {
    pub name: &'static str,
    pub check: fn(&RuleContext) -> Option<MeetingVerdict>,
}

/// The ordered rule table. First match wins.
pub const RULES: &[EvaluationRule] = &[
    EvaluationRule {
        name: "missing_agenda_or_outcomes",
        check: |ctx| {
            (!ctx.has_agenda || !ctx.has_outcomes).then_some(MeetingVerdict::NeedsClarification)
        },
    },
    EvaluationRule {
        name: "presence_not_critical",
        check: |ctx| {
            (ctx.presence_criticality <= 2).then_some(MeetingVerdict::DelegationCandidate)
        },
    },
    EvaluationRule {
        name: "low_strategic_alignment",
        check: |ctx| (ctx.strategic_alignment <= 2).then_some(MeetingVerdict::DeclineCandidate),
    },
    EvaluationRule {
        name: "urgent_important_protected_conflict",
        check: |ctx| {
            (ctx.overlaps_protected && ctx.urgent_important)
                .then_some(MeetingVerdict::OverrideProtection)
        },
    },
    EvaluationRule {
        name: "protected_conflict",
        check: |ctx| ctx.overlaps_protected.then_some(MeetingVerdict::RescheduleCandidate),
    },
    EvaluationRule {
        name: "keep",
        check: |_| Some(MeetingVerdict::Keep),
    },
];

/// Run the rule table over a context. The trailing `keep` rule guarantees a
/// verdict.
pub fn apply_rules(ctx: &RuleContext) -> Verdict {
    for rule in RULES {
        if let Some(verdict) = (rule.check)(ctx) {
            return Verdict {
                verdict,
                rule: rule.name,
            };
        }
    }
    unreachable!("rule table always terminates with the keep rule")
}

/// Meeting evaluator bound to one configuration.
pub struct MeetingEvaluator<'a> {
    scorer: PriorityScorer<'a>,
}

impl<'a> MeetingEvaluator<'a> {
    pub fn new(config: &'a PreferenceConfig) -> Self {
        Self {
            scorer: PriorityScorer::new(config),
        }
    }

    /// Evaluate one item. Returns None for non-meetings.
    pub fn evaluate(
        &self,
        item: &SchedulableItem,
        protected_blocks: &[ProtectedBlock],
    ) -> Option<Verdict> {
        if item.kind != ItemKind::Meeting {
            return None;
        }
        let signals = item.meeting_signals.unwrap_or(MeetingSignals {
            has_agenda: false,
            has_outcomes: false,
            presence_criticality: 3,
            strategic_alignment: None,
            decision_authority: false,
        });

        let strategic_alignment = signals
            .strategic_alignment
            .unwrap_or_else(|| self.derive_strategic_alignment(item));

        let overlaps_protected = item
            .window
            .fixed_interval()
            .map(|interval| {
                protected_blocks
                    .iter()
                    .any(|b| b.interval.overlaps(&interval))
            })
            .unwrap_or(false);

        let ctx = RuleContext {
            has_agenda: signals.has_agenda,
            has_outcomes: signals.has_outcomes,
            presence_criticality: signals.presence_criticality,
            strategic_alignment,
            decision_authority: signals.decision_authority,
            urgent_important: item.urgent && item.important,
            overlaps_protected,
        };
        Some(apply_rules(&ctx))
    }

    /// Evaluate every meeting, keyed by item id.
    pub fn evaluate_all(
        &self,
        items: &[SchedulableItem],
        protected_blocks: &[ProtectedBlock],
    ) -> BTreeMap<String, Verdict> {
        items
            .iter()
            .filter_map(|item| {
                self.evaluate(item, protected_blocks)
                    .map(|v| (item.id.clone(), v))
            })
            .collect()
    }

    /// Map goal alignment (0-100) onto the 1-5 strategic alignment scale.
    fn derive_strategic_alignment(&self, item: &SchedulableItem) -> u8 {
        let alignment = self.scorer.goal_alignment(&item.goal_tags);
        ((alignment / 20.0).round() as u8).clamp(1, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreferenceConfig;
    use crate::item::{Interval, TimeWindow};
    use crate::protection::{BlockCategory, ProtectionLevel};
    use chrono::{DateTime, TimeZone, Utc};

    fn ctx() -> RuleContext {
        RuleContext {
            has_agenda: true,
            has_outcomes: true,
            presence_criticality: 5,
            strategic_alignment: 5,
            decision_authority: true,
            urgent_important: false,
            overlaps_protected: false,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn meeting(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> SchedulableItem {
        SchedulableItem::new(
            id,
            ItemKind::Meeting,
            "meeting",
            TimeWindow::Fixed {
                interval: Interval::try_new(start, end).unwrap(),
            },
        )
    }

    fn signals() -> MeetingSignals {
        MeetingSignals {
            has_agenda: true,
            has_outcomes: true,
            presence_criticality: 5,
            strategic_alignment: Some(5),
            decision_authority: true,
        }
    }

    #[test]
    fn missing_agenda_always_needs_clarification() {
        // Everything else is as strong as it gets; the first rule still wins.
        let mut c = ctx();
        c.has_agenda = false;
        let verdict = apply_rules(&c);
        assert_eq!(verdict.verdict, MeetingVerdict::NeedsClarification);
        assert_eq!(verdict.rule, "missing_agenda_or_outcomes");

        let mut c = ctx();
        c.has_outcomes = false;
        assert_eq!(
            apply_rules(&c).verdict,
            MeetingVerdict::NeedsClarification
        );
    }

    #[test]
    fn low_presence_criticality_delegates() {
        let mut c = ctx();
        c.presence_criticality = 2;
        let verdict = apply_rules(&c);
        assert_eq!(verdict.verdict, MeetingVerdict::DelegationCandidate);
        assert_eq!(verdict.rule, "presence_not_critical");
    }

    #[test]
    fn low_strategic_alignment_declines() {
        let mut c = ctx();
        c.strategic_alignment = 2;
        assert_eq!(apply_rules(&c).verdict, MeetingVerdict::DeclineCandidate);
    }

    #[test]
    fn protected_conflict_reschedules_unless_urgent_important() {
        let mut c = ctx();
        c.overlaps_protected = true;
        assert_eq!(
            apply_rules(&c).verdict,
            MeetingVerdict::RescheduleCandidate
        );

        c.urgent_important = true;
        let verdict = apply_rules(&c);
        assert_eq!(verdict.verdict, MeetingVerdict::OverrideProtection);
        assert_eq!(verdict.rule, "urgent_important_protected_conflict");
    }

    #[test]
    fn clean_meeting_is_kept() {
        assert_eq!(apply_rules(&ctx()).verdict, MeetingVerdict::Keep);
    }

    #[test]
    fn rules_are_checked_in_order() {
        // Delegation-worthy AND decline-worthy: the earlier rule wins.
        let mut c = ctx();
        c.presence_criticality = 1;
        c.strategic_alignment = 1;
        assert_eq!(
            apply_rules(&c).verdict,
            MeetingVerdict::DelegationCandidate
        );
    }

    #[test]
    fn evaluator_skips_non_meetings() {
        let config = PreferenceConfig::default();
        let evaluator = MeetingEvaluator::new(&config);
        let task = SchedulableItem::new(
            "t1",
            ItemKind::Task,
            "task",
            TimeWindow::flexible(30, at(9, 0), at(17, 0)).unwrap(),
        );
        assert!(evaluator.evaluate(&task, &[]).is_none());
    }

    #[test]
    fn evaluator_detects_protected_overlap() {
        let config = PreferenceConfig::default();
        let evaluator = MeetingEvaluator::new(&config);
        let block = ProtectedBlock {
            id: "protected_research_2025-06-02".to_string(),
            category: BlockCategory::Research,
            interval: Interval::try_new(at(6, 0), at(8, 0)).unwrap(),
            level: ProtectionLevel::Medium,
        };

        let item = meeting("m1", at(6, 30), at(7, 0))
            .with_flags(true, true)
            .with_meeting_signals(signals());
        let verdict = evaluator.evaluate(&item, &[block.clone()]).unwrap();
        assert_eq!(verdict.verdict, MeetingVerdict::OverrideProtection);

        let calm = meeting("m2", at(6, 30), at(7, 0)).with_meeting_signals(signals());
        let verdict = evaluator.evaluate(&calm, &[block]).unwrap();
        assert_eq!(verdict.verdict, MeetingVerdict::RescheduleCandidate);
    }

    #[test]
    fn strategic_alignment_derived_from_goal_tags() {
        let mut config = PreferenceConfig::default();
        config.goals.weights.insert("venture".to_string(), 90.0);
        let evaluator = MeetingEvaluator::new(&config);

        let mut s = signals();
        s.strategic_alignment = None;
        // No goal tags: derived alignment clamps to 1 and the meeting is a
        // decline candidate.
        let unaligned = meeting("m1", at(12, 0), at(13, 0)).with_meeting_signals(s);
        assert_eq!(
            evaluator.evaluate(&unaligned, &[]).unwrap().verdict,
            MeetingVerdict::DeclineCandidate
        );

        let aligned = meeting("m2", at(12, 0), at(13, 0))
            .with_meeting_signals(s)
            .with_goal_tag("venture");
        assert_eq!(
            evaluator.evaluate(&aligned, &[]).unwrap().verdict,
            MeetingVerdict::Keep
        );
    }
}
