//! Proposal generation.
//!
//! Proposals are suggestions for the human to act on; the engine never
//! declines, delegates, or moves a committed meeting on its own. Verdicts from
//! the evaluator map onto clarify/delegate/decline suggestions, relocated
//! meetings surface their new slot for confirmation, and every unplaceable
//! item gets concrete reschedule options searched over the following days.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::allocator::free_intervals;
use crate::config::PreferenceConfig;
use crate::error::AvailabilityError;
use crate::evaluator::{MeetingVerdict, Verdict};
use crate::item::{Interval, SchedulableItem};
use crate::schedule::Schedule;

/// What kind of action a proposal suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// Ask the organizer for an agenda or desired outcomes.
    ClarifyRequest,
    /// Suggest sending a delegate instead of attending.
    DelegateSuggestion,
    /// Suggest declining outright.
    DeclineSuggestion,
    /// Offer concrete alternative intervals.
    RescheduleOptions,
}

/// A single actionable suggestion attached to the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    pub kind: ProposalKind,
    /// Candidate intervals; only populated for `RescheduleOptions`. For a
    /// meeting the allocator relocated, the assigned interval leads and
    /// alternatives follow.
    pub options: Vec<Interval>,
    /// The rule or allocation failure that motivated the proposal.
    pub rationale: String,
}

/// Future returned by an availability lookup.
pub type AvailabilityFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Interval>, AvailabilityError>> + Send + 'a>>;

/// Source of attendee busy intervals.
///
/// Implementations live outside the core (calendar connectors, test stubs).
/// Lookups return futures so a slow or unreachable backend can be cut off by
/// the configured timeout; a synchronous implementation wraps its result in a
/// ready future.
pub trait AvailabilityProvider: Send + Sync {
    /// Busy intervals for one attendee within `window`.
    ///
    /// # Errors
    /// Any error makes the caller treat the whole window as busy.
    fn resolve_attendee_availability<'a>(
        &'a self,
        attendee_id: &'a str,
        window: Interval,
    ) -> AvailabilityFuture<'a>;
}

/// Bound an availability lookup future to the configured timeout.
///
/// # Errors
/// `AvailabilityError::Timeout` when the future does not resolve in time.
pub async fn lookup_with_timeout<F>(
    attendee_id: &str,
    timeout_secs: u64,
    lookup: F,
) -> Result<Vec<Interval>, AvailabilityError>
where
    F: Future<Output = Result<Vec<Interval>, AvailabilityError>>,
{
    match tokio::time::timeout(StdDuration::from_secs(timeout_secs), lookup).await {
        Ok(result) => result,
        Err(_) => Err(AvailabilityError::Timeout {
            attendee_id: attendee_id.to_string(),
            timeout_secs,
        }),
    }
}

/// Generates proposals for one finished allocation.
pub struct ProposalGenerator<'a> {
    config: &'a PreferenceConfig,
}

impl<'a> ProposalGenerator<'a> {
    pub fn new(config: &'a PreferenceConfig) -> Self {
        Self { config }
    }

    /// Generate all proposals for a schedule.
    ///
    /// `provider` supplies attendee busy intervals for reschedule searches;
    /// without one, only the user's own busy state constrains the options.
    /// Lookups are driven on a dedicated single-thread runtime and bounded by
    /// `availability_timeout_secs` each, so do not call this from inside an
    /// async context when a provider is given.
    pub fn generate(
        &self,
        schedule: &Schedule,
        verdicts: &BTreeMap<String, Verdict>,
        provider: Option<&dyn AvailabilityProvider>,
    ) -> Vec<Proposal> {
        let runtime = provider.and_then(|_| {
            match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => Some(runtime),
                Err(err) => {
                    warn!(%err, "could not start lookup runtime, assuming attendees busy");
                    None
                }
            }
        });

        let mut proposals = Vec::new();

        for placed in &schedule.placed {
            let Some(verdict) = verdicts.get(&placed.item.id) else {
                continue;
            };
            let (kind, options) = match verdict.verdict {
                MeetingVerdict::NeedsClarification => (ProposalKind::ClarifyRequest, Vec::new()),
                MeetingVerdict::DelegationCandidate => {
                    (ProposalKind::DelegateSuggestion, Vec::new())
                }
                MeetingVerdict::DeclineCandidate => (ProposalKind::DeclineSuggestion, Vec::new()),
                MeetingVerdict::RescheduleCandidate => {
                    // The allocator moved this meeting off its original slot.
                    // The move still has to be confirmed with the attendees,
                    // so it ships as a proposal and never silently.
                    let mut options = vec![placed.interval];
                    options.extend(
                        self.reschedule_options(
                            &placed.item,
                            schedule,
                            provider,
                            runtime.as_ref(),
                        )
                        .into_iter()
                        .take(self.config.max_reschedule_options.saturating_sub(1)),
                    );
                    (ProposalKind::RescheduleOptions, options)
                }
                _ => continue,
            };
            proposals.push(Proposal {
                id: Uuid::new_v4().to_string(),
                item_id: placed.item.id.clone(),
                item_title: placed.item.title.clone(),
                kind,
                options,
                rationale: verdict.rule.to_string(),
            });
        }

        for entry in &schedule.unscheduled {
            let rationale = verdicts
                .get(&entry.item.id)
                .map(|v| v.rule.to_string())
                .unwrap_or_else(|| entry.reason.as_str().to_string());
            let options =
                self.reschedule_options(&entry.item, schedule, provider, runtime.as_ref());
            debug!(
                item = %entry.item.id,
                options = options.len(),
                "generated reschedule options"
            );
            proposals.push(Proposal {
                id: Uuid::new_v4().to_string(),
                item_id: entry.item.id.clone(),
                item_title: entry.item.title.clone(),
                kind: ProposalKind::RescheduleOptions,
                options,
                rationale,
            });
        }

        proposals
    }

    /// Candidate intervals over the reschedule horizon.
    ///
    /// Searches day by day against the user's busy state plus attendee busy
    /// intervals, earliest first, never offering the item's original interval.
    fn reschedule_options(
        &self,
        item: &SchedulableItem,
        schedule: &Schedule,
        provider: Option<&dyn AvailabilityProvider>,
        runtime: Option<&tokio::runtime::Runtime>,
    ) -> Vec<Interval> {
        let horizon_days = i64::from(self.config.reschedule_horizon_days);
        let window = Interval {
            start: schedule.date.and_time(self.config.day_start).and_utc(),
            end: (schedule.date + Duration::days(horizon_days))
                .and_time(self.config.day_end)
                .and_utc(),
        };

        let mut busy = schedule.busy_intervals();
        if let Some(provider) = provider {
            for attendee in &item.attendees {
                let result = match runtime {
                    Some(runtime) => runtime.block_on(lookup_with_timeout(
                        attendee,
                        self.config.availability_timeout_secs,
                        provider.resolve_attendee_availability(attendee, window),
                    )),
                    None => Err(AvailabilityError::LookupFailed {
                        attendee_id: attendee.clone(),
                        message: "no lookup runtime".to_string(),
                    }),
                };
                match result {
                    Ok(intervals) => busy.extend(intervals),
                    Err(err) => {
                        // Conservative fallback: the attendee is busy for the
                        // whole searched window.
                        warn!(attendee = %attendee, %err, "availability lookup failed, assuming busy");
                        busy.push(window);
                    }
                }
            }
        }

        let original = item.window.fixed_interval();
        let duration = Duration::minutes(item.duration_minutes());
        let mut options = Vec::new();

        for offset in 0..=horizon_days {
            let date = schedule.date + Duration::days(offset);
            let bounds = Interval {
                start: date.and_time(self.config.day_start).and_utc(),
                end: date.and_time(self.config.day_end).and_utc(),
            };
            for free in free_intervals(&bounds, &busy) {
                if free.duration_minutes() < self.config.min_slot_minutes {
                    continue;
                }
                let candidate = Interval {
                    start: free.start,
                    end: free.start + duration,
                };
                if candidate.end > free.end {
                    continue;
                }
                if original.is_some_and(|o| o.overlaps(&candidate)) {
                    continue;
                }
                options.push(candidate);
                if options.len() >= self.config.max_reschedule_options {
                    return options;
                }
            }
        }

        options
    }
}
