//! Raw input normalization.
//!
//! Turns heterogeneous inputs (calendar events, tasks, flagged emails) into a
//! uniform list of `SchedulableItem`s. Malformed items never abort the run:
//! each one is dropped with its reason and reported alongside the survivors.
//!
//! Normalization happens before `optimize` and outside of it, so callers that
//! already hold shaped items can skip this module entirely.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::item::{
    EnergyProfile, Interval, ItemKind, MeetingSignals, SchedulableItem, TimeWindow,
};

/// Default task duration when no estimate is given.
const DEFAULT_TASK_MINUTES: i64 = 30;
/// Duration of an email-response reminder.
const EMAIL_REPLY_MINUTES: i64 = 15;

/// A calendar event as delivered by the data source.
///
/// Agenda, outcome, and decision signals arrive pre-extracted as booleans;
/// the normalizer does not parse prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendee_count: u32,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub in_person: bool,
    /// The user organized this event themselves.
    #[serde(default)]
    pub is_organizer: bool,
    #[serde(default)]
    pub has_agenda: bool,
    #[serde(default)]
    pub has_outcomes: bool,
    #[serde(default)]
    pub decision_authority: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub energy_profile: Option<EnergyProfile>,
    #[serde(default)]
    pub goal_tags: Vec<String>,
}

/// A task with a deadline but no fixed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due: Option<DateTime<Utc>>,
    /// Effort estimate in minutes; 30 when absent.
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub energy_profile: Option<EnergyProfile>,
    #[serde(default)]
    pub goal_tags: Vec<String>,
}

/// An email the user flagged for follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFlaggedEmail {
    pub id: String,
    pub sender: String,
    pub subject: String,
    /// When set, a task already tracks this email and no reminder is created.
    #[serde(default)]
    pub linked_task_id: Option<String>,
    #[serde(default)]
    pub urgent: bool,
}

/// An input rejected during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub id: String,
    pub reason: String,
}

/// Normalization output: the shaped items plus everything that was rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub items: Vec<SchedulableItem>,
    pub dropped: Vec<DroppedItem>,
}

/// Normalizer anchored at a reference instant.
///
/// `now` is the earliest admissible placement for flexible items and the
/// reference for due-today urgency promotion.
pub struct ItemNormalizer {
    now: DateTime<Utc>,
}

impl ItemNormalizer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Normalize all inputs into one report.
    pub fn normalize(
        &self,
        events: &[RawEvent],
        tasks: &[RawTask],
        emails: &[RawFlaggedEmail],
    ) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        for event in events {
            match self.normalize_event(event) {
                Ok(item) => report.items.push(item),
                Err(reason) => drop_item(&mut report, &event.id, reason),
            }
        }
        for task in tasks {
            match self.normalize_task(task) {
                Ok(item) => report.items.push(item),
                Err(reason) => drop_item(&mut report, &task.id, reason),
            }
        }
        for email in emails {
            if email.linked_task_id.is_some() {
                continue;
            }
            match self.normalize_email(email) {
                Ok(item) => report.items.push(item),
                Err(reason) => drop_item(&mut report, &email.id, reason),
            }
        }

        report
    }

    /// Events with a concrete start and end become fixed items.
    pub fn normalize_event(&self, event: &RawEvent) -> Result<SchedulableItem, ValidationError> {
        let start = event.start.ok_or_else(|| ValidationError::MissingField {
            item_id: event.id.clone(),
            field: "start".to_string(),
        })?;
        let end = event.end.ok_or_else(|| ValidationError::MissingField {
            item_id: event.id.clone(),
            field: "end".to_string(),
        })?;
        let interval = Interval::try_new(start, end)?;

        let kind = if event.attendee_count > 0 {
            ItemKind::Meeting
        } else {
            ItemKind::Task
        };

        let mut item = SchedulableItem::new(
            &event.id,
            kind,
            &event.title,
            TimeWindow::Fixed { interval },
        )
        .with_flags(event.urgent, event.important)
        .with_attendees(event.attendee_count, event.in_person);
        item.attendees = event.attendees.clone();
        item.description = event.description.clone();
        item.energy_profile = event.energy_profile;
        item.goal_tags = event.goal_tags.clone();
        if kind == ItemKind::Meeting {
            item.meeting_signals = Some(MeetingSignals {
                has_agenda: event.has_agenda,
                has_outcomes: event.has_outcomes,
                presence_criticality: presence_criticality(event),
                strategic_alignment: None,
                decision_authority: event.decision_authority,
            });
        }
        Ok(item)
    }

    /// Tasks become flexible items bounded by `[now, due]`.
    pub fn normalize_task(&self, task: &RawTask) -> Result<SchedulableItem, ValidationError> {
        let due = task.due.ok_or_else(|| ValidationError::MissingField {
            item_id: task.id.clone(),
            field: "due".to_string(),
        })?;
        let minutes = task.estimated_minutes.unwrap_or(DEFAULT_TASK_MINUTES);
        let window = TimeWindow::flexible(minutes, self.now, due)?;

        // Due today or earlier gets promoted to urgent.
        let urgent = task.urgent || due.date_naive() <= self.now.date_naive();

        let mut item = SchedulableItem::new(&task.id, ItemKind::Task, &task.title, window)
            .with_flags(urgent, task.important);
        item.description = task.description.clone();
        item.energy_profile = task.energy_profile;
        item.goal_tags = task.goal_tags.clone();
        Ok(item)
    }

    /// Flagged emails become short response reminders due within a day.
    pub fn normalize_email(
        &self,
        email: &RawFlaggedEmail,
    ) -> Result<SchedulableItem, ValidationError> {
        let window = TimeWindow::flexible(
            EMAIL_REPLY_MINUTES,
            self.now,
            self.now + Duration::days(1),
        )?;
        let mut item = SchedulableItem::new(
            &email.id,
            ItemKind::Task,
            format!("Respond to email: {}", email.subject),
            window,
        )
        .with_flags(email.urgent, false)
        .with_energy_profile(EnergyProfile::Admin);
        item.description = Some(format!("From {}", email.sender));
        Ok(item)
    }
}

/// Organizers must be present; small meetings usually need them too.
fn presence_criticality(event: &RawEvent) -> u8 {
    if event.is_organizer {
        5
    } else if event.attendee_count <= 3 {
        4
    } else {
        3
    }
}

fn drop_item(report: &mut NormalizeReport, id: &str, reason: ValidationError) {
    debug!(item = id, %reason, "dropping malformed input");
    report.dropped.push(DroppedItem {
        id: id.to_string(),
        reason: reason.to_string(),
    });
}
