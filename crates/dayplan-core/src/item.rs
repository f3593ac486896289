//! Schedulable item types and interval utilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scoring::ScoreBreakdown;

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Create a new interval, returning a Result
    ///
    /// # Errors
    /// Returns an error if `end <= start`
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Check if this interval overlaps with another
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Check if this interval fully contains another
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Minutes between this interval and another; 0 when they overlap or touch.
    pub fn gap_minutes(&self, other: &Self) -> i64 {
        if self.overlaps(other) {
            return 0;
        }
        if self.end <= other.start {
            (other.start - self.end).num_minutes()
        } else {
            (self.start - other.end).num_minutes()
        }
    }
}

/// Where an item may be placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeWindow {
    /// The item occupies exactly this interval.
    Fixed { interval: Interval },
    /// The item needs `duration_minutes`, placed anywhere in `[earliest, latest]`.
    Flexible {
        duration_minutes: i64,
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
}

impl TimeWindow {
    /// Build a flexible window, validating the bounds.
    ///
    /// # Errors
    /// Returns an error when the bounds are inverted or cannot hold the duration.
    pub fn flexible(
        duration_minutes: i64,
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if earliest > latest {
            return Err(ValidationError::InvalidBounds { earliest, latest });
        }
        let window_minutes = (latest - earliest).num_minutes();
        if duration_minutes <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_minutes".to_string(),
                message: format!("must be positive, got {duration_minutes}"),
            });
        }
        if window_minutes < duration_minutes {
            return Err(ValidationError::WindowTooSmall {
                duration_minutes,
                window_minutes,
            });
        }
        Ok(Self::Flexible {
            duration_minutes,
            earliest,
            latest,
        })
    }

    /// Duration the item needs, in minutes.
    pub fn duration_minutes(&self) -> i64 {
        match self {
            Self::Fixed { interval } => interval.duration_minutes(),
            Self::Flexible {
                duration_minutes, ..
            } => *duration_minutes,
        }
    }

    /// The concrete interval, for fixed windows only.
    pub fn fixed_interval(&self) -> Option<Interval> {
        match self {
            Self::Fixed { interval } => Some(*interval),
            Self::Flexible { .. } => None,
        }
    }

    /// Latest admissible end, used as the placement deadline.
    pub fn deadline(&self) -> DateTime<Utc> {
        match self {
            Self::Fixed { interval } => interval.end,
            Self::Flexible { latest, .. } => *latest,
        }
    }
}

/// Kind of schedulable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Meeting,
    Task,
    DeepWorkSlot,
    ProtectedBlock,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Task => "task",
            Self::DeepWorkSlot => "deep_work_slot",
            Self::ProtectedBlock => "protected_block",
        }
    }
}

/// Activity tag used to match an item against the user's energy curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyProfile {
    Research,
    Calls,
    Exercise,
    Meetings,
    Admin,
    Family,
    Learning,
}

/// Ordinal inputs for the meeting evaluation decision tree.
///
/// `strategic_alignment` may be left unset, in which case the evaluator
/// derives it from the item's goal tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSignals {
    pub has_agenda: bool,
    pub has_outcomes: bool,
    /// 1-5: how critical the user's presence is
    pub presence_criticality: u8,
    /// 1-5, derived from goal alignment when None
    pub strategic_alignment: Option<u8>,
    /// Whether decisions are expected to be made
    pub decision_authority: bool,
}

/// A unit of work to place on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulableItem {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub window: TimeWindow,
    /// True for items whose time cannot move without explicit rescheduling.
    pub fixed: bool,
    #[serde(default)]
    pub attendee_count: u32,
    /// Attendee identifiers, used for availability lookups when rescheduling.
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub in_person: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    pub energy_profile: Option<EnergyProfile>,
    #[serde(default)]
    pub goal_tags: Vec<String>,
    /// Computed by the scorer before allocation; never supplied as input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<ScoreBreakdown>,
    /// Present only for `kind = Meeting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_signals: Option<MeetingSignals>,
}

impl SchedulableItem {
    /// Create a new item with the given window.
    pub fn new(
        id: impl Into<String>,
        kind: ItemKind,
        title: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        let fixed = matches!(window, TimeWindow::Fixed { .. });
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: None,
            window,
            fixed,
            attendee_count: 0,
            attendees: Vec::new(),
            in_person: false,
            urgent: false,
            important: false,
            energy_profile: None,
            goal_tags: Vec::new(),
            priority: None,
            meeting_signals: None,
        }
    }

    /// Set urgency and importance flags.
    pub fn with_flags(mut self, urgent: bool, important: bool) -> Self {
        self.urgent = urgent;
        self.important = important;
        self
    }

    /// Set the energy profile tag.
    pub fn with_energy_profile(mut self, profile: EnergyProfile) -> Self {
        self.energy_profile = Some(profile);
        self
    }

    /// Add a goal tag.
    pub fn with_goal_tag(mut self, tag: impl Into<String>) -> Self {
        self.goal_tags.push(tag.into());
        self
    }

    /// Set attendee count and in-person flag.
    pub fn with_attendees(mut self, count: u32, in_person: bool) -> Self {
        self.attendee_count = count;
        self.in_person = in_person;
        self
    }

    /// Attach meeting evaluation signals.
    pub fn with_meeting_signals(mut self, signals: MeetingSignals) -> Self {
        self.meeting_signals = Some(signals);
        self
    }

    /// Duration the item needs, in minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.window.duration_minutes()
    }

    /// The final priority score, 0 when not yet scored.
    pub fn priority_score(&self) -> f64 {
        self.priority.as_ref().map(|p| p.final_score).unwrap_or(0.0)
    }
}
