//! # Dayplan Core Library
//!
//! This library provides the core scheduling logic for Dayplan: schedule
//! optimization and protected-time enforcement for a single user's day. It is
//! a pure decision engine; calendar connectors, digest rendering, and any
//! mutation of external calendars are thin layers over this crate.
//!
//! ## Pipeline
//!
//! - **Normalization**: raw events, tasks, and flagged emails become uniform
//!   `SchedulableItem`s; malformed inputs are dropped with reasons
//! - **Scoring**: composite priority from Eisenhower quadrant, energy-curve
//!   alignment, and strategic goal alignment
//! - **Protection**: recurring protected blocks materialized for the target
//!   day, with explicit override rules
//! - **Evaluation**: an ordered rule table classifies every meeting before
//!   anything is placed
//! - **Allocation**: greedy priority-ordered placement onto the free timeline
//! - **Proposals**: clarify/delegate/decline suggestions and concrete
//!   reschedule options for everything that could not be placed
//!
//! ## Key Components
//!
//! - [`Optimizer`]: Single entry point running the full pipeline
//! - [`PreferenceConfig`]: Immutable per-run configuration
//! - [`Schedule`]: The complete output, failures included as data
//! - [`AvailabilityProvider`]: Trait for attendee availability lookups

pub mod allocator;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod item;
pub mod normalize;
pub mod proposal;
pub mod protection;
pub mod schedule;
pub mod scoring;

pub use config::{EnergyCurveConfig, EnergySegment, GoalConfig, PreferenceConfig, ProtectedBlockSpec};
pub use engine::Optimizer;
pub use error::{AvailabilityError, ConfigError, CoreError, Result, ValidationError};
pub use evaluator::{MeetingEvaluator, MeetingVerdict, Verdict};
pub use item::{
    EnergyProfile, Interval, ItemKind, MeetingSignals, SchedulableItem, TimeWindow,
};
pub use normalize::{
    DroppedItem, ItemNormalizer, NormalizeReport, RawEvent, RawFlaggedEmail, RawTask,
};
pub use proposal::{
    AvailabilityFuture, AvailabilityProvider, Proposal, ProposalGenerator, ProposalKind,
};
pub use protection::{BlockCategory, ProtectedBlock, ProtectedBlockRegistry, ProtectionLevel};
pub use schedule::{
    OverrideRecord, PlacedItem, Schedule, ScheduleMetrics, UnscheduledItem, UnscheduledReason,
};
pub use scoring::{PriorityScorer, Quadrant, ScoreBreakdown};
