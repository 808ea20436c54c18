//! coursegate - learning progress and quiz gating for course clients
//!
//! Tracks which lectures and slides a learner has consumed, decides when a
//! chapter quiz unlocks, rolls chapter state up into course progress, and
//! keeps unread message/notification badges in step with the server under
//! optimistic local updates.

pub mod config;
pub mod counters;
pub mod dashboard;
pub mod error;
pub mod progress;
pub mod remote;
pub mod session;

pub use config::Config;
pub use counters::{CounterKind, CounterSynchronizer};
pub use dashboard::{DashboardAggregator, DashboardView, Role};
pub use error::{AttemptRejection, EngineError, IntegrityWarning};
pub use progress::{ChapterStatus, CourseReport};
pub use remote::{HttpRemote, RemoteApi, RemoteError};
pub use session::{Freshness, LearnerSession, PendingWrite};
