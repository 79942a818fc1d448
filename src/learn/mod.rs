//! # Learn Module - Course Progression
//!
//! Learner-side progression for the LMS:
//! - Quiz grading against a fixed pass threshold
//! - Lesson completion from viewing signals or a passed quiz
//! - Module completion gated by required lessons and the module survey
//! - Course completion and idempotent certificate issuance
//!
//! ## Architecture
//!
//! - `LearnBackend` abstracts the LMS REST collaborator (`HttpLearnClient`,
//!   or `InMemoryBackend` for local runs and tests)
//! - `ProgressStore` holds confirmed per-user state and broadcasts events
//! - `LearnEngine` runs the lesson → module → course cascade
//! - Axum handlers expose the engine over HTTP

pub mod backend;
pub mod certificate;
pub mod client;
pub mod completion;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod memory;
pub mod progress;
pub mod quiz;
pub mod store;
pub mod survey;
pub mod types;

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub use backend::{BackendError, LearnBackend};
pub use certificate::CertificateIssuer;
pub use client::HttpLearnClient;
pub use completion::{CourseCompletionEvaluator, ModuleCompletionEvaluator};
pub use engine::{LearnEngine, LearnerContext};
pub use error::LearnError;
pub use events::{spawn_event_consumer, spawn_event_logger, EventQueue, LearnerEvent};
pub use handlers::configure_learn_routes;
pub use memory::InMemoryBackend;
pub use progress::LessonProgressTracker;
pub use quiz::{QuizGradingEngine, QuizPass, PASS_THRESHOLD};
pub use store::{ProgressEvent, ProgressSnapshot, ProgressStore};
pub use survey::SurveyGateChecker;
pub use types::*;

/// Simplified configure function for module registration
pub fn configure(router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    router.merge(configure_learn_routes())
}
