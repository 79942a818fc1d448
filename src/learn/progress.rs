//! Lesson progress tracking.
//!
//! Which signals complete which lesson kind is decided by one dispatch table,
//! [`COMPLETION_TRIGGERS`]. Completion writes are deduplicated per
//! `user:lesson` key: while a write is in flight, younger duplicates are
//! dropped rather than queued.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::backend::LearnBackend;
use super::error::LearnError;
use super::store::ProgressStore;
use super::types::{CompletionSignal, ContentType, Lesson, SignalKind};

const PASSIVE_SIGNALS: &[SignalKind] = &[
    SignalKind::Viewed,
    SignalKind::VideoEnded,
    SignalKind::PdfOpened,
    SignalKind::TextScrolledIntoView,
];

pub const COMPLETION_TRIGGERS: &[(ContentType, &[SignalKind])] = &[
    (ContentType::Video, PASSIVE_SIGNALS),
    (ContentType::Text, PASSIVE_SIGNALS),
    (ContentType::Pdf, PASSIVE_SIGNALS),
    (ContentType::Quiz, &[SignalKind::QuizPassed]),
];

pub fn completes(lesson: &Lesson, signal: &CompletionSignal) -> bool {
    let kind = signal.kind();
    let listed = COMPLETION_TRIGGERS
        .iter()
        .find(|(content_type, _)| *content_type == lesson.content_type)
        .map(|(_, kinds)| kinds.contains(&kind))
        .unwrap_or(false);

    match signal {
        CompletionSignal::QuizPassed(pass) => listed && pass.lesson_id() == lesson.id,
        _ => listed,
    }
}

pub fn dedup_key(user_id: Uuid, lesson_id: Uuid) -> String {
    format!("{}:{}", user_id, lesson_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    AlreadyCompleted,
    Coalesced,
    Completed,
}

type InFlight = Arc<Mutex<HashSet<String>>>;

fn claim(in_flight: &InFlight, key: &str) -> bool {
    let mut keys = in_flight.lock().unwrap_or_else(|e| e.into_inner());
    keys.insert(key.to_string())
}

fn release(in_flight: &InFlight, key: &str) {
    let mut keys = in_flight.lock().unwrap_or_else(|e| e.into_inner());
    keys.remove(key);
}

#[derive(Clone)]
pub struct LessonProgressTracker {
    backend: Arc<dyn LearnBackend>,
    store: Arc<ProgressStore>,
    in_flight: InFlight,
}

impl LessonProgressTracker {
    pub fn new(backend: Arc<dyn LearnBackend>, store: Arc<ProgressStore>) -> Self {
        Self {
            backend,
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn is_completed(&self, user_id: Uuid, lesson_id: Uuid) -> bool {
        self.store.is_lesson_completed(user_id, lesson_id).await
    }

    /// Applies a learner signal to a lesson.
    ///
    /// The persistence write runs on its own task: if the caller is dropped
    /// mid-write, the write still lands and the store is still updated. The
    /// store is only touched once the collaborator has confirmed completion.
    pub async fn record_interaction(
        &self,
        user_id: Uuid,
        lesson: &Lesson,
        signal: &CompletionSignal,
    ) -> Result<Transition, LearnError> {
        if !completes(lesson, signal) {
            debug!(
                "Signal {:?} does not complete {} lesson {}",
                signal.kind(),
                lesson.content_type,
                lesson.id
            );
            return Ok(Transition::Ignored);
        }

        if self.store.is_lesson_completed(user_id, lesson.id).await {
            debug!("Lesson {} already completed for {}", lesson.id, user_id);
            return Ok(Transition::AlreadyCompleted);
        }

        let key = dedup_key(user_id, lesson.id);
        if !claim(&self.in_flight, &key) {
            debug!("Completion of {} already in flight, dropping duplicate", key);
            return Ok(Transition::Coalesced);
        }

        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let lesson_id = lesson.id;

        let write = tokio::spawn(async move {
            let _guard = scopeguard::guard(key, move |key| release(&in_flight, &key));

            // A write that resolved between the first check and the claim.
            if store.is_lesson_completed(user_id, lesson_id).await {
                return Ok(false);
            }

            let progress = backend
                .update_progress(user_id, lesson_id, true)
                .await
                .map_err(|e| {
                    warn!("Progress write for lesson {} failed: {}", lesson_id, e);
                    LearnError::PersistenceWriteFailed(e.to_string())
                })?;

            if !progress.is_completed || progress.lesson_id != lesson_id {
                return Err(LearnError::PersistenceWriteFailed(format!(
                    "collaborator did not confirm completion of lesson {}",
                    lesson_id
                )));
            }

            Ok(store.merge_lesson(progress).await)
        });

        let transitioned = write
            .await
            .map_err(|e| LearnError::PersistenceWriteFailed(e.to_string()))??;

        if transitioned {
            info!("Lesson {} completed for user {}", lesson.id, user_id);
            Ok(Transition::Completed)
        } else {
            Ok(Transition::AlreadyCompleted)
        }
    }
}
