//! Per-user progress state. The store holds what the collaborators have
//! confirmed; everything else (module, course completion) is derived from a
//! [`ProgressSnapshot`] taken at evaluation time.

use log::trace;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::types::{Course, LessonProgress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    LessonCompleted { user_id: Uuid, lesson_id: Uuid },
    ModuleCompleted { user_id: Uuid, module_id: Uuid },
    CourseCompleted { user_id: Uuid, course_id: Uuid },
    SurveySubmitted { user_id: Uuid, survey_id: Uuid },
}

/// Point-in-time view of one learner's state within one course.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub completed_lessons: HashSet<Uuid>,
    pub answered_surveys: HashSet<Uuid>,
    pub recorded_modules: HashSet<Uuid>,
    pub course_completed: bool,
    pub started: bool,
}

#[derive(Debug, Default)]
struct StoreInner {
    lessons: HashMap<(Uuid, Uuid), LessonProgress>,
    surveys_answered: HashSet<(Uuid, Uuid)>,
    modules_recorded: HashSet<(Uuid, Uuid)>,
    courses_completed: HashSet<(Uuid, Uuid)>,
}

pub struct ProgressStore {
    inner: RwLock<StoreInner>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressStore {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            inner: RwLock::new(StoreInner::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    pub fn notify(&self, event: ProgressEvent) {
        // No subscribers is not an error.
        if self.events.send(event).is_err() {
            trace!("Progress event dropped: no subscribers");
        }
    }

    pub async fn lesson(&self, user_id: Uuid, lesson_id: Uuid) -> Option<LessonProgress> {
        self.inner
            .read()
            .await
            .lessons
            .get(&(user_id, lesson_id))
            .cloned()
    }

    pub async fn is_lesson_completed(&self, user_id: Uuid, lesson_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .lessons
            .get(&(user_id, lesson_id))
            .map(|p| p.is_completed)
            .unwrap_or(false)
    }

    /// Merges a confirmed record. Returns true only on a false→true transition,
    /// in which case `LessonCompleted` is published.
    pub async fn merge_lesson(&self, progress: LessonProgress) -> bool {
        let key = (progress.user_id, progress.lesson_id);
        let transitioned = {
            let mut inner = self.inner.write().await;
            let was_completed = inner
                .lessons
                .get(&key)
                .map(|p| p.is_completed)
                .unwrap_or(false);
            let merged = match inner.lessons.remove(&key) {
                Some(existing) => existing.merge(progress),
                None => LessonProgress::not_started(key.0, key.1).merge(progress),
            };
            let now_completed = merged.is_completed;
            inner.lessons.insert(key, merged);
            !was_completed && now_completed
        };

        if transitioned {
            self.notify(ProgressEvent::LessonCompleted {
                user_id: key.0,
                lesson_id: key.1,
            });
        }
        transitioned
    }

    pub async fn mark_survey_answered(&self, user_id: Uuid, survey_id: Uuid) -> bool {
        let inserted = self
            .inner
            .write()
            .await
            .surveys_answered
            .insert((user_id, survey_id));
        if inserted {
            self.notify(ProgressEvent::SurveySubmitted { user_id, survey_id });
        }
        inserted
    }

    pub async fn is_survey_answered(&self, user_id: Uuid, survey_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .surveys_answered
            .contains(&(user_id, survey_id))
    }

    /// Reserves the single "module completed" write. Returns false when the
    /// module was already recorded or another evaluation holds the claim.
    pub async fn claim_module(&self, user_id: Uuid, module_id: Uuid) -> bool {
        self.inner
            .write()
            .await
            .modules_recorded
            .insert((user_id, module_id))
    }

    pub async fn release_module(&self, user_id: Uuid, module_id: Uuid) {
        self.inner
            .write()
            .await
            .modules_recorded
            .remove(&(user_id, module_id));
    }

    pub async fn mark_course_completed(&self, user_id: Uuid, course_id: Uuid) -> bool {
        let inserted = self
            .inner
            .write()
            .await
            .courses_completed
            .insert((user_id, course_id));
        if inserted {
            self.notify(ProgressEvent::CourseCompleted { user_id, course_id });
        }
        inserted
    }

    pub async fn snapshot(&self, user_id: Uuid, course: &Course) -> ProgressSnapshot {
        let inner = self.inner.read().await;
        let mut snapshot = ProgressSnapshot {
            course_completed: inner.courses_completed.contains(&(user_id, course.id)),
            ..ProgressSnapshot::default()
        };

        for lesson in course.lessons() {
            if let Some(progress) = inner.lessons.get(&(user_id, lesson.id)) {
                snapshot.started = true;
                if progress.is_completed {
                    snapshot.completed_lessons.insert(lesson.id);
                }
            }
        }

        for module in &course.modules {
            if inner.modules_recorded.contains(&(user_id, module.id)) {
                snapshot.recorded_modules.insert(module.id);
            }
            if let Some(survey) = &module.survey {
                if inner.surveys_answered.contains(&(user_id, survey.id)) {
                    snapshot.answered_surveys.insert(survey.id);
                    snapshot.started = true;
                }
            }
        }

        snapshot
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(256)
    }
}
