//! In-process [`LearnBackend`] used for local runs (`backend.kind = "memory"`)
//! and by the test suites. Mirrors the collaborator semantics that matter to
//! the engine: idempotent progress writes, per-user survey responses and one
//! certificate per learner and course.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::backend::{BackendError, LearnBackend};
use super::quiz::QuizGradingEngine;
use super::types::{
    Certificate, Course, LessonProgress, QuizSubmission, RemoteCourseProgress, RemoteQuizOutcome,
    Survey, SurveyResponse, SurveySubmission,
};

#[derive(Default)]
struct MemoryState {
    courses: HashMap<Uuid, Course>,
    progress: HashMap<(Uuid, Uuid), LessonProgress>,
    modules: HashSet<(Uuid, Uuid)>,
    responses: HashMap<Uuid, Vec<SurveyResponse>>,
    certificates: HashMap<Uuid, Certificate>,
    quiz_outcomes: HashMap<Uuid, RemoteQuizOutcome>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    progress_writes: AtomicUsize,
    module_writes: AtomicUsize,
    certificates_generated: AtomicUsize,
    quiz_attempts: AtomicUsize,
    fail_progress_writes: AtomicBool,
    fail_module_writes: AtomicBool,
    fail_downloads: AtomicBool,
    fail_quiz_attempts: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_course(&self, course: Course) {
        self.state().courses.insert(course.id, course);
    }

    /// Seeds a progress record as if it had been written in an earlier session.
    pub fn seed_progress(&self, progress: LessonProgress) {
        self.state()
            .progress
            .insert((progress.user_id, progress.lesson_id), progress);
    }

    pub fn seed_module_completed(&self, user_id: Uuid, module_id: Uuid) {
        self.state().modules.insert((user_id, module_id));
    }

    pub fn seed_survey_response(&self, user_id: Uuid, survey_id: Uuid) {
        self.state()
            .responses
            .entry(survey_id)
            .or_default()
            .push(SurveyResponse {
                id: Uuid::new_v4(),
                survey_id,
                user_id,
                answers: Vec::new(),
                submitted_at: Utc::now(),
            });
    }

    /// Fixed grade returned by `submit_quiz` for a lesson, regardless of answers.
    pub fn set_quiz_outcome(&self, lesson_id: Uuid, outcome: RemoteQuizOutcome) {
        self.state().quiz_outcomes.insert(lesson_id, outcome);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_progress_writes(&self, fail: bool) {
        self.fail_progress_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_module_writes(&self, fail: bool) {
        self.fail_module_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_quiz_attempts(&self, fail: bool) {
        self.fail_quiz_attempts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn progress_writes(&self) -> usize {
        self.progress_writes.load(Ordering::SeqCst)
    }

    pub fn module_writes(&self) -> usize {
        self.module_writes.load(Ordering::SeqCst)
    }

    pub fn certificates_generated(&self) -> usize {
        self.certificates_generated.load(Ordering::SeqCst)
    }

    pub fn quiz_attempts(&self) -> usize {
        self.quiz_attempts.load(Ordering::SeqCst)
    }

    pub fn is_module_recorded(&self, user_id: Uuid, module_id: Uuid) -> bool {
        self.state().modules.contains(&(user_id, module_id))
    }

    pub fn stored_progress(&self, user_id: Uuid, lesson_id: Uuid) -> Option<LessonProgress> {
        self.state().progress.get(&(user_id, lesson_id)).cloned()
    }

    async fn delay(&self) {
        let ms = self.write_delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn find_survey(&self, survey_id: Uuid) -> Option<Survey> {
        self.state()
            .courses
            .values()
            .flat_map(|c| c.modules.iter())
            .filter_map(|m| m.survey.as_ref())
            .find(|s| s.id == survey_id)
            .cloned()
    }
}

#[async_trait]
impl LearnBackend for InMemoryBackend {
    async fn get_course(&self, course_id: Uuid) -> Result<Course, BackendError> {
        self.state()
            .courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("course {}", course_id)))
    }

    async fn get_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, BackendError> {
        Ok(self.stored_progress(user_id, lesson_id))
    }

    async fn update_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed: bool,
    ) -> Result<LessonProgress, BackendError> {
        self.delay().await;
        self.progress_writes.fetch_add(1, Ordering::SeqCst);

        if self.fail_progress_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 500,
                message: "progress store unavailable".to_string(),
            });
        }

        let update = LessonProgress {
            lesson_id,
            user_id,
            is_completed: completed,
            completed_at: completed.then(Utc::now),
        };

        let mut state = self.state();
        let merged = match state.progress.remove(&(user_id, lesson_id)) {
            Some(existing) => existing.merge(update),
            None => update,
        };
        state.progress.insert((user_id, lesson_id), merged.clone());
        Ok(merged)
    }

    async fn get_module_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<bool, BackendError> {
        Ok(self.is_module_recorded(user_id, module_id))
    }

    async fn mark_module_completed(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<(), BackendError> {
        self.module_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_module_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        self.state().modules.insert((user_id, module_id));
        Ok(())
    }

    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<RemoteCourseProgress, BackendError> {
        let state = self.state();
        let course = state
            .courses
            .get(&course_id)
            .ok_or_else(|| BackendError::NotFound(format!("course {}", course_id)))?;

        let total = course.lessons().count() as u32;
        let completed = course
            .lessons()
            .filter(|l| {
                state
                    .progress
                    .get(&(user_id, l.id))
                    .map(|p| p.is_completed)
                    .unwrap_or(false)
            })
            .count() as u32;
        let percentage = if total > 0 {
            (f64::from(completed) / f64::from(total) * 10000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(RemoteCourseProgress {
            completed,
            total,
            percentage,
        })
    }

    async fn submit_quiz(
        &self,
        _user_id: Uuid,
        lesson_id: Uuid,
        submission: &QuizSubmission,
    ) -> Result<RemoteQuizOutcome, BackendError> {
        self.quiz_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_quiz_attempts.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("assessments unreachable".to_string()));
        }

        let (preset, bank) = {
            let state = self.state();
            let bank = state
                .courses
                .values()
                .find_map(|c| c.locate_lesson(lesson_id))
                .map(|(_, lesson)| lesson.quiz.clone());
            (state.quiz_outcomes.get(&lesson_id).cloned(), bank)
        };

        if let Some(mut outcome) = preset {
            outcome.attempt_id.get_or_insert_with(Uuid::new_v4);
            return Ok(outcome);
        }

        let bank = bank.ok_or_else(|| BackendError::NotFound(format!("quiz for lesson {}", lesson_id)))?;
        let result = QuizGradingEngine::grade(lesson_id, &bank, submission).map_err(|e| {
            BackendError::Rejected {
                status: 400,
                message: e.to_string(),
            }
        })?;

        Ok(RemoteQuizOutcome {
            score: result.score,
            passed: result.passed,
            attempt_id: Some(Uuid::new_v4()),
        })
    }

    async fn get_module_surveys(
        &self,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<Vec<Survey>, BackendError> {
        let state = self.state();
        let module = state
            .courses
            .get(&course_id)
            .and_then(|c| c.module(module_id))
            .ok_or_else(|| BackendError::NotFound(format!("module {}", module_id)))?;
        Ok(module.survey.iter().cloned().collect())
    }

    async fn get_survey_responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponse>, BackendError> {
        Ok(self
            .state()
            .responses
            .get(&survey_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_survey_response(
        &self,
        user_id: Uuid,
        submission: &SurveySubmission,
    ) -> Result<(), BackendError> {
        if self.find_survey(submission.survey_id).is_none() {
            return Err(BackendError::NotFound(format!(
                "survey {}",
                submission.survey_id
            )));
        }

        self.state()
            .responses
            .entry(submission.survey_id)
            .or_default()
            .push(SurveyResponse {
                id: Uuid::new_v4(),
                survey_id: submission.survey_id,
                user_id,
                answers: submission.answers.clone(),
                submitted_at: Utc::now(),
            });
        Ok(())
    }

    async fn generate_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Certificate, BackendError> {
        let mut state = self.state();
        if let Some(existing) = state
            .certificates
            .values()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
        {
            return Ok(existing.clone());
        }

        self.certificates_generated.fetch_add(1, Ordering::SeqCst);
        let id = Uuid::new_v4();
        let number = format!(
            "CERT-{}",
            id.simple().to_string()[..12].to_uppercase()
        );
        let certificate = Certificate {
            id,
            course_id,
            user_id,
            verification_url: Some(format!("/certificates/verify/{}", number)),
            download_url: Some(format!("/certificates/download/{}", id)),
            certificate_number: number,
            issued_at: Utc::now(),
        };
        state.certificates.insert(id, certificate.clone());
        Ok(certificate)
    }

    async fn get_course_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Certificate>, BackendError> {
        Ok(self
            .state()
            .certificates
            .values()
            .filter(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn download_certificate(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> Result<Bytes, BackendError> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("storage unreachable".to_string()));
        }
        let state = self.state();
        let certificate = state
            .certificates
            .get(&certificate_id)
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| BackendError::NotFound(format!("certificate {}", certificate_id)))?;
        Ok(Bytes::from(format!(
            "%PDF-1.4\n% certificate {}\n",
            certificate.certificate_number
        )))
    }

    async fn verify_certificate(
        &self,
        certificate_number: &str,
    ) -> Result<Option<Certificate>, BackendError> {
        Ok(self
            .state()
            .certificates
            .values()
            .find(|c| c.certificate_number == certificate_number)
            .cloned())
    }
}
