//! The progression engine: ties the grader, tracker, evaluators and issuer
//! to one collaborator and one progress store.
//!
//! Every completion runs the same cascade: lesson → module → course. Each
//! stage takes a fresh snapshot of the store, so a completion that lands
//! concurrently is never evaluated against stale state.

use futures::future::try_join_all;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::backend::{BackendError, LearnBackend};
use super::certificate::CertificateIssuer;
use super::completion::{CourseCompletionEvaluator, ModuleCompletionEvaluator};
use super::error::LearnError;
use super::progress::{LessonProgressTracker, Transition};
use super::quiz::QuizGradingEngine;
use super::store::{ProgressEvent, ProgressStore};
use super::survey::SurveyGateChecker;
use super::types::{
    CascadeReport, Certificate, CertificateVerification, CompletionSignal, ContentType, Course,
    CourseProgress, InteractionOutcome, ModuleStatus, QuizAttemptOutcome, QuizResult,
    QuizSubmission, SurveySubmission,
};

/// The learner a call acts for, plus the lifetime of the caller's view.
/// Once `cancel` fires, in-flight writes still land but no cascade runs.
#[derive(Debug, Clone)]
pub struct LearnerContext {
    pub user_id: Uuid,
    pub cancel: CancellationToken,
}

impl LearnerContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_token(user_id: Uuid, cancel: CancellationToken) -> Self {
        Self { user_id, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Default)]
struct LearnCache {
    courses: HashMap<Uuid, Arc<Course>>,
}

pub struct LearnEngine {
    backend: Arc<dyn LearnBackend>,
    store: Arc<ProgressStore>,
    cache: Arc<RwLock<LearnCache>>,
    tracker: LessonProgressTracker,
    issuer: CertificateIssuer,
}

impl LearnEngine {
    pub fn new(backend: Arc<dyn LearnBackend>) -> Self {
        Self::with_store(backend, Arc::new(ProgressStore::default()))
    }

    pub fn with_store(backend: Arc<dyn LearnBackend>, store: Arc<ProgressStore>) -> Self {
        Self {
            tracker: LessonProgressTracker::new(Arc::clone(&backend), Arc::clone(&store)),
            issuer: CertificateIssuer::new(Arc::clone(&backend)),
            cache: Arc::new(RwLock::new(LearnCache::default())),
            backend,
            store,
        }
    }

    pub fn store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.store)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.store.subscribe()
    }

    // ----- Course structure -----

    pub async fn load_course(&self, course_id: Uuid) -> Result<Arc<Course>, LearnError> {
        if let Some(course) = self.cache.read().await.courses.get(&course_id) {
            return Ok(Arc::clone(course));
        }

        let mut course = self.backend.get_course(course_id).await.map_err(|e| match e {
            BackendError::NotFound(_) => LearnError::NotFound(format!("course {}", course_id)),
            other => LearnError::Backend(other),
        })?;
        course.normalize();
        debug!(
            "Loaded course {} ({} modules, {} lessons)",
            course.id,
            course.modules.len(),
            course.lessons().count()
        );

        let course = Arc::new(course);
        self.cache
            .write()
            .await
            .courses
            .insert(course_id, Arc::clone(&course));
        Ok(course)
    }

    pub async fn invalidate_course(&self, course_id: Uuid) {
        self.cache.write().await.courses.remove(&course_id);
    }

    // ----- Hydration -----

    /// Pulls the learner's recorded state for a course from the collaborator,
    /// merges it into the store (never reverting a completion) and re-runs
    /// module and course evaluation.
    pub async fn sync_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<CourseProgress, LearnError> {
        let course = self.load_course(course_id).await?;

        let lessons = try_join_all(
            course
                .lessons()
                .map(|lesson| self.backend.get_lesson_progress(user_id, lesson.id)),
        );
        let modules = try_join_all(course.modules.iter().map(|module| async move {
            self.backend
                .get_module_progress(user_id, module.id)
                .await
                .map(|done| (module.id, done))
        }));
        let surveys = try_join_all(
            course
                .modules
                .iter()
                .filter_map(|module| module.survey.as_ref())
                .map(|survey| async move {
                    self.backend
                        .get_survey_responses(survey.id)
                        .await
                        .map(|responses| (survey.id, responses))
                }),
        );
        let (lessons, modules, surveys) = tokio::try_join!(lessons, modules, surveys)?;

        for progress in lessons.into_iter().flatten() {
            if progress.user_id == user_id {
                self.store.merge_lesson(progress).await;
            }
        }
        for (survey_id, responses) in surveys {
            if responses.iter().any(|r| r.user_id == user_id) {
                self.store.mark_survey_answered(user_id, survey_id).await;
            }
        }
        for (module_id, done) in modules {
            if done {
                self.store.claim_module(user_id, module_id).await;
            }
        }

        let ctx = LearnerContext::new(user_id);
        for module in &course.modules {
            self.cascade(&ctx, &course, module.id).await?;
        }

        let progress = self.course_progress(user_id, course_id).await?;
        match self.backend.get_course_progress(user_id, course_id).await {
            Ok(remote) if remote.completed as usize != progress.lessons_completed => {
                warn!(
                    "Course {} progress mismatch for {}: collaborator reports {}/{}, engine derived {}/{}",
                    course_id,
                    user_id,
                    remote.completed,
                    remote.total,
                    progress.lessons_completed,
                    progress.lessons_total
                );
            }
            Ok(_) => {}
            Err(e) => debug!("Course progress summary unavailable: {}", e),
        }

        info!(
            "Synced progress for user {} in course {}: {}%",
            user_id, course_id, progress.percentage
        );
        Ok(progress)
    }

    // ----- Lessons -----

    pub async fn record_interaction(
        &self,
        ctx: &LearnerContext,
        course_id: Uuid,
        lesson_id: Uuid,
        signal: CompletionSignal,
    ) -> Result<InteractionOutcome, LearnError> {
        let course = self.load_course(course_id).await?;
        let (module, lesson) = course
            .locate_lesson(lesson_id)
            .ok_or_else(|| LearnError::NotFound(format!("lesson {} in course {}", lesson_id, course_id)))?;
        let module_id = module.id;

        let transition = self
            .tracker
            .record_interaction(ctx.user_id, lesson, &signal)
            .await?;

        match transition {
            Transition::Ignored => Ok(InteractionOutcome::Ignored),
            Transition::Coalesced => Ok(InteractionOutcome::Coalesced),
            Transition::AlreadyCompleted => {
                // Picks up a module record left pending by an earlier failure.
                if !ctx.is_cancelled() {
                    self.cascade(ctx, &course, module_id).await?;
                }
                Ok(InteractionOutcome::AlreadyCompleted)
            }
            Transition::Completed => {
                if ctx.is_cancelled() {
                    info!(
                        "Lesson {} completed after context teardown, skipping cascade",
                        lesson_id
                    );
                    return Ok(InteractionOutcome::Detached);
                }
                let cascade = self.cascade(ctx, &course, module_id).await?;
                Ok(InteractionOutcome::Completed { cascade })
            }
        }
    }

    pub async fn is_completed(&self, user_id: Uuid, lesson_id: Uuid) -> bool {
        self.tracker.is_completed(user_id, lesson_id).await
    }

    // ----- Quizzes -----

    pub async fn submit_quiz(
        &self,
        ctx: &LearnerContext,
        course_id: Uuid,
        lesson_id: Uuid,
        submission: &QuizSubmission,
    ) -> Result<QuizAttemptOutcome, LearnError> {
        let course = self.load_course(course_id).await?;
        let (_, lesson) = course
            .locate_lesson(lesson_id)
            .ok_or_else(|| LearnError::NotFound(format!("lesson {} in course {}", lesson_id, course_id)))?;
        if lesson.content_type != ContentType::Quiz {
            return Err(LearnError::Validation(format!(
                "lesson {} is a {} lesson, not a quiz",
                lesson_id, lesson.content_type
            )));
        }

        let (result, attempt_recorded) = if lesson.quiz.is_empty() {
            let remote = self
                .backend
                .submit_quiz(ctx.user_id, lesson_id, submission)
                .await?;
            (QuizResult::from_remote(lesson_id, remote), true)
        } else {
            let mut result = QuizGradingEngine::grade(lesson_id, &lesson.quiz, submission)?;
            let recorded = match self
                .backend
                .submit_quiz(ctx.user_id, lesson_id, submission)
                .await
            {
                Ok(remote) => {
                    result.attempt_id = remote.attempt_id;
                    true
                }
                Err(e) => {
                    warn!("Quiz attempt for lesson {} not recorded: {}", lesson_id, e);
                    false
                }
            };
            (result, recorded)
        };

        info!(
            "User {} scored {} on lesson {} (passed: {})",
            ctx.user_id, result.score, lesson_id, result.passed
        );

        let progress = match result.pass() {
            Some(pass) => {
                self.record_interaction(ctx, course_id, lesson_id, CompletionSignal::QuizPassed(pass))
                    .await?
            }
            None => InteractionOutcome::Ignored,
        };

        Ok(QuizAttemptOutcome {
            result,
            progress,
            attempt_recorded,
        })
    }

    // ----- Surveys -----

    pub async fn submit_survey_response(
        &self,
        ctx: &LearnerContext,
        course_id: Uuid,
        module_id: Uuid,
        submission: SurveySubmission,
    ) -> Result<CascadeReport, LearnError> {
        let course = self.load_course(course_id).await?;
        let module = course
            .module(module_id)
            .ok_or_else(|| LearnError::NotFound(format!("module {}", module_id)))?;
        let survey = module
            .survey
            .as_ref()
            .ok_or_else(|| LearnError::NotFound(format!("survey for module {}", module_id)))?;

        if self.store.is_survey_answered(ctx.user_id, survey.id).await {
            debug!("Survey {} already answered by {}", survey.id, ctx.user_id);
        } else {
            SurveyGateChecker::validate_submission(survey, &submission)?;
            self.backend
                .submit_survey_response(ctx.user_id, &submission)
                .await
                .map_err(|e| LearnError::PersistenceWriteFailed(e.to_string()))?;
            self.store.mark_survey_answered(ctx.user_id, survey.id).await;
            info!("User {} answered survey {}", ctx.user_id, survey.id);
        }

        if ctx.is_cancelled() {
            return Ok(CascadeReport::default());
        }
        self.cascade(ctx, &course, module_id).await
    }

    /// Re-reads the module survey's responses from the collaborator.
    pub async fn refresh_survey_state(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<bool, LearnError> {
        let course = self.load_course(course_id).await?;
        let module = course
            .module(module_id)
            .ok_or_else(|| LearnError::NotFound(format!("module {}", module_id)))?;
        let Some(survey) = &module.survey else {
            return Ok(true);
        };

        let responses = self.backend.get_survey_responses(survey.id).await?;
        if responses.iter().any(|r| r.user_id == user_id) {
            self.store.mark_survey_answered(user_id, survey.id).await;
        }
        Ok(self.store.is_survey_answered(user_id, survey.id).await)
    }

    pub async fn is_survey_satisfied(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<bool, LearnError> {
        let course = self.load_course(course_id).await?;
        let module = course
            .module(module_id)
            .ok_or_else(|| LearnError::NotFound(format!("module {}", module_id)))?;
        let snapshot = self.store.snapshot(user_id, &course).await;
        Ok(SurveyGateChecker::is_satisfied(
            module,
            &snapshot.answered_surveys,
        ))
    }

    // ----- Modules & courses -----

    pub async fn module_statuses(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<ModuleStatus>, LearnError> {
        let course = self.load_course(course_id).await?;
        let snapshot = self.store.snapshot(user_id, &course).await;
        Ok(CourseCompletionEvaluator::module_statuses(&course, &snapshot))
    }

    pub async fn module_status(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<ModuleStatus, LearnError> {
        self.module_statuses(user_id, course_id)
            .await?
            .into_iter()
            .find(|status| status.module_id == module_id)
            .ok_or_else(|| LearnError::NotFound(format!("module {}", module_id)))
    }

    pub async fn evaluate_course(&self, user_id: Uuid, course_id: Uuid) -> Result<bool, LearnError> {
        let course = self.load_course(course_id).await?;
        let snapshot = self.store.snapshot(user_id, &course).await;
        Ok(CourseCompletionEvaluator::is_completed(&course, &snapshot))
    }

    pub async fn course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<CourseProgress, LearnError> {
        let course = self.load_course(course_id).await?;
        let snapshot = self.store.snapshot(user_id, &course).await;
        Ok(CourseCompletionEvaluator::progress(&course, &snapshot))
    }

    // ----- Certificates -----

    pub async fn ensure_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Certificate, LearnError> {
        let course = self.load_course(course_id).await?;
        let mut snapshot = self.store.snapshot(user_id, &course).await;
        if !CourseCompletionEvaluator::is_completed(&course, &snapshot) {
            // Progress recorded by the collaborator before this process started.
            debug!(
                "Course {} not complete locally for {}, hydrating before gating",
                course_id, user_id
            );
            self.sync_progress(user_id, course_id).await?;
            snapshot = self.store.snapshot(user_id, &course).await;
        }
        self.issuer
            .ensure_certificate(user_id, &course, &snapshot)
            .await
    }

    pub async fn download_certificate(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> Result<bytes::Bytes, LearnError> {
        self.issuer.download(user_id, certificate_id).await
    }

    pub async fn verify_certificate(
        &self,
        certificate_number: &str,
    ) -> Result<CertificateVerification, LearnError> {
        self.issuer.verify(certificate_number).await
    }

    // ----- Cascade -----

    async fn cascade(
        &self,
        ctx: &LearnerContext,
        course: &Course,
        module_id: Uuid,
    ) -> Result<CascadeReport, LearnError> {
        let mut report = CascadeReport::default();
        let Some(module) = course.module(module_id) else {
            return Ok(report);
        };

        let snapshot = self.store.snapshot(ctx.user_id, course).await;
        if !snapshot.recorded_modules.contains(&module_id)
            && ModuleCompletionEvaluator::evaluate(module, &snapshot)
        {
            report.module_completed = self.record_module_completion(ctx.user_id, module_id).await?;
        }

        if ctx.is_cancelled() {
            return Ok(report);
        }

        let snapshot = self.store.snapshot(ctx.user_id, course).await;
        if !snapshot.course_completed
            && CourseCompletionEvaluator::evaluate(
                course,
                &ModuleCompletionEvaluator::snapshot(course, &snapshot),
            )
        {
            report.course_completed = self
                .store
                .mark_course_completed(ctx.user_id, course.id)
                .await;
            if report.course_completed {
                info!("Course {} completed by user {}", course.id, ctx.user_id);
            }
        }

        Ok(report)
    }

    async fn record_module_completion(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<bool, LearnError> {
        if !self.store.claim_module(user_id, module_id).await {
            return Ok(false);
        }

        match self.backend.mark_module_completed(user_id, module_id).await {
            Ok(()) => {
                info!("Module {} completed by user {}", module_id, user_id);
                self.store
                    .notify(ProgressEvent::ModuleCompleted { user_id, module_id });
                Ok(true)
            }
            Err(e) => {
                warn!("Recording module {} completion failed: {}", module_id, e);
                self.store.release_module(user_id, module_id).await;
                Err(LearnError::PersistenceWriteFailed(e.to_string()))
            }
        }
    }
}
