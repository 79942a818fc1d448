//! Collaborator contract for the LMS services the progression engine reads
//! from and writes to. Implementations own storage; the engine only derives.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::types::{
    Certificate, Course, LessonProgress, QuizSubmission, RemoteCourseProgress, RemoteQuizOutcome,
    Survey, SurveyResponse, SurveySubmission,
};

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait LearnBackend: Send + Sync {
    /// Course with its ordered modules, lessons (and quiz banks) and module survey.
    async fn get_course(&self, course_id: Uuid) -> Result<Course, BackendError>;

    async fn get_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, BackendError>;

    /// Must be safely repeatable.
    async fn update_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed: bool,
    ) -> Result<LessonProgress, BackendError>;

    async fn get_module_progress(&self, user_id: Uuid, module_id: Uuid)
        -> Result<bool, BackendError>;

    async fn mark_module_completed(&self, user_id: Uuid, module_id: Uuid)
        -> Result<(), BackendError>;

    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<RemoteCourseProgress, BackendError>;

    async fn submit_quiz(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        submission: &QuizSubmission,
    ) -> Result<RemoteQuizOutcome, BackendError>;

    async fn get_module_surveys(
        &self,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<Vec<Survey>, BackendError>;

    async fn get_survey_responses(&self, survey_id: Uuid)
        -> Result<Vec<SurveyResponse>, BackendError>;

    async fn submit_survey_response(
        &self,
        user_id: Uuid,
        submission: &SurveySubmission,
    ) -> Result<(), BackendError>;

    async fn generate_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Certificate, BackendError>;

    async fn get_course_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Certificate>, BackendError>;

    async fn download_certificate(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> Result<Bytes, BackendError>;

    async fn verify_certificate(
        &self,
        certificate_number: &str,
    ) -> Result<Option<Certificate>, BackendError>;
}
