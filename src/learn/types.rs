//! Types for the Learn module (course progression)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use super::quiz::QuizPass;

// ============================================================================
// COURSE STRUCTURE
// ============================================================================

// ----- Lesson Models -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Video,
    Text,
    Pdf,
    Quiz,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "VIDEO"),
            Self::Text => write!(f, "TEXT"),
            Self::Pdf => write!(f, "PDF"),
            Self::Quiz => write!(f, "QUIZ"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content_type: ContentType,
    pub is_required: bool,
    pub order: u32,
    /// Question bank for QUIZ lessons. Empty when the collaborator does not
    /// expose correctness data, in which case grading is delegated.
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
}

// ----- Module Models -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub order: u32,
    pub lessons: Vec<Lesson>,
    pub survey: Option<Survey>,
}

impl Module {
    pub fn required_lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().filter(|lesson| lesson.is_required)
    }

    pub fn lesson(&self, lesson_id: Uuid) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id == lesson_id)
    }
}

// ----- Course Models -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub modules: Vec<Module>,
}

impl Course {
    pub fn module(&self, module_id: Uuid) -> Option<&Module> {
        self.modules.iter().find(|module| module.id == module_id)
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|module| module.lessons.iter())
    }

    pub fn locate_lesson(&self, lesson_id: Uuid) -> Option<(&Module, &Lesson)> {
        self.modules
            .iter()
            .find_map(|module| module.lesson(lesson_id).map(|lesson| (module, lesson)))
    }

    /// Sorts modules and their lessons by their declared order.
    pub fn normalize(&mut self) {
        self.modules.sort_by_key(|module| module.order);
        for module in &mut self.modules {
            module.lessons.sort_by_key(|lesson| lesson.order);
        }
    }
}

// ============================================================================
// SURVEYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyQuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "SCALE")]
    Scale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyChoice {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: Uuid,
    pub text: String,
    pub question_type: SurveyQuestionType,
    pub is_required: bool,
    pub order: u32,
    #[serde(default)]
    pub choices: Vec<SurveyChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurveyAnswerValue {
    Scale(i64),
    Choice(Uuid),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub question_id: Uuid,
    pub value: SurveyAnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub survey_id: Uuid,
    pub answers: Vec<SurveyAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub answers: Vec<SurveyAnswer>,
    pub submitted_at: DateTime<Utc>,
}

// ============================================================================
// QUIZZES
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "TF")]
    TrueFalse,
    #[serde(rename = "SA")]
    ShortAnswer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Choices(Vec<Uuid>),
    Choice(Uuid),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub answers: HashMap<Uuid, SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question_id: Uuid,
    pub is_correct: bool,
    pub points_earned: u32,
    pub points_possible: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub lesson_id: Uuid,
    pub score: f64,
    pub passed: bool,
    pub points_earned: u32,
    pub points_possible: u32,
    pub answers_breakdown: Vec<AnswerResult>,
    pub attempt_id: Option<Uuid>,
}

/// Grade reported by the collaborator for lessons without a local question bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteQuizOutcome {
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub attempt_id: Option<Uuid>,
}

// ============================================================================
// PROGRESS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub lesson_id: Uuid,
    pub user_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    pub fn not_started(user_id: Uuid, lesson_id: Uuid) -> Self {
        Self {
            lesson_id,
            user_id,
            is_completed: false,
            completed_at: None,
        }
    }

    /// Combines two observations of the same record without ever reverting a
    /// completion.
    pub fn merge(self, newer: LessonProgress) -> LessonProgress {
        if self.is_completed {
            return LessonProgress {
                completed_at: self.completed_at.or(newer.completed_at),
                ..self
            };
        }
        if newer.is_completed {
            return LessonProgress {
                completed_at: newer.completed_at.or_else(|| Some(Utc::now())),
                ..newer
            };
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseState {
    NotStarted,
    InProgress,
    Completed,
}

impl From<&str> for CourseState {
    fn from(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::NotStarted,
        }
    }
}

impl std::fmt::Display for CourseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProgress {
    pub course_id: Uuid,
    pub completed_modules: BTreeSet<Uuid>,
    pub lessons_completed: usize,
    pub lessons_total: usize,
    pub percentage: f64,
    pub is_course_completed: bool,
    pub state: CourseState,
    pub resume_module: Option<Uuid>,
}

/// Course summary as reported by the collaborator. Informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCourseProgress {
    pub completed: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub module_id: Uuid,
    pub is_completed: bool,
    pub survey_satisfied: bool,
    pub unlocked: bool,
}

// ============================================================================
// CERTIFICATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
    pub verification_url: Option<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateVerification {
    pub is_valid: bool,
    pub certificate: Option<Certificate>,
    pub message: String,
}

// ============================================================================
// SIGNALS & OUTCOMES
// ============================================================================

/// Passive learner interactions that arrive from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSignal {
    Viewed,
    VideoEnded,
    PdfOpened,
    TextScrolledIntoView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Viewed,
    VideoEnded,
    PdfOpened,
    TextScrolledIntoView,
    QuizPassed,
}

#[derive(Debug, Clone)]
pub enum CompletionSignal {
    Viewed,
    VideoEnded,
    PdfOpened,
    TextScrolledIntoView,
    QuizPassed(QuizPass),
}

impl CompletionSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Viewed => SignalKind::Viewed,
            Self::VideoEnded => SignalKind::VideoEnded,
            Self::PdfOpened => SignalKind::PdfOpened,
            Self::TextScrolledIntoView => SignalKind::TextScrolledIntoView,
            Self::QuizPassed(_) => SignalKind::QuizPassed,
        }
    }
}

impl From<InteractionSignal> for CompletionSignal {
    fn from(signal: InteractionSignal) -> Self {
        match signal {
            InteractionSignal::Viewed => Self::Viewed,
            InteractionSignal::VideoEnded => Self::VideoEnded,
            InteractionSignal::PdfOpened => Self::PdfOpened,
            InteractionSignal::TextScrolledIntoView => Self::TextScrolledIntoView,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CascadeReport {
    pub module_completed: bool,
    pub course_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// The signal cannot complete this kind of lesson.
    Ignored,
    AlreadyCompleted,
    /// Another write for the same learner and lesson is in flight.
    Coalesced,
    Completed { cascade: CascadeReport },
    /// The write landed after the caller's context was torn down; no cascade ran.
    Detached,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizAttemptOutcome {
    pub result: QuizResult,
    pub progress: InteractionOutcome,
    /// False when the grade was computed locally but the collaborator did
    /// not accept the attempt record.
    pub attempt_recorded: bool,
}
