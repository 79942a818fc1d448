//! REST implementation of [`LearnBackend`] against the LMS API.
//!
//! The API returns foreign keys either as bare ids or as nested objects, and
//! lists either plain or wrapped (`results` for paginated views, `data` for
//! survey responses). The wire types below absorb those variations so the
//! rest of the crate only sees the domain types.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, trace};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::backend::{BackendError, LearnBackend};
use super::types::{
    Certificate, ContentType, Course, Lesson, LessonProgress, Module, QuestionType, QuizOption,
    QuizQuestion, QuizSubmission, RemoteCourseProgress, RemoteQuizOutcome, Survey, SurveyAnswer,
    SurveyAnswerValue, SurveyChoice, SurveyQuestion, SurveyQuestionType, SurveyResponse,
    SurveySubmission,
};

pub const USER_HEADER: &str = "X-User-Id";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Page { results: Vec<T> },
    Data { data: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results } => results,
            Self::Data { data } => data,
            Self::Plain(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ref {
    Id(Uuid),
    Object { id: Uuid },
}

impl Ref {
    fn id(&self) -> Uuid {
        match self {
            Self::Id(id) | Self::Object { id } => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CourseWire {
    id: Uuid,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ModuleWire {
    id: Uuid,
    title: String,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct LessonWire {
    id: Uuid,
    title: String,
    content_type: ContentType,
    #[serde(default)]
    order: u32,
    #[serde(default = "default_true")]
    is_required: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct QuizWire {
    #[serde(default)]
    questions: Vec<QuestionWire>,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    id: Uuid,
    question_text: String,
    question_type: QuestionType,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    answers: Vec<AnswerWire>,
}

fn default_points() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct AnswerWire {
    id: Uuid,
    answer_text: String,
    #[serde(default)]
    is_correct: bool,
}

#[derive(Debug, Deserialize)]
struct ProgressWire {
    lesson: Ref,
    #[serde(default)]
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ModuleProgressWire {
    #[serde(default)]
    is_completed: bool,
}

#[derive(Debug, Serialize)]
struct ProgressUpdate {
    is_completed: bool,
}

/// The assessments API reads the answer map from `answers.answers`.
#[derive(Debug, Serialize)]
struct QuizSubmissionWire<'a> {
    answers: &'a QuizSubmission,
}

#[derive(Debug, Serialize)]
struct ModuleCompletionRequest {
    module_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SurveyWire {
    id: Uuid,
    module: Ref,
    title: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    questions: Vec<SurveyQuestionWire>,
}

#[derive(Debug, Deserialize)]
struct SurveyQuestionWire {
    id: Uuid,
    question_text: String,
    question_type: SurveyQuestionType,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    order: u32,
    #[serde(default)]
    choices: Vec<SurveyChoiceWire>,
}

#[derive(Debug, Deserialize)]
struct SurveyChoiceWire {
    id: Uuid,
    choice_text: String,
}

#[derive(Debug, Deserialize)]
struct SurveyResponseWire {
    id: Uuid,
    survey: Ref,
    user: Ref,
    submitted_at: DateTime<Utc>,
    #[serde(default)]
    answers: Vec<SurveyAnswerWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SurveyAnswerWire {
    question: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    choice_answer: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale_answer: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SurveySubmissionWire {
    survey_id: Uuid,
    answers: Vec<SurveyAnswerWire>,
}

#[derive(Debug, Deserialize)]
struct CertificateWire {
    id: Uuid,
    user: Ref,
    course: Ref,
    issued_date: DateTime<Utc>,
    certificate_number: String,
    #[serde(default)]
    pdf_file: Option<String>,
    #[serde(default)]
    verification_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerificationWire {
    valid: bool,
    certificate: Option<CertificateWire>,
}

impl From<QuestionWire> for QuizQuestion {
    fn from(q: QuestionWire) -> Self {
        Self {
            id: q.id,
            text: q.question_text,
            question_type: q.question_type,
            points: q.points,
            options: q
                .answers
                .into_iter()
                .map(|a| QuizOption {
                    id: a.id,
                    text: a.answer_text,
                    is_correct: a.is_correct,
                })
                .collect(),
        }
    }
}

impl From<SurveyWire> for Survey {
    fn from(s: SurveyWire) -> Self {
        let mut questions: Vec<SurveyQuestion> = s
            .questions
            .into_iter()
            .map(SurveyQuestion::from)
            .collect();
        questions.sort_by_key(|q| q.order);
        Self {
            id: s.id,
            module_id: s.module.id(),
            title: s.title,
            is_active: s.is_active,
            questions,
        }
    }
}

impl From<SurveyQuestionWire> for SurveyQuestion {
    fn from(q: SurveyQuestionWire) -> Self {
        Self {
            id: q.id,
            text: q.question_text,
            question_type: q.question_type,
            is_required: q.is_required,
            order: q.order,
            choices: q
                .choices
                .into_iter()
                .map(|c| SurveyChoice {
                    id: c.id,
                    text: c.choice_text,
                })
                .collect(),
        }
    }
}

impl SurveyAnswerWire {
    /// None when the answer carries no value at all.
    fn into_answer(self) -> Option<SurveyAnswer> {
        let value = if let Some(scale) = self.scale_answer {
            SurveyAnswerValue::Scale(scale)
        } else if let Some(choice) = self.choice_answer {
            SurveyAnswerValue::Choice(choice)
        } else {
            SurveyAnswerValue::Text(self.text_answer?)
        };
        Some(SurveyAnswer {
            question_id: self.question,
            value,
        })
    }
}

impl From<&SurveyAnswer> for SurveyAnswerWire {
    fn from(answer: &SurveyAnswer) -> Self {
        let mut wire = SurveyAnswerWire {
            question: answer.question_id,
            text_answer: None,
            choice_answer: None,
            scale_answer: None,
        };
        match &answer.value {
            SurveyAnswerValue::Scale(v) => wire.scale_answer = Some(*v),
            SurveyAnswerValue::Choice(id) => wire.choice_answer = Some(*id),
            SurveyAnswerValue::Text(text) => wire.text_answer = Some(text.clone()),
        }
        wire
    }
}

impl From<CertificateWire> for Certificate {
    fn from(c: CertificateWire) -> Self {
        Self {
            id: c.id,
            course_id: c.course.id(),
            user_id: c.user.id(),
            certificate_number: c.certificate_number,
            issued_at: c.issued_date,
            verification_url: c.verification_url.filter(|url| !url.is_empty()),
            download_url: c.pdf_file,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Clone)]
pub struct HttpLearnClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpLearnClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str, user_id: Option<Uuid>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        trace!("{} {}", method, url);
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(user_id) = user_id {
            builder = builder.header(USER_HEADER, user_id.to_string());
        }
        builder
    }

    async fn check(path: &str, response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        user_id: Option<Uuid>,
    ) -> Result<T, BackendError> {
        let response = self.request(Method::GET, path, user_id).send().await?;
        Ok(Self::check(path, response).await?.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        user_id: Option<Uuid>,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .request(method, path, user_id)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(path, response).await?.json().await?)
    }

    async fn lessons(&self, course_id: Uuid, module_id: Uuid) -> Result<Vec<Lesson>, BackendError> {
        let path = format!("/courses/{}/modules/{}/lessons/", course_id, module_id);
        let lessons: Listing<LessonWire> = self.get_json(&path, None).await?;

        try_join_all(lessons.into_vec().into_iter().map(|l| async move {
            let quiz = if l.content_type == ContentType::Quiz {
                self.quiz_bank(l.id).await?
            } else {
                Vec::new()
            };
            Ok::<_, BackendError>(Lesson {
                id: l.id,
                module_id,
                title: l.title,
                content_type: l.content_type,
                is_required: l.is_required,
                order: l.order,
                quiz,
            })
        }))
        .await
    }

    /// Question bank for local grading. Empty when the API hides correctness,
    /// in which case grading falls back to the collaborator.
    async fn quiz_bank(&self, lesson_id: Uuid) -> Result<Vec<QuizQuestion>, BackendError> {
        let path = format!("/assessments/lessons/{}/quiz/", lesson_id);
        let quiz: QuizWire = match self.get_json(&path, None).await {
            Ok(quiz) => quiz,
            Err(BackendError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let questions: Vec<QuizQuestion> =
            quiz.questions.into_iter().map(QuizQuestion::from).collect();
        let exposes_answers = questions
            .iter()
            .any(|q| q.options.iter().any(|o| o.is_correct));
        if !exposes_answers {
            debug!("Quiz for lesson {} has no answer key, grading remotely", lesson_id);
            return Ok(Vec::new());
        }
        Ok(questions)
    }

    async fn complete_survey(&self, survey: SurveyWire) -> Result<Survey, BackendError> {
        let mut survey = Survey::from(survey);
        if survey.questions.is_empty() {
            let path = format!("/assessments/surveys/{}/questions/", survey.id);
            let questions: Listing<SurveyQuestionWire> = self.get_json(&path, None).await?;
            survey.questions = questions
                .into_vec()
                .into_iter()
                .map(SurveyQuestion::from)
                .collect();
            survey.questions.sort_by_key(|q| q.order);
        }
        Ok(survey)
    }

    async fn module(&self, course_id: Uuid, wire: ModuleWire) -> Result<Module, BackendError> {
        let (lessons, surveys) = tokio::try_join!(
            self.lessons(course_id, wire.id),
            self.get_module_surveys(course_id, wire.id)
        )?;
        Ok(Module {
            id: wire.id,
            course_id,
            title: wire.title,
            order: wire.order,
            lessons,
            survey: surveys.into_iter().next(),
        })
    }
}

#[async_trait]
impl LearnBackend for HttpLearnClient {
    async fn get_course(&self, course_id: Uuid) -> Result<Course, BackendError> {
        let course: CourseWire = self
            .get_json(&format!("/courses/{}/", course_id), None)
            .await?;
        let modules: Listing<ModuleWire> = self
            .get_json(&format!("/courses/{}/modules/", course_id), None)
            .await?;

        let modules = try_join_all(
            modules
                .into_vec()
                .into_iter()
                .map(|wire| self.module(course_id, wire)),
        )
        .await?;

        Ok(Course {
            id: course.id,
            title: course.title,
            modules,
        })
    }

    async fn get_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, BackendError> {
        let path = format!("/courses/user/progress/lesson/{}/", lesson_id);
        match self.get_json::<ProgressWire>(&path, Some(user_id)).await {
            Ok(wire) => Ok(Some(LessonProgress {
                lesson_id: wire.lesson.id(),
                user_id,
                is_completed: wire.is_completed,
                completed_at: wire.completed_at,
            })),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        completed: bool,
    ) -> Result<LessonProgress, BackendError> {
        let path = format!("/courses/user/progress/lesson/{}/", lesson_id);
        let wire: ProgressWire = self
            .send_json(
                Method::PUT,
                &path,
                Some(user_id),
                &ProgressUpdate {
                    is_completed: completed,
                },
            )
            .await?;
        Ok(LessonProgress {
            lesson_id: wire.lesson.id(),
            user_id,
            is_completed: wire.is_completed,
            completed_at: wire.completed_at,
        })
    }

    async fn get_module_progress(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<bool, BackendError> {
        let path = format!(
            "/courses/module-progress/get_progress/?module_id={}",
            module_id
        );
        match self.get_json::<ModuleProgressWire>(&path, Some(user_id)).await {
            Ok(wire) => Ok(wire.is_completed),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn mark_module_completed(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<(), BackendError> {
        let path = "/courses/module-progress/mark-completed/";
        let response = self
            .request(Method::POST, path, Some(user_id))
            .json(&ModuleCompletionRequest { module_id })
            .send()
            .await?;
        Self::check(path, response).await?;
        Ok(())
    }

    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<RemoteCourseProgress, BackendError> {
        self.get_json(
            &format!("/courses/user/progress/course/{}/", course_id),
            Some(user_id),
        )
        .await
    }

    async fn submit_quiz(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        submission: &QuizSubmission,
    ) -> Result<RemoteQuizOutcome, BackendError> {
        self.send_json(
            Method::POST,
            &format!("/assessments/lessons/{}/quiz/", lesson_id),
            Some(user_id),
            &QuizSubmissionWire {
                answers: submission,
            },
        )
        .await
    }

    async fn get_module_surveys(
        &self,
        course_id: Uuid,
        module_id: Uuid,
    ) -> Result<Vec<Survey>, BackendError> {
        let path = format!("/assessments/{}/modules/{}/survey/", course_id, module_id);
        let surveys: Listing<SurveyWire> = match self.get_json(&path, None).await {
            Ok(surveys) => surveys,
            Err(BackendError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        try_join_all(
            surveys
                .into_vec()
                .into_iter()
                .map(|survey| self.complete_survey(survey)),
        )
        .await
    }

    async fn get_survey_responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponse>, BackendError> {
        let path = format!("/assessments/surveys/{}/responses/", survey_id);
        let responses: Listing<SurveyResponseWire> = self.get_json(&path, None).await?;
        Ok(responses
            .into_vec()
            .into_iter()
            .map(|r| SurveyResponse {
                id: r.id,
                survey_id: r.survey.id(),
                user_id: r.user.id(),
                answers: r
                    .answers
                    .into_iter()
                    .filter_map(SurveyAnswerWire::into_answer)
                    .collect(),
                submitted_at: r.submitted_at,
            })
            .collect())
    }

    async fn submit_survey_response(
        &self,
        user_id: Uuid,
        submission: &SurveySubmission,
    ) -> Result<(), BackendError> {
        let path = "/assessments/survey-responses/";
        let body = SurveySubmissionWire {
            survey_id: submission.survey_id,
            answers: submission.answers.iter().map(SurveyAnswerWire::from).collect(),
        };
        let response = self
            .request(Method::POST, path, Some(user_id))
            .json(&body)
            .send()
            .await?;
        Self::check(path, response).await?;
        Ok(())
    }

    async fn generate_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Certificate, BackendError> {
        let path = format!("/certificates/generate/{}/", course_id);
        let response = self
            .request(Method::POST, &path, Some(user_id))
            .send()
            .await?;
        let wire: CertificateWire = Self::check(&path, response).await?.json().await?;
        Ok(wire.into())
    }

    async fn get_course_certificate(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Certificate>, BackendError> {
        let path = format!("/certificates/user/?course_id={}", course_id);
        let certificates: Listing<CertificateWire> = self.get_json(&path, Some(user_id)).await?;
        Ok(certificates
            .into_vec()
            .into_iter()
            .map(Certificate::from)
            .collect())
    }

    async fn download_certificate(
        &self,
        user_id: Uuid,
        certificate_id: Uuid,
    ) -> Result<Bytes, BackendError> {
        let path = format!("/certificates/download/{}/", certificate_id);
        let response = self
            .request(Method::GET, &path, Some(user_id))
            .send()
            .await?;
        Ok(Self::check(&path, response).await?.bytes().await?)
    }

    async fn verify_certificate(
        &self,
        certificate_number: &str,
    ) -> Result<Option<Certificate>, BackendError> {
        let path = format!("/certificates/verify/{}/", certificate_number);
        match self.get_json::<VerificationWire>(&path, None).await {
            Ok(wire) if wire.valid => Ok(wire.certificate.map(Certificate::from)),
            Ok(_) | Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
