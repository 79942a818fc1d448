use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::error::LearnError;
use super::types::{Module, Survey, SurveyAnswerValue, SurveyQuestionType, SurveySubmission};

pub const SCALE_MIN: i64 = 1;
pub const SCALE_MAX: i64 = 5;

pub struct SurveyGateChecker;

impl SurveyGateChecker {
    /// A module without a survey is always satisfied; otherwise the learner
    /// must have a response on record for it.
    pub fn is_satisfied(module: &Module, answered_surveys: &HashSet<Uuid>) -> bool {
        match &module.survey {
            None => true,
            Some(survey) => answered_surveys.contains(&survey.id),
        }
    }

    pub fn validate_submission(
        survey: &Survey,
        submission: &SurveySubmission,
    ) -> Result<(), LearnError> {
        if submission.survey_id != survey.id {
            return Err(LearnError::Validation(format!(
                "submission targets survey {} but module survey is {}",
                submission.survey_id, survey.id
            )));
        }
        if !survey.is_active {
            return Err(LearnError::Validation(format!(
                "survey {} is not accepting responses",
                survey.id
            )));
        }

        let questions: HashMap<Uuid, _> = survey.questions.iter().map(|q| (q.id, q)).collect();
        let mut answered = HashSet::new();

        for answer in &submission.answers {
            let question = questions.get(&answer.question_id).ok_or_else(|| {
                LearnError::Validation(format!("unknown question {}", answer.question_id))
            })?;

            let valid = match (question.question_type, &answer.value) {
                (SurveyQuestionType::Text, SurveyAnswerValue::Text(text)) => {
                    !text.trim().is_empty()
                }
                (SurveyQuestionType::Mcq, SurveyAnswerValue::Choice(choice)) => {
                    question.choices.iter().any(|c| c.id == *choice)
                }
                (SurveyQuestionType::Scale, SurveyAnswerValue::Scale(value)) => {
                    (SCALE_MIN..=SCALE_MAX).contains(value)
                }
                _ => false,
            };
            if !valid {
                return Err(LearnError::Validation(format!(
                    "invalid answer for question {}",
                    question.id
                )));
            }
            answered.insert(question.id);
        }

        let missing = survey
            .questions
            .iter()
            .filter(|q| q.is_required && !answered.contains(&q.id))
            .count();
        if missing > 0 {
            return Err(LearnError::Validation(format!(
                "please answer all required questions ({} remaining)",
                missing
            )));
        }

        Ok(())
    }
}
