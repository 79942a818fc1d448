//! Quiz grading. Pure: it never touches lesson state, it only produces a
//! result (and, when passing, a [`QuizPass`] the progress tracker accepts).

use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use super::error::LearnError;
use super::types::{
    AnswerResult, QuestionType, QuizQuestion, QuizResult, QuizSubmission, RemoteQuizOutcome,
    SubmittedAnswer,
};

/// Fixed pass threshold, in percent.
pub const PASS_THRESHOLD: f64 = 70.0;

/// Proof that a quiz lesson was passed. Only constructible from a passing
/// [`QuizResult`], so passive signals can never complete a quiz lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizPass {
    lesson_id: Uuid,
    score: f64,
}

impl QuizPass {
    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

impl QuizResult {
    pub fn pass(&self) -> Option<QuizPass> {
        self.passed.then(|| QuizPass {
            lesson_id: self.lesson_id,
            score: self.score,
        })
    }

    /// Adopts a grade computed by the collaborator; `passed` is re-derived
    /// against the local threshold.
    pub fn from_remote(lesson_id: Uuid, outcome: RemoteQuizOutcome) -> Self {
        let score = round_one_decimal(outcome.score);
        if outcome.passed != (score >= PASS_THRESHOLD) {
            log::warn!(
                "Remote grade for lesson {} reported passed={} at score {}; using threshold {}",
                lesson_id,
                outcome.passed,
                score,
                PASS_THRESHOLD
            );
        }
        Self {
            lesson_id,
            score,
            passed: score >= PASS_THRESHOLD,
            points_earned: 0,
            points_possible: 0,
            answers_breakdown: Vec::new(),
            attempt_id: outcome.attempt_id,
        }
    }
}

pub struct QuizGradingEngine;

impl QuizGradingEngine {
    pub fn grade(
        lesson_id: Uuid,
        questions: &[QuizQuestion],
        submission: &QuizSubmission,
    ) -> Result<QuizResult, LearnError> {
        let points_possible = questions
            .iter()
            .try_fold(0u32, |total, q| total.checked_add(q.points))
            .ok_or_else(|| {
                LearnError::InvalidQuiz(format!("lesson {} point total overflows", lesson_id))
            })?;
        if points_possible == 0 {
            return Err(LearnError::InvalidQuiz(format!(
                "lesson {} has no points to earn",
                lesson_id
            )));
        }

        let mut points_earned: u32 = 0;
        let mut answers_breakdown = Vec::with_capacity(questions.len());

        for question in questions {
            let is_correct = submission
                .answers
                .get(&question.id)
                .map(|answer| is_correct(question, answer))
                .unwrap_or(false);
            let earned = if is_correct { question.points } else { 0 };
            points_earned += earned;

            answers_breakdown.push(AnswerResult {
                question_id: question.id,
                is_correct,
                points_earned: earned,
                points_possible: question.points,
            });
        }

        let score = round_one_decimal(f64::from(points_earned) / f64::from(points_possible) * 100.0);

        Ok(QuizResult {
            lesson_id,
            score,
            passed: score >= PASS_THRESHOLD,
            points_earned,
            points_possible,
            answers_breakdown,
            attempt_id: None,
        })
    }
}

fn is_correct(question: &QuizQuestion, answer: &SubmittedAnswer) -> bool {
    let correct: HashSet<Uuid> = question
        .options
        .iter()
        .filter(|o| o.is_correct)
        .map(|o| o.id)
        .collect();

    match (question.question_type, answer) {
        (QuestionType::ShortAnswer, SubmittedAnswer::Text(text)) => {
            let given = text.trim().to_lowercase();
            !given.is_empty()
                && question
                    .options
                    .iter()
                    .filter(|o| o.is_correct)
                    .any(|o| o.text.trim().to_lowercase() == given)
        }
        (QuestionType::ShortAnswer, _) => false,
        // A single pick is right when that option is marked correct.
        (_, SubmittedAnswer::Choice(id)) => correct.contains(id),
        (QuestionType::MultipleChoice, SubmittedAnswer::Choices(ids)) => {
            let selected: HashSet<Uuid> = ids.iter().copied().collect();
            !correct.is_empty() && selected == correct
        }
        (QuestionType::TrueFalse, SubmittedAnswer::Choices(ids)) => {
            ids.len() == 1 && correct.len() == 1 && correct.contains(&ids[0])
        }
        (_, SubmittedAnswer::Text(_)) => false,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
