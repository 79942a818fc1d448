//! Module and course completion. Both evaluators are pure functions over a
//! [`ProgressSnapshot`]; recording side effects is the engine's job.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use super::store::ProgressSnapshot;
use super::survey::SurveyGateChecker;
use super::types::{Course, CourseProgress, CourseState, Module, ModuleStatus};

pub type ModuleCompletionSnapshot = HashMap<Uuid, bool>;

pub struct ModuleCompletionEvaluator;

impl ModuleCompletionEvaluator {
    /// All required lessons completed and, when the module carries a survey,
    /// a response on record. Modules without required lessons only depend on
    /// the survey criterion.
    pub fn evaluate(module: &Module, snapshot: &ProgressSnapshot) -> bool {
        module
            .required_lessons()
            .all(|lesson| snapshot.completed_lessons.contains(&lesson.id))
            && SurveyGateChecker::is_satisfied(module, &snapshot.answered_surveys)
    }

    pub fn snapshot(course: &Course, snapshot: &ProgressSnapshot) -> ModuleCompletionSnapshot {
        course
            .modules
            .iter()
            .map(|module| (module.id, Self::evaluate(module, snapshot)))
            .collect()
    }
}

pub struct CourseCompletionEvaluator;

impl CourseCompletionEvaluator {
    /// True iff every module is complete. A course without modules is never
    /// complete.
    pub fn evaluate(course: &Course, modules: &ModuleCompletionSnapshot) -> bool {
        !course.modules.is_empty()
            && course
                .modules
                .iter()
                .all(|module| modules.get(&module.id).copied().unwrap_or(false))
    }

    /// Completion as seen by certificate gating: a course recorded as
    /// completed stays completed.
    pub fn is_completed(course: &Course, snapshot: &ProgressSnapshot) -> bool {
        snapshot.course_completed
            || Self::evaluate(course, &ModuleCompletionEvaluator::snapshot(course, snapshot))
    }

    pub fn state(course: &Course, snapshot: &ProgressSnapshot) -> CourseState {
        if Self::is_completed(course, snapshot) {
            CourseState::Completed
        } else if snapshot.started {
            CourseState::InProgress
        } else {
            CourseState::NotStarted
        }
    }

    /// First module, in course order, that is not yet complete.
    pub fn resume_module<'a>(
        course: &'a Course,
        modules: &ModuleCompletionSnapshot,
    ) -> Option<&'a Module> {
        course
            .modules
            .iter()
            .find(|module| !modules.get(&module.id).copied().unwrap_or(false))
    }

    /// The first module is always open; later ones open once their
    /// predecessor is complete.
    pub fn is_unlocked(course: &Course, module_id: Uuid, modules: &ModuleCompletionSnapshot) -> bool {
        match course.modules.iter().position(|m| m.id == module_id) {
            Some(0) => true,
            Some(index) => modules
                .get(&course.modules[index - 1].id)
                .copied()
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn module_statuses(course: &Course, snapshot: &ProgressSnapshot) -> Vec<ModuleStatus> {
        let modules = ModuleCompletionEvaluator::snapshot(course, snapshot);
        course
            .modules
            .iter()
            .map(|module| ModuleStatus {
                module_id: module.id,
                is_completed: modules.get(&module.id).copied().unwrap_or(false),
                survey_satisfied: SurveyGateChecker::is_satisfied(
                    module,
                    &snapshot.answered_surveys,
                ),
                unlocked: Self::is_unlocked(course, module.id, &modules),
            })
            .collect()
    }

    pub fn progress(course: &Course, snapshot: &ProgressSnapshot) -> CourseProgress {
        let modules = ModuleCompletionEvaluator::snapshot(course, snapshot);
        let completed_modules: BTreeSet<Uuid> = modules
            .iter()
            .filter(|(_, done)| **done)
            .map(|(id, _)| *id)
            .collect();

        let lessons_total = course.lessons().count();
        let lessons_completed = course
            .lessons()
            .filter(|lesson| snapshot.completed_lessons.contains(&lesson.id))
            .count();
        let percentage = if lessons_total > 0 {
            (lessons_completed as f64 / lessons_total as f64 * 10000.0).round() / 100.0
        } else {
            0.0
        };

        CourseProgress {
            course_id: course.id,
            completed_modules,
            lessons_completed,
            lessons_total,
            percentage,
            is_course_completed: Self::is_completed(course, snapshot),
            state: Self::state(course, snapshot),
            resume_module: Self::resume_module(course, &modules).map(|m| m.id),
        }
    }
}
