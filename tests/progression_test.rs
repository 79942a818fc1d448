#[cfg(test)]
mod progression_integration_tests {
    use learnserver::learn::{
        ContentType, Course, CourseState, InMemoryBackend, InteractionOutcome, LearnEngine,
        LearnError, LearnerContext, Lesson, LessonProgress, Module, ProgressEvent, QuestionType,
        QuizOption, QuizQuestion, QuizSubmission, RemoteQuizOutcome, SubmittedAnswer, Survey,
        SurveyAnswer, SurveyAnswerValue, SurveyQuestion, SurveyQuestionType, SurveySubmission,
    };
    use learnserver::learn::types::{CascadeReport, CompletionSignal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn lesson(module_id: Uuid, content_type: ContentType, is_required: bool, order: u32) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            module_id,
            title: format!("{} lesson {}", content_type, order),
            content_type,
            is_required,
            order,
            quiz: Vec::new(),
        }
    }

    fn module(course_id: Uuid, order: u32, kinds: &[ContentType]) -> Module {
        let id = Uuid::new_v4();
        Module {
            id,
            course_id,
            title: format!("Module {}", order),
            order,
            lessons: kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| lesson(id, *kind, true, i as u32))
                .collect(),
            survey: None,
        }
    }

    fn course(modules: &[&[ContentType]]) -> Course {
        let id = Uuid::new_v4();
        Course {
            id,
            title: "Introduction to Innovation".to_string(),
            modules: modules
                .iter()
                .enumerate()
                .map(|(i, kinds)| module(id, i as u32, kinds))
                .collect(),
        }
    }

    fn survey(module_id: Uuid) -> Survey {
        Survey {
            id: Uuid::new_v4(),
            module_id,
            title: "Module feedback".to_string(),
            is_active: true,
            questions: vec![SurveyQuestion {
                id: Uuid::new_v4(),
                text: "How useful was this module?".to_string(),
                question_type: SurveyQuestionType::Scale,
                is_required: true,
                order: 1,
                choices: Vec::new(),
            }],
        }
    }

    /// Five single-answer questions worth one point each.
    fn quiz_bank() -> Vec<(QuizQuestion, Uuid, Uuid)> {
        (0..5)
            .map(|i| {
                let right = Uuid::new_v4();
                let wrong = Uuid::new_v4();
                let question = QuizQuestion {
                    id: Uuid::new_v4(),
                    text: format!("Question {}", i),
                    question_type: QuestionType::MultipleChoice,
                    points: 1,
                    options: vec![
                        QuizOption {
                            id: right,
                            text: "right".to_string(),
                            is_correct: true,
                        },
                        QuizOption {
                            id: wrong,
                            text: "wrong".to_string(),
                            is_correct: false,
                        },
                    ],
                };
                (question, right, wrong)
            })
            .collect()
    }

    fn answers(bank: &[(QuizQuestion, Uuid, Uuid)], correct: usize) -> QuizSubmission {
        let mut submission = QuizSubmission::default();
        for (i, (question, right, wrong)) in bank.iter().enumerate() {
            let pick = if i < correct { *right } else { *wrong };
            submission
                .answers
                .insert(question.id, SubmittedAnswer::Choice(pick));
        }
        submission
    }

    fn setup(course: &Course) -> (Arc<InMemoryBackend>, Arc<LearnEngine>) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_course(course.clone());
        let engine = Arc::new(LearnEngine::new(backend.clone()));
        (backend, engine)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_repeated_view_writes_once() {
        let course = course(&[&[ContentType::Video]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let first = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert_eq!(
            first,
            InteractionOutcome::Completed {
                cascade: CascadeReport {
                    module_completed: true,
                    course_completed: true
                }
            }
        );

        let second = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::VideoEnded)
            .await
            .unwrap();
        assert_eq!(second, InteractionOutcome::AlreadyCompleted);
        assert_eq!(backend.progress_writes(), 1);
        assert_eq!(backend.module_writes(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_signals_coalesce_into_one_write() {
        let course = course(&[&[ContentType::Pdf]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        engine.load_course(course.id).await.unwrap();
        backend.set_write_delay(Duration::from_millis(100));
        let ctx = LearnerContext::new(Uuid::new_v4());

        let (a, b) = tokio::join!(
            engine.record_interaction(&ctx, course.id, lesson_id, CompletionSignal::PdfOpened),
            engine.record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        assert!(outcomes.contains(&InteractionOutcome::Coalesced));
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, InteractionOutcome::Completed { .. })));
        assert_eq!(backend.progress_writes(), 1);
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
    }

    #[tokio::test]
    async fn test_video_and_text_lessons_complete_module_once() {
        let mut course = course(&[&[ContentType::Video, ContentType::Text]]);
        let module_id = course.modules[0].id;
        let optional = lesson(module_id, ContentType::Pdf, false, 9);
        course.modules[0].lessons.push(optional);
        let video = course.modules[0].lessons[0].id;
        let text = course.modules[0].lessons[1].id;

        let (backend, engine) = setup(&course);
        let mut rx = engine.subscribe();
        let ctx = LearnerContext::new(Uuid::new_v4());

        let outcome = engine
            .record_interaction(&ctx, course.id, video, CompletionSignal::VideoEnded)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            InteractionOutcome::Completed {
                cascade: CascadeReport::default()
            }
        );

        let outcome = engine
            .record_interaction(&ctx, course.id, text, CompletionSignal::TextScrolledIntoView)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            InteractionOutcome::Completed {
                cascade: CascadeReport {
                    module_completed: true,
                    course_completed: true
                }
            }
        );

        let events = drain(&mut rx);
        let modules = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::ModuleCompleted { .. }))
            .count();
        let courses = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::CourseCompleted { .. }))
            .count();
        assert_eq!(modules, 1);
        assert_eq!(courses, 1);
        assert_eq!(backend.module_writes(), 1);

        let progress = engine.course_progress(ctx.user_id, course.id).await.unwrap();
        assert_eq!(progress.lessons_completed, 2);
        assert_eq!(progress.lessons_total, 3);
        assert_eq!(progress.percentage, 66.67);
        assert_eq!(progress.state, CourseState::Completed);
    }

    #[tokio::test]
    async fn test_survey_gates_module_completion() {
        let mut course = course(&[&[ContentType::Text]]);
        let module_id = course.modules[0].id;
        let survey = survey(module_id);
        course.modules[0].survey = Some(survey.clone());
        let lesson_id = course.modules[0].lessons[0].id;

        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let outcome = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            InteractionOutcome::Completed {
                cascade: CascadeReport::default()
            }
        );
        assert!(!engine
            .is_survey_satisfied(ctx.user_id, course.id, module_id)
            .await
            .unwrap());
        assert!(!engine.evaluate_course(ctx.user_id, course.id).await.unwrap());

        let incomplete = SurveySubmission {
            survey_id: survey.id,
            answers: Vec::new(),
        };
        let err = engine
            .submit_survey_response(&ctx, course.id, module_id, incomplete)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));

        let submission = SurveySubmission {
            survey_id: survey.id,
            answers: vec![SurveyAnswer {
                question_id: survey.questions[0].id,
                value: SurveyAnswerValue::Scale(5),
            }],
        };
        let cascade = engine
            .submit_survey_response(&ctx, course.id, module_id, submission)
            .await
            .unwrap();
        assert_eq!(
            cascade,
            CascadeReport {
                module_completed: true,
                course_completed: true
            }
        );
        assert!(backend.is_module_recorded(ctx.user_id, module_id));
        assert!(engine
            .refresh_survey_state(ctx.user_id, course.id, module_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_quiz_lesson_requires_passing_grade() {
        let mut course = course(&[&[ContentType::Quiz]]);
        let bank = quiz_bank();
        course.modules[0].lessons[0].quiz = bank.iter().map(|(q, _, _)| q.clone()).collect();
        let lesson_id = course.modules[0].lessons[0].id;

        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let viewed = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert_eq!(viewed, InteractionOutcome::Ignored);

        let failed = engine
            .submit_quiz(&ctx, course.id, lesson_id, &answers(&bank, 3))
            .await
            .unwrap();
        assert_eq!(failed.result.score, 60.0);
        assert!(!failed.result.passed);
        assert_eq!(failed.progress, InteractionOutcome::Ignored);
        assert!(!engine.is_completed(ctx.user_id, lesson_id).await);

        let passed = engine
            .submit_quiz(&ctx, course.id, lesson_id, &answers(&bank, 4))
            .await
            .unwrap();
        assert_eq!(passed.result.score, 80.0);
        assert!(passed.result.passed);
        assert!(passed.result.attempt_id.is_some());
        assert!(passed.attempt_recorded);
        assert!(matches!(
            passed.progress,
            InteractionOutcome::Completed { .. }
        ));
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
        assert_eq!(backend.quiz_attempts(), 2);
    }

    #[tokio::test]
    async fn test_unrecorded_local_attempt_is_flagged() {
        let mut course = course(&[&[ContentType::Quiz]]);
        let bank = quiz_bank();
        course.modules[0].lessons[0].quiz = bank.iter().map(|(q, _, _)| q.clone()).collect();
        let lesson_id = course.modules[0].lessons[0].id;

        let (backend, engine) = setup(&course);
        backend.fail_quiz_attempts(true);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let outcome = engine
            .submit_quiz(&ctx, course.id, lesson_id, &answers(&bank, 5))
            .await
            .unwrap();
        assert_eq!(outcome.result.score, 100.0);
        assert!(!outcome.attempt_recorded);
        assert!(outcome.result.attempt_id.is_none());
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
    }

    #[tokio::test]
    async fn test_remote_grade_used_without_question_bank() {
        let course = course(&[&[ContentType::Quiz]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        backend.set_quiz_outcome(
            lesson_id,
            RemoteQuizOutcome {
                score: 85.0,
                passed: true,
                attempt_id: None,
            },
        );
        let ctx = LearnerContext::new(Uuid::new_v4());

        let outcome = engine
            .submit_quiz(&ctx, course.id, lesson_id, &QuizSubmission::default())
            .await
            .unwrap();
        assert!(outcome.result.passed);
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
    }

    #[tokio::test]
    async fn test_quiz_submission_on_content_lesson_rejected() {
        let course = course(&[&[ContentType::Video]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (_backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let err = engine
            .submit_quiz(&ctx, course.id, lesson_id, &QuizSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_lesson_incomplete() {
        let course = course(&[&[ContentType::Text]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        backend.fail_progress_writes(true);
        let err = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::PersistenceWriteFailed(_)));
        assert!(!engine.is_completed(ctx.user_id, lesson_id).await);
        assert_eq!(backend.module_writes(), 0);

        backend.fail_progress_writes(false);
        let outcome = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert!(matches!(outcome, InteractionOutcome::Completed { .. }));
        assert_eq!(backend.progress_writes(), 2);
    }

    #[tokio::test]
    async fn test_module_write_failure_is_retried() {
        let course = course(&[&[ContentType::Video]]);
        let module_id = course.modules[0].id;
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        backend.fail_module_writes(true);
        let err = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::PersistenceWriteFailed(_)));
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
        assert!(!backend.is_module_recorded(ctx.user_id, module_id));

        backend.fail_module_writes(false);
        let outcome = engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert_eq!(outcome, InteractionOutcome::AlreadyCompleted);
        assert!(backend.is_module_recorded(ctx.user_id, module_id));
        assert!(engine.evaluate_course(ctx.user_id, course.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_cascade() {
        let course = course(&[&[ContentType::Video]]);
        let module_id = course.modules[0].id;
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        engine.load_course(course.id).await.unwrap();
        backend.set_write_delay(Duration::from_millis(50));

        let course_id = course.id;
        let token = CancellationToken::new();
        let ctx = LearnerContext::with_token(Uuid::new_v4(), token.clone());
        let task = {
            let engine = Arc::clone(&engine);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                engine
                    .record_interaction(&ctx, course_id, lesson_id, CompletionSignal::Viewed)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, InteractionOutcome::Detached);
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
        assert_eq!(backend.module_writes(), 0);

        // A later evaluation picks up the pending module record.
        backend.set_write_delay(Duration::ZERO);
        let fresh = LearnerContext::new(ctx.user_id);
        engine
            .record_interaction(&fresh, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        assert!(backend.is_module_recorded(ctx.user_id, module_id));
    }

    #[tokio::test]
    async fn test_dropped_caller_write_still_lands() {
        let course = course(&[&[ContentType::Text]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        engine.load_course(course.id).await.unwrap();
        backend.set_write_delay(Duration::from_millis(50));
        let user_id = Uuid::new_v4();
        let course_id = course.id;

        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let ctx = LearnerContext::new(user_id);
                engine
                    .record_interaction(&ctx, course_id, lesson_id, CompletionSignal::Viewed)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(engine.is_completed(user_id, lesson_id).await);
        assert_eq!(backend.progress_writes(), 1);
    }

    #[tokio::test]
    async fn test_certificate_requires_completion_and_is_idempotent() {
        let course = course(&[&[ContentType::Video], &[ContentType::Pdf]]);
        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let err = engine
            .ensure_certificate(ctx.user_id, course.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::CourseNotComplete(_)));

        for lesson in course.lessons() {
            engine
                .record_interaction(&ctx, course.id, lesson.id, CompletionSignal::Viewed)
                .await
                .unwrap();
        }

        let (a, b) = tokio::join!(
            engine.ensure_certificate(ctx.user_id, course.id),
            engine.ensure_certificate(ctx.user_id, course.id),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);

        let again = engine.ensure_certificate(ctx.user_id, course.id).await.unwrap();
        assert_eq!(again.id, a.id);
        assert_eq!(backend.certificates_generated(), 1);

        let pdf = engine.download_certificate(ctx.user_id, a.id).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        let verification = engine
            .verify_certificate(&a.certificate_number)
            .await
            .unwrap();
        assert!(verification.is_valid);
        assert_eq!(verification.certificate.map(|c| c.id), Some(a.id));

        let unknown = engine.verify_certificate("CERT-UNKNOWN").await.unwrap();
        assert!(!unknown.is_valid);
    }

    #[tokio::test]
    async fn test_certificate_after_restart_uses_recorded_progress() {
        let course = course(&[&[ContentType::Video]]);
        let module_id = course.modules[0].id;
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let user_id = Uuid::new_v4();

        backend.seed_progress(LessonProgress {
            lesson_id,
            user_id,
            is_completed: true,
            completed_at: Some(chrono::Utc::now()),
        });
        backend.seed_module_completed(user_id, module_id);

        let certificate = engine.ensure_certificate(user_id, course.id).await.unwrap();
        assert_eq!(certificate.course_id, course.id);
        assert_eq!(certificate.user_id, user_id);
        assert_eq!(backend.certificates_generated(), 1);
        assert_eq!(backend.module_writes(), 0);
        assert!(engine.is_completed(user_id, lesson_id).await);
    }

    #[tokio::test]
    async fn test_download_errors_are_distinguished() {
        let course = course(&[&[ContentType::Video]]);
        let (backend, engine) = setup(&course);
        let user_id = Uuid::new_v4();

        let err = engine
            .download_certificate(user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::CertificateNotFound(_)));

        backend.fail_downloads(true);
        let err = engine
            .download_certificate(user_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_course_never_completes() {
        let course = course(&[]);
        let (_backend, engine) = setup(&course);
        let user_id = Uuid::new_v4();

        assert!(!engine.evaluate_course(user_id, course.id).await.unwrap());
        let progress = engine.course_progress(user_id, course.id).await.unwrap();
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.state, CourseState::NotStarted);
        let err = engine.ensure_certificate(user_id, course.id).await.unwrap_err();
        assert!(matches!(err, LearnError::CourseNotComplete(_)));
    }

    #[tokio::test]
    async fn test_sync_hydrates_and_records_module() {
        let mut course = course(&[&[ContentType::Video, ContentType::Text]]);
        let module_id = course.modules[0].id;
        let survey = survey(module_id);
        course.modules[0].survey = Some(survey.clone());
        let (backend, engine) = setup(&course);
        let user_id = Uuid::new_v4();

        for lesson in course.lessons() {
            backend.seed_progress(LessonProgress {
                lesson_id: lesson.id,
                user_id,
                is_completed: true,
                completed_at: Some(chrono::Utc::now()),
            });
        }
        backend.seed_survey_response(user_id, survey.id);

        let progress = engine.sync_progress(user_id, course.id).await.unwrap();
        assert!(progress.is_course_completed);
        assert_eq!(progress.percentage, 100.0);
        assert!(progress.resume_module.is_none());
        assert_eq!(backend.module_writes(), 1);

        engine.sync_progress(user_id, course.id).await.unwrap();
        assert_eq!(backend.module_writes(), 1);
    }

    #[tokio::test]
    async fn test_sync_respects_recorded_module() {
        let course = course(&[&[ContentType::Video]]);
        let module_id = course.modules[0].id;
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let user_id = Uuid::new_v4();

        backend.seed_progress(LessonProgress {
            lesson_id,
            user_id,
            is_completed: true,
            completed_at: None,
        });
        backend.seed_module_completed(user_id, module_id);

        let progress = engine.sync_progress(user_id, course.id).await.unwrap();
        assert!(progress.is_course_completed);
        assert_eq!(backend.module_writes(), 0);
    }

    #[tokio::test]
    async fn test_sync_never_reverts_completion() {
        let course = course(&[&[ContentType::Text, ContentType::Video]]);
        let lesson_id = course.modules[0].lessons[0].id;
        let (backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        engine
            .record_interaction(&ctx, course.id, lesson_id, CompletionSignal::Viewed)
            .await
            .unwrap();
        backend.seed_progress(LessonProgress::not_started(ctx.user_id, lesson_id));

        let progress = engine.sync_progress(ctx.user_id, course.id).await.unwrap();
        assert!(engine.is_completed(ctx.user_id, lesson_id).await);
        assert_eq!(progress.lessons_completed, 1);
        assert_eq!(progress.state, CourseState::InProgress);
    }

    #[tokio::test]
    async fn test_modules_unlock_in_order() {
        let course = course(&[&[ContentType::Video], &[ContentType::Text]]);
        let (_backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let statuses = engine.module_statuses(ctx.user_id, course.id).await.unwrap();
        assert!(statuses[0].unlocked);
        assert!(!statuses[1].unlocked);

        engine
            .record_interaction(
                &ctx,
                course.id,
                course.modules[0].lessons[0].id,
                CompletionSignal::Viewed,
            )
            .await
            .unwrap();

        let status = engine
            .module_status(ctx.user_id, course.id, course.modules[1].id)
            .await
            .unwrap();
        assert!(status.unlocked);
        assert!(!status.is_completed);

        let progress = engine.course_progress(ctx.user_id, course.id).await.unwrap();
        assert_eq!(progress.resume_module, Some(course.modules[1].id));
    }

    #[tokio::test]
    async fn test_unknown_lesson_is_not_found() {
        let course = course(&[&[ContentType::Video]]);
        let (_backend, engine) = setup(&course);
        let ctx = LearnerContext::new(Uuid::new_v4());

        let err = engine
            .record_interaction(&ctx, course.id, Uuid::new_v4(), CompletionSignal::Viewed)
            .await
            .unwrap_err();
        assert!(matches!(err, LearnError::NotFound(_)));

        let err = engine.load_course(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LearnError::NotFound(_)));
    }
}
