use chrono::{DateTime, Duration, Utc};
use encore_core::model::{
    ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, Lesson, LessonDraft, LessonId,
    LearnerId, LessonProgress, MultipleChoiceTier, ProgressStatus, StepsTier, Tier, TierSet,
};
use encore_core::time::fixed_now;
use storage::repository::{LessonRepository, ProgressRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn sample_tiers() -> TierSet {
    TierSet::new(
        IntroTier::new(
            "Counting beats",
            "Four beats to a bar.",
            Some("https://cdn.example.com/intro.mp4".into()),
        )
        .unwrap(),
        StepsTier::new(vec!["Write the equation.".into(), "Solve for x.".into()]).unwrap(),
        MultipleChoiceTier::new(
            "2 + 2?",
            vec![
                ChoiceOption::new("a", "4", true),
                ChoiceOption::new("b", "5", false),
            ],
            10,
        )
        .unwrap(),
        FillInBlankTier::new("How many members?", "eight", vec!["8".into()], 15).unwrap(),
        CompletionTier::new("Encore!", 25, Some("debut".into()), None).unwrap(),
    )
}

fn build_lesson(title: &str, published: bool, created_at: DateTime<Utc>) -> Lesson {
    LessonDraft {
        title: title.into(),
        description: Some("Solve for x with the group's discography.".into()),
        artist: "NewJeans".into(),
        topic: "linear-equations".into(),
        difficulty: 2,
        published,
        tiers: sample_tiers(),
    }
    .validate(LessonId::new(), created_at, created_at)
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_lesson_tiers() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_lessons?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let lesson = build_lesson("Linear equations with NewJeans", true, fixed_now());
    repo.upsert_lesson(&lesson).await.unwrap();

    let fetched = repo.get_lesson(lesson.id()).await.expect("fetch");
    assert_eq!(fetched, lesson);
    assert_eq!(
        fetched.tiers().intro().media_url(),
        Some("https://cdn.example.com/intro.mp4")
    );
    assert_eq!(fetched.tiers().multiple_choice().xp_reward(), 10);
    assert_eq!(fetched.tiers().completion().badge_key(), Some("debut"));

    // A later edit keeps created_at and moves updated_at.
    let later = fixed_now() + Duration::minutes(5);
    let edited = LessonDraft {
        title: "Linear equations, revisited".into(),
        description: fetched.description().map(str::to_owned),
        artist: fetched.artist().into(),
        topic: fetched.topic().into(),
        difficulty: fetched.difficulty().value(),
        published: fetched.is_published(),
        tiers: fetched.tiers().clone(),
    }
    .validate(fetched.id(), fetched.created_at(), later)
    .unwrap();
    repo.upsert_lesson(&edited).await.unwrap();

    let fetched = repo.get_lesson(lesson.id()).await.expect("refetch");
    assert_eq!(fetched.title(), "Linear equations, revisited");
    assert_eq!(fetched.created_at(), lesson.created_at());
    assert_eq!(fetched.updated_at(), later);
}

#[tokio::test]
async fn sqlite_lists_published_newest_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_listing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let older = build_lesson("Older lesson", true, fixed_now());
    let newer = build_lesson("Newer lesson", true, fixed_now() + Duration::minutes(1));
    let draft = build_lesson("Draft lesson", false, fixed_now() + Duration::minutes(2));
    repo.upsert_lesson(&older).await.unwrap();
    repo.upsert_lesson(&newer).await.unwrap();
    repo.upsert_lesson(&draft).await.unwrap();

    let all = repo.list_lessons(false).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title(), "Draft lesson");

    let published = repo.list_lessons(true).await.unwrap();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].title(), "Newer lesson");
    assert_eq!(published[1].title(), "Older lesson");
}

#[tokio::test]
async fn sqlite_progress_keeps_first_stamps() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let lesson = build_lesson("Stamped lesson", true, fixed_now());
    repo.upsert_lesson(&lesson).await.unwrap();

    let learner = LearnerId::new();
    let first_at = fixed_now();
    let mut first = LessonProgress::fresh(learner, lesson.id());
    first.stamp_for_save(0, None, None, first_at);
    repo.upsert_progress(&first).await.unwrap();

    // A replayed save carrying a different started_at cannot move the stamp.
    let later = first_at + Duration::minutes(10);
    let second = LessonProgress::from_persisted(
        learner,
        lesson.id(),
        3,
        0b0_0011,
        20,
        10,
        ProgressStatus::InProgress,
        2,
        45,
        Some(later),
        None,
    )
    .unwrap();
    repo.upsert_progress(&second).await.unwrap();

    let stored = repo
        .get_progress(learner, lesson.id())
        .await
        .expect("fetch")
        .expect("row");
    assert_eq!(stored.started_at(), Some(first_at));
    assert_eq!(stored.current_tier(), Tier::MultipleChoice);
    assert_eq!(stored.score(), 20);
    assert_eq!(stored.attempts(), 2);
    assert_eq!(stored.completed_at(), None);
}

#[tokio::test]
async fn sqlite_delete_cascades_progress() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_cascade?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let lesson = build_lesson("Doomed lesson", true, fixed_now());
    repo.upsert_lesson(&lesson).await.unwrap();

    let learner = LearnerId::new();
    let mut progress = LessonProgress::fresh(learner, lesson.id());
    progress.stamp_for_save(0, None, None, fixed_now());
    repo.upsert_progress(&progress).await.unwrap();

    repo.delete_lesson(lesson.id()).await.unwrap();
    assert!(matches!(
        repo.get_lesson(lesson.id()).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert!(
        repo.get_progress(learner, lesson.id())
            .await
            .unwrap()
            .is_none()
    );

    let err = repo.delete_lesson(LessonId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_lists_progress_by_lesson_and_learner() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_rollup?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let lesson_a = build_lesson("Lesson A", true, fixed_now());
    let lesson_b = build_lesson("Lesson B", true, fixed_now());
    repo.upsert_lesson(&lesson_a).await.unwrap();
    repo.upsert_lesson(&lesson_b).await.unwrap();

    let learner_one = LearnerId::new();
    let learner_two = LearnerId::new();
    for (learner, lesson) in [
        (learner_one, lesson_a.id()),
        (learner_one, lesson_b.id()),
        (learner_two, lesson_a.id()),
    ] {
        let mut progress = LessonProgress::fresh(learner, lesson);
        progress.stamp_for_save(0, None, None, fixed_now());
        repo.upsert_progress(&progress).await.unwrap();
    }

    let for_lesson = repo.list_progress_for_lesson(lesson_a.id()).await.unwrap();
    assert_eq!(for_lesson.len(), 2);

    let for_learner = repo.list_progress_for_learner(learner_one).await.unwrap();
    assert_eq!(for_learner.len(), 2);
    assert!(for_learner.iter().all(|p| p.learner_id() == learner_one));
}
