use chrono::Duration;
use portal_core::model::{CourseId, LessonId, ProgressState};
use portal_core::time::{fixed_clock, fixed_now};
use storage::envelope::encode_state;
use storage::repository::{ProgressRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

fn ids(course: &str, lesson: &str) -> (CourseId, LessonId) {
    (CourseId::new(course).unwrap(), LessonId::new(lesson).unwrap())
}

#[tokio::test]
async fn sqlite_roundtrip_persists_progress() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load().await.expect("empty load").is_none());

    let mut state = ProgressState::new();
    let (course, l1) = ids("c1", "l1");
    let (_, l2) = ids("c1", "l2");
    state.mark_completed(&course, &l1, fixed_now());
    let later = fixed_clock().advanced_by(Duration::minutes(1)).now();
    state.update_watch_time(&course, &l2, 300, later);
    repo.save(&state).await.expect("save");

    let loaded = repo.load().await.expect("load").expect("entry present");
    assert_eq!(loaded, state);
    assert!(loaded.is_lesson_completed(&course, &l1));
    assert!(!loaded.is_lesson_completed(&course, &l2));
    assert_eq!(loaded.last_lesson(&course), Some(&l2));
}

#[tokio::test]
async fn sqlite_save_overwrites_previous_entry() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let (course, lesson) = ids("c1", "l1");
    let mut state = ProgressState::new();
    state.update_watch_time(&course, &lesson, 120, fixed_now());
    repo.save(&state).await.unwrap();
    state.update_watch_time(&course, &lesson, 90, fixed_now());
    repo.save(&state).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_entries")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let loaded = repo.load().await.unwrap().unwrap();
    let watched = loaded
        .course(&course)
        .and_then(|c| c.lesson(&lesson))
        .map(|l| l.watched_seconds());
    assert_eq!(watched, Some(90));
}

#[tokio::test]
async fn sqlite_keys_are_isolated() {
    let url = "sqlite:file:memdb_progress_keys?mode=memory&cache=shared";
    let first = SqliteRepository::connect(url).await.unwrap().with_progress_key("student-1");
    first.migrate().await.unwrap();
    let second = SqliteRepository::connect(url).await.unwrap().with_progress_key("student-2");

    let (course, lesson) = ids("c9", "l9");
    let mut state = ProgressState::new();
    state.set_last_lesson(&course, &lesson);
    first.save(&state).await.unwrap();

    assert!(second.load().await.unwrap().is_none());
    assert_eq!(first.load().await.unwrap(), Some(state));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_migrate?mode=memory&cache=shared")
        .await
        .unwrap();
    repo.migrate().await.unwrap();
    repo.migrate().await.unwrap();

    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn sqlite_load_reports_corrupt_entry() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_corrupt?mode=memory&cache=shared")
        .await
        .unwrap();
    repo.migrate().await.unwrap();

    sqlx::query("INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)")
        .bind(repo.progress_key())
        .bind("{broken")
        .bind(chrono::Utc::now())
        .execute(repo.pool())
        .await
        .unwrap();

    let err = repo.load().await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn storage_sqlite_wires_progress_repository() {
    let storage = Storage::sqlite(
        "sqlite:file:memdb_progress_storage?mode=memory&cache=shared",
        "progress-storage",
    )
    .await
    .expect("storage");

    let state = ProgressState::new();
    storage.progress.save(&state).await.unwrap();
    let raw: String = {
        let repo = SqliteRepository::connect("sqlite:file:memdb_progress_storage?mode=memory&cache=shared")
            .await
            .unwrap();
        sqlx::query_scalar("SELECT value FROM kv_entries WHERE key = 'progress-storage'")
            .fetch_one(repo.pool())
            .await
            .unwrap()
    };
    assert_eq!(raw, encode_state(&state).unwrap());
}
