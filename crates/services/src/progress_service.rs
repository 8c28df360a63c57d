use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use portal_core::model::{CourseId, CourseProgress, LessonId, ProgressError, ProgressState};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Client-side progress store: lesson completion and watch time per course.
///
/// Every mutation is applied in memory first and then the whole state is
/// written through the repository. When that write fails the in-memory
/// change stays in place and the failure is returned, so the caller decides
/// whether to surface it. Later mutations keep trying to persist.
///
/// Mutations are serialized: each state change and its save run under one
/// write guard, and the last save always holds the latest state.
///
/// Identifiers arrive as plain strings; blank identifiers are rejected with
/// `ProgressError::InvalidId` before anything changes. Reads treat a blank
/// identifier as "not found".
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    state: Mutex<ProgressState>,
    write_guard: tokio::sync::Mutex<()>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>, state: ProgressState) -> Self {
        Self {
            clock,
            repo,
            state: Mutex::new(state),
            write_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Rehydrate from the repository.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if a persisted entry exists but
    /// cannot be read.
    pub async fn open(
        clock: Clock,
        repo: Arc<dyn ProgressRepository>,
    ) -> Result<Self, ProgressServiceError> {
        let state = repo.load().await?.unwrap_or_default();
        tracing::debug!(courses = state.courses().len(), "progress rehydrated");
        Ok(Self::new(clock, repo, state))
    }

    /// Rehydrate from the repository, starting empty if the entry is unreadable.
    pub async fn open_or_empty(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        let state = match repo.load().await {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable progress entry");
                ProgressState::new()
            }
        };
        Self::new(clock, repo, state)
    }

    /// Flag a lesson as completed and make it the course's last lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for blank identifiers, or
    /// `ProgressServiceError::Storage` if the new state could not be saved.
    pub async fn mark_completed(
        &self,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<(), ProgressServiceError> {
        let (course_id, lesson_id) = parse_ids(course_id, lesson_id)?;
        self.apply(|state, now| state.mark_completed(&course_id, &lesson_id, now))
            .await
    }

    /// Overwrite the seconds watched for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for blank identifiers, or
    /// `ProgressServiceError::Storage` if the new state could not be saved.
    pub async fn update_watch_time(
        &self,
        course_id: &str,
        lesson_id: &str,
        watched_seconds: u32,
    ) -> Result<(), ProgressServiceError> {
        let (course_id, lesson_id) = parse_ids(course_id, lesson_id)?;
        self.apply(|state, now| {
            state.update_watch_time(&course_id, &lesson_id, watched_seconds, now);
        })
        .await
    }

    /// Remember where the student left off without touching lesson records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for blank identifiers, or
    /// `ProgressServiceError::Storage` if the new state could not be saved.
    pub async fn set_last_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<(), ProgressServiceError> {
        let (course_id, lesson_id) = parse_ids(course_id, lesson_id)?;
        self.apply(|state, _| state.set_last_lesson(&course_id, &lesson_id))
            .await
    }

    #[must_use]
    pub fn course_progress(&self, course_id: &str) -> Option<CourseProgress> {
        let course_id = CourseId::new(course_id).ok()?;
        self.lock_state().course(&course_id).cloned()
    }

    #[must_use]
    pub fn is_lesson_completed(&self, course_id: &str, lesson_id: &str) -> bool {
        parse_ids(course_id, lesson_id)
            .is_ok_and(|(course, lesson)| self.lock_state().is_lesson_completed(&course, &lesson))
    }

    #[must_use]
    pub fn last_lesson(&self, course_id: &str) -> Option<LessonId> {
        let course_id = CourseId::new(course_id).ok()?;
        self.lock_state().last_lesson(&course_id).cloned()
    }

    #[must_use]
    pub fn completed_count(&self, course_id: &str) -> usize {
        CourseId::new(course_id).map_or(0, |id| self.lock_state().completed_count(&id))
    }

    /// All course records in the order they were first touched.
    #[must_use]
    pub fn courses(&self) -> Vec<CourseProgress> {
        self.lock_state().courses().to_vec()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.lock_state().clone()
    }

    async fn apply(
        &self,
        mutate: impl FnOnce(&mut ProgressState, DateTime<Utc>),
    ) -> Result<(), ProgressServiceError> {
        // Held until the save completes.
        let _write = self.write_guard.lock().await;
        let snapshot = {
            let mut state = self.lock_state();
            mutate(&mut state, self.clock.now());
            state.clone()
        };

        match self.repo.save(&snapshot).await {
            Ok(()) => {
                tracing::debug!(courses = snapshot.courses().len(), "progress saved");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "progress kept in memory only");
                Err(err.into())
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_ids(course_id: &str, lesson_id: &str) -> Result<(CourseId, LessonId), ProgressError> {
    Ok((CourseId::new(course_id)?, LessonId::new(lesson_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryProgressRepository;

    fn service() -> (ProgressService, InMemoryProgressRepository) {
        let repo = InMemoryProgressRepository::new();
        let svc = ProgressService::new(fixed_clock(), Arc::new(repo.clone()), ProgressState::new());
        (svc, repo)
    }

    #[tokio::test]
    async fn scenario_mark_completed_on_empty_store() {
        let (svc, repo) = service();
        svc.mark_completed("c1", "l1").await.unwrap();

        assert!(svc.is_lesson_completed("c1", "l1"));
        assert!(!svc.is_lesson_completed("c1", "l2"));
        assert_eq!(repo.save_count(), 1);
    }

    #[tokio::test]
    async fn scenario_watch_time_overwrites() {
        let (svc, _) = service();
        svc.update_watch_time("c1", "l1", 120).await.unwrap();
        svc.update_watch_time("c1", "l1", 90).await.unwrap();

        let course = svc.course_progress("c1").unwrap();
        let lesson = course.lesson(&LessonId::new("l1").unwrap()).unwrap();
        assert_eq!(lesson.watched_seconds(), 90);
        assert_eq!(lesson.last_accessed(), fixed_now());
    }

    #[tokio::test]
    async fn scenario_set_last_lesson_on_unknown_course() {
        let (svc, _) = service();
        svc.set_last_lesson("c2", "l5").await.unwrap();

        let course = svc.course_progress("c2").unwrap();
        assert!(course.lessons().is_empty());
        assert_eq!(course.last_lesson_id().map(LessonId::as_str), Some("l5"));
    }

    #[tokio::test]
    async fn scenario_unknown_course_is_none() {
        let (svc, _) = service();
        assert!(svc.course_progress("unknown").is_none());
        assert!(svc.last_lesson("unknown").is_none());
    }

    #[tokio::test]
    async fn mark_completed_is_idempotent() {
        let (svc, repo) = service();
        svc.mark_completed("c1", "l1").await.unwrap();
        svc.mark_completed("c1", "l1").await.unwrap();

        assert_eq!(svc.course_progress("c1").unwrap().lessons().len(), 1);
        assert_eq!(svc.completed_count("c1"), 1);
        assert_eq!(repo.save_count(), 2);
    }

    #[tokio::test]
    async fn watch_time_never_clears_completion() {
        let (svc, _) = service();
        svc.mark_completed("c1", "l1").await.unwrap();
        svc.update_watch_time("c1", "l1", 10).await.unwrap();
        assert!(svc.is_lesson_completed("c1", "l1"));
    }

    #[tokio::test]
    async fn last_lesson_follows_latest_mutation() {
        let (svc, _) = service();
        svc.mark_completed("c1", "l1").await.unwrap();
        svc.update_watch_time("c1", "l2", 5).await.unwrap();
        assert_eq!(svc.last_lesson("c1").unwrap().as_str(), "l2");
        svc.set_last_lesson("c1", "l7").await.unwrap();
        assert_eq!(svc.last_lesson("c1").unwrap().as_str(), "l7");
        svc.mark_completed("c1", "l1").await.unwrap();
        assert_eq!(svc.last_lesson("c1").unwrap().as_str(), "l1");
    }

    #[tokio::test]
    async fn blank_ids_are_rejected_without_saving() {
        let (svc, repo) = service();
        let err = svc.mark_completed("", "l1").await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::Progress(ProgressError::InvalidId(_))));
        assert!(svc.update_watch_time("c1", "  ", 3).await.is_err());
        assert!(svc.set_last_lesson(" ", "l1").await.is_err());

        assert!(svc.snapshot().is_empty());
        assert_eq!(repo.save_count(), 0);
        assert!(!svc.is_lesson_completed("", "l1"));
        assert_eq!(svc.completed_count(""), 0);
    }

    #[tokio::test]
    async fn reopening_restores_saved_state() {
        let (svc, repo) = service();
        svc.mark_completed("c1", "l1").await.unwrap();
        svc.update_watch_time("c1", "l2", 45).await.unwrap();
        let before = svc.snapshot();

        let reopened = ProgressService::open(fixed_clock(), Arc::new(repo)).await.unwrap();
        assert_eq!(reopened.snapshot(), before);
        assert!(reopened.is_lesson_completed("c1", "l1"));
        assert!(!reopened.is_lesson_completed("c1", "l2"));
        assert_eq!(reopened.courses().len(), 1);
    }
}
