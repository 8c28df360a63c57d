use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, IdError, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("course {0} appears more than once")]
    DuplicateCourse(CourseId),

    #[error("lesson {lesson_id} appears more than once in course {course_id}")]
    DuplicateLesson {
        course_id: CourseId,
        lesson_id: LessonId,
    },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Completion and watch-time record for one lesson of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    lesson_id: LessonId,
    completed: bool,
    watched_seconds: u32,
    last_accessed: DateTime<Utc>,
}

impl LessonProgress {
    fn new(lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            lesson_id,
            completed: false,
            watched_seconds: 0,
            last_accessed: now,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.watched_seconds
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Per-course progress: lessons in the order they were first touched, plus
/// the lesson the student interacted with most recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    course_id: CourseId,
    #[serde(default)]
    lessons: Vec<LessonProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_lesson_id: Option<LessonId>,
}

impl CourseProgress {
    fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            lessons: Vec::new(),
            last_lesson_id: None,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn lessons(&self) -> &[LessonProgress] {
        &self.lessons
    }

    #[must_use]
    pub fn last_lesson_id(&self) -> Option<&LessonId> {
        self.last_lesson_id.as_ref()
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: &LessonId) -> Option<&LessonProgress> {
        self.lessons.iter().find(|l| &l.lesson_id == lesson_id)
    }

    /// Number of lessons flagged as completed.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lessons.iter().filter(|l| l.completed).count()
    }

    /// Returns the lesson record, appending a fresh one if it does not exist.
    ///
    /// A fresh record is incomplete, has zero watch time, and is stamped
    /// with `now`.
    fn lesson_entry(&mut self, lesson_id: &LessonId, now: DateTime<Utc>) -> &mut LessonProgress {
        let idx = match self.lessons.iter().position(|l| &l.lesson_id == lesson_id) {
            Some(idx) => idx,
            None => {
                self.lessons.push(LessonProgress::new(lesson_id.clone(), now));
                self.lessons.len() - 1
            }
        };
        &mut self.lessons[idx]
    }

    fn check_unique_lessons(&self) -> Result<(), ProgressError> {
        for (i, lesson) in self.lessons.iter().enumerate() {
            if self.lessons[..i]
                .iter()
                .any(|prev| prev.lesson_id == lesson.lesson_id)
            {
                return Err(ProgressError::DuplicateLesson {
                    course_id: self.course_id.clone(),
                    lesson_id: lesson.lesson_id.clone(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct RawProgressState {
    #[serde(default)]
    courses: Vec<CourseProgress>,
}

/// The whole progress store: at most one record per course, kept in
/// insertion order.
///
/// Records are created lazily by the mutators and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProgressState")]
pub struct ProgressState {
    courses: Vec<CourseProgress>,
}

impl TryFrom<RawProgressState> for ProgressState {
    type Error = ProgressError;

    fn try_from(raw: RawProgressState) -> Result<Self, Self::Error> {
        Self::from_courses(raw.courses)
    }
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from persisted course records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::DuplicateCourse` or
    /// `ProgressError::DuplicateLesson` if the records break uniqueness.
    pub fn from_courses(courses: Vec<CourseProgress>) -> Result<Self, ProgressError> {
        for (i, course) in courses.iter().enumerate() {
            if courses[..i].iter().any(|c| c.course_id == course.course_id) {
                return Err(ProgressError::DuplicateCourse(course.course_id.clone()));
            }
            course.check_unique_lessons()?;
        }
        Ok(Self { courses })
    }

    #[must_use]
    pub fn courses(&self) -> &[CourseProgress] {
        &self.courses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    #[must_use]
    pub fn course(&self, course_id: &CourseId) -> Option<&CourseProgress> {
        self.courses.iter().find(|c| &c.course_id == course_id)
    }

    /// Get-or-create step shared by every mutator.
    ///
    /// Returns the course record, appending an empty one if this course has
    /// never been touched.
    pub fn course_entry(&mut self, course_id: &CourseId) -> &mut CourseProgress {
        let idx = match self.courses.iter().position(|c| &c.course_id == course_id) {
            Some(idx) => idx,
            None => {
                self.courses.push(CourseProgress::new(course_id.clone()));
                self.courses.len() - 1
            }
        };
        &mut self.courses[idx]
    }

    /// Flag a lesson as completed and make it the course's last lesson.
    ///
    /// Calling this again only refreshes `last_accessed`.
    pub fn mark_completed(
        &mut self,
        course_id: &CourseId,
        lesson_id: &LessonId,
        now: DateTime<Utc>,
    ) {
        let course = self.course_entry(course_id);
        let lesson = course.lesson_entry(lesson_id, now);
        lesson.completed = true;
        lesson.last_accessed = now;
        course.last_lesson_id = Some(lesson_id.clone());
    }

    /// Overwrite the watched seconds of a lesson. Completion is untouched.
    pub fn update_watch_time(
        &mut self,
        course_id: &CourseId,
        lesson_id: &LessonId,
        watched_seconds: u32,
        now: DateTime<Utc>,
    ) {
        let course = self.course_entry(course_id);
        let lesson = course.lesson_entry(lesson_id, now);
        lesson.watched_seconds = watched_seconds;
        lesson.last_accessed = now;
        course.last_lesson_id = Some(lesson_id.clone());
    }

    /// Point the course at a lesson without creating a lesson record.
    pub fn set_last_lesson(&mut self, course_id: &CourseId, lesson_id: &LessonId) {
        self.course_entry(course_id).last_lesson_id = Some(lesson_id.clone());
    }

    #[must_use]
    pub fn is_lesson_completed(&self, course_id: &CourseId, lesson_id: &LessonId) -> bool {
        self.course(course_id)
            .and_then(|c| c.lesson(lesson_id))
            .is_some_and(LessonProgress::completed)
    }

    #[must_use]
    pub fn last_lesson(&self, course_id: &CourseId) -> Option<&LessonId> {
        self.course(course_id).and_then(CourseProgress::last_lesson_id)
    }

    #[must_use]
    pub fn completed_count(&self, course_id: &CourseId) -> usize {
        self.course(course_id).map_or(0, CourseProgress::completed_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_clock, fixed_now};
    use chrono::Duration;

    fn course(raw: &str) -> CourseId {
        CourseId::new(raw).unwrap()
    }

    fn lesson(raw: &str) -> LessonId {
        LessonId::new(raw).unwrap()
    }

    #[test]
    fn mark_completed_creates_records() {
        let mut state = ProgressState::new();
        state.mark_completed(&course("c1"), &lesson("l1"), fixed_now());

        assert!(state.is_lesson_completed(&course("c1"), &lesson("l1")));
        assert!(!state.is_lesson_completed(&course("c1"), &lesson("l2")));

        let record = state.course(&course("c1")).unwrap();
        assert_eq!(record.lessons().len(), 1);
        assert_eq!(record.lessons()[0].watched_seconds(), 0);
        assert_eq!(record.last_lesson_id(), Some(&lesson("l1")));
    }

    #[test]
    fn mark_completed_twice_keeps_one_record_and_refreshes_access() {
        let mut state = ProgressState::new();
        let later = fixed_clock().advanced_by(Duration::minutes(5)).now();
        state.mark_completed(&course("c1"), &lesson("l1"), fixed_now());
        state.mark_completed(&course("c1"), &lesson("l1"), later);

        let record = state.course(&course("c1")).unwrap();
        assert_eq!(record.lessons().len(), 1);
        assert!(record.lessons()[0].completed());
        assert_eq!(record.lessons()[0].last_accessed(), later);
    }

    #[test]
    fn watch_time_overwrites_and_never_uncompletes() {
        let mut state = ProgressState::new();
        state.mark_completed(&course("c1"), &lesson("l1"), fixed_now());
        state.update_watch_time(&course("c1"), &lesson("l1"), 120, fixed_now());
        state.update_watch_time(&course("c1"), &lesson("l1"), 90, fixed_now());

        let record = state
            .course(&course("c1"))
            .and_then(|c| c.lesson(&lesson("l1")))
            .unwrap();
        assert_eq!(record.watched_seconds(), 90);
        assert!(record.completed());
    }

    #[test]
    fn watch_time_refreshes_last_accessed() {
        let clock = fixed_clock();
        let later = clock.advanced_by(Duration::seconds(90));
        let mut state = ProgressState::new();
        state.update_watch_time(&course("c1"), &lesson("l1"), 30, clock.now());
        state.update_watch_time(&course("c1"), &lesson("l1"), 120, later.now());

        let record = state
            .course(&course("c1"))
            .and_then(|c| c.lesson(&lesson("l1")))
            .unwrap();
        assert_eq!(record.last_accessed(), later.now());
        assert!(record.last_accessed() > clock.now());
        assert_eq!(record.watched_seconds(), 120);
    }

    #[test]
    fn set_last_lesson_leaves_lesson_timestamps_alone() {
        let clock = fixed_clock();
        let mut state = ProgressState::new();
        state.mark_completed(&course("c1"), &lesson("l1"), clock.now());
        state.update_watch_time(&course("c1"), &lesson("l2"), 45, clock.now());
        let before = state.course(&course("c1")).unwrap().lessons().to_vec();

        state.set_last_lesson(&course("c1"), &lesson("l1"));
        state.set_last_lesson(&course("c1"), &lesson("l9"));

        let record = state.course(&course("c1")).unwrap();
        assert_eq!(record.lessons(), before.as_slice());
        assert!(record.lessons().iter().all(|l| l.last_accessed() == clock.now()));
        assert_eq!(record.last_lesson_id(), Some(&lesson("l9")));
    }

    #[test]
    fn watch_time_on_new_lesson_starts_incomplete() {
        let mut state = ProgressState::new();
        state.update_watch_time(&course("c1"), &lesson("l3"), 15, fixed_now());
        assert!(!state.is_lesson_completed(&course("c1"), &lesson("l3")));
        assert_eq!(state.last_lesson(&course("c1")), Some(&lesson("l3")));
    }

    #[test]
    fn set_last_lesson_does_not_create_lesson() {
        let mut state = ProgressState::new();
        state.set_last_lesson(&course("c2"), &lesson("l5"));

        let record = state.course(&course("c2")).unwrap();
        assert!(record.lessons().is_empty());
        assert_eq!(record.last_lesson_id(), Some(&lesson("l5")));
    }

    #[test]
    fn last_lesson_tracks_latest_mutation() {
        let mut state = ProgressState::new();
        state.mark_completed(&course("c1"), &lesson("l1"), fixed_now());
        state.update_watch_time(&course("c1"), &lesson("l2"), 30, fixed_now());
        state.set_last_lesson(&course("c1"), &lesson("l4"));
        state.mark_completed(&course("c1"), &lesson("l3"), fixed_now());
        assert_eq!(state.last_lesson(&course("c1")), Some(&lesson("l3")));
    }

    #[test]
    fn lessons_keep_insertion_order() {
        let mut state = ProgressState::new();
        for id in ["l3", "l1", "l2"] {
            state.mark_completed(&course("c1"), &lesson(id), fixed_now());
        }
        let ids: Vec<&str> = state
            .course(&course("c1"))
            .unwrap()
            .lessons()
            .iter()
            .map(|l| l.lesson_id().as_str())
            .collect();
        assert_eq!(ids, vec!["l3", "l1", "l2"]);
        assert_eq!(state.completed_count(&course("c1")), 3);
    }

    #[test]
    fn unknown_course_reads_are_empty() {
        let state = ProgressState::new();
        assert!(state.course(&course("unknown")).is_none());
        assert!(state.last_lesson(&course("unknown")).is_none());
        assert_eq!(state.completed_count(&course("unknown")), 0);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut state = ProgressState::new();
        state.update_watch_time(&course("c1"), &lesson("l1"), 42, fixed_now());
        let json = serde_json::to_value(&state).unwrap();

        let lesson_json = &json["courses"][0]["lessons"][0];
        assert_eq!(json["courses"][0]["courseId"], "c1");
        assert_eq!(json["courses"][0]["lastLessonId"], "l1");
        assert_eq!(lesson_json["watchedSeconds"], 42);
        assert_eq!(lesson_json["completed"], false);
        assert!(lesson_json["lastAccessed"].is_string());

        let back: ProgressState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn deserialize_rejects_duplicate_courses() {
        let json = serde_json::json!({
            "courses": [
                { "courseId": "c1", "lessons": [] },
                { "courseId": "c1", "lessons": [] }
            ]
        });
        assert!(serde_json::from_value::<ProgressState>(json).is_err());
    }

    #[test]
    fn from_courses_rejects_duplicate_lessons() {
        let mut state = ProgressState::new();
        state.mark_completed(&course("c1"), &lesson("l1"), fixed_now());
        let mut record = state.course(&course("c1")).unwrap().clone();
        record.lessons.push(record.lessons[0].clone());

        let err = ProgressState::from_courses(vec![record]).unwrap_err();
        assert_eq!(
            err,
            ProgressError::DuplicateLesson {
                course_id: course("c1"),
                lesson_id: lesson("l1"),
            }
        );
    }
}
