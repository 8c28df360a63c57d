pub mod catalog;
mod ids;
mod progress;

pub use catalog::{
    Announcement, AuthResponse, Course, CourseCategory, CourseStatus, Discipline, Lesson,
    LessonKind, Material, MaterialKind, Module, User, UserRole,
};
pub use ids::{CourseId, IdError, LessonId};
pub use progress::{CourseProgress, LessonProgress, ProgressError, ProgressState};
