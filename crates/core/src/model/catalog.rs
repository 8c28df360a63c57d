//! Catalog shapes exchanged with the portal API.
//!
//! These are plain data carriers: the API owns their contents and the
//! client only reads them. JSON uses camelCase field names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_shift: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_preference: Option<String>,
}

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseCategory {
    BarExamFirstPhase,
    BarExamSecondPhase,
    PublicExams,
    Postgraduate,
    Mentoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Active,
    Completed,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: CourseCategory,
    pub workload_hours: u32,
    pub progress: u8,
    pub status: CourseStatus,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub thumbnail: String,
    pub teacher: String,
    pub modules: Vec<Module>,
}

impl Course {
    /// Every lesson of the course with the module and discipline it sits in.
    pub fn lessons(&self) -> impl Iterator<Item = (&Module, &Discipline, &Lesson)> {
        self.modules.iter().flat_map(|module| {
            module.disciplines.iter().flat_map(move |discipline| {
                discipline
                    .lessons
                    .iter()
                    .map(move |lesson| (module, discipline, lesson))
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub disciplines: Vec<Discipline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discipline {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Material,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: LessonKind,
    /// Length in minutes.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub completed: bool,
    pub order: u32,
    pub published_at: String,
    #[serde(default)]
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Pdf,
    MindMap,
    Handout,
    Podcast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub title: String,
    pub kind: MaterialKind,
    pub url: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub published_at: String,
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

impl Announcement {
    /// Site-wide announcements are visible in every course.
    #[must_use]
    pub fn visible_in(&self, course_id: &str) -> bool {
        self.course_id.as_deref().is_none_or(|id| id == course_id)
    }
}
