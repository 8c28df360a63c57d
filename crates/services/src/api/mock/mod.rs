//! In-process stand-in for the portal backend, used in development runs.
//!
//! Every route sleeps for a short artificial delay and then answers with
//! canned JSON built from [`Fixtures`]. Nothing is persisted: progress
//! reports are logged and acknowledged.

use std::time::Duration;

use async_trait::async_trait;
use portal_core::model::{AuthResponse, Course, Discipline, Lesson, Module};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ApiClient, ApiRequest, ApiResponse, Method};
use crate::error::ApiError;

mod fixtures;

pub use fixtures::{DEFAULT_PASSWORD, Fixtures, RECOVERY_CODE};

/// Token handed out by the mock login and expected by `/api/me`.
pub const MOCK_TOKEN: &str = "mock-jwt-token-portal-2025";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockApiConfig {
    /// Delay applied to `/api/auth/*` routes.
    pub auth_delay: Duration,
    /// Delay applied to every other route.
    pub read_delay: Duration,
}

impl Default for MockApiConfig {
    fn default() -> Self {
        Self {
            auth_delay: Duration::from_millis(500),
            read_delay: Duration::from_millis(300),
        }
    }
}

impl MockApiConfig {
    /// No artificial latency.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            auth_delay: Duration::ZERO,
            read_delay: Duration::ZERO,
        }
    }
}

#[derive(Deserialize)]
struct LoginBody {
    cpf: String,
    password: String,
}

#[derive(Deserialize)]
struct CpfBody {
    cpf: String,
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockApi {
    config: MockApiConfig,
    fixtures: Fixtures,
}

impl MockApi {
    #[must_use]
    pub fn new(config: MockApiConfig) -> Self {
        Self::with_fixtures(config, Fixtures::default())
    }

    #[must_use]
    pub fn with_fixtures(config: MockApiConfig, fixtures: Fixtures) -> Self {
        Self { config, fixtures }
    }

    #[must_use]
    pub fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    /// Answer a request the way the development backend would.
    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let (path, query) = request
            .path
            .split_once('?')
            .unwrap_or((request.path.as_str(), ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let Some(route) = Route::resolve(request.method, &segments) else {
            return error(404, &format!("No mock route for {} {path}", request.method));
        };

        tokio::time::sleep(if route.is_auth() {
            self.config.auth_delay
        } else {
            self.config.read_delay
        })
        .await;

        tracing::info!(method = %request.method, path, "mock api request");
        self.respond(route, request, query)
    }

    fn respond(&self, route: Route<'_>, request: &ApiRequest, query: &str) -> ApiResponse {
        match route {
            Route::Login => self.login(request),
            Route::RecoverPassword => self.recover_password(request),
            Route::ValidateToken => validate_token(request),
            Route::ResetPassword => ok(&json!({ "message": "Password reset successfully" })),
            Route::Me => self.me(request),
            Route::Courses => ok(&self.fixtures.courses),
            Route::Course(id) => match self.course(id) {
                Some(course) => ok(course),
                None => error(404, "Course not found"),
            },
            Route::CourseLessons(id) => match self.course(id) {
                Some(course) => ok(&course_lessons(course)),
                None => ApiResponse::new(404, Value::Null),
            },
            Route::Lesson(id) => self.lesson(id),
            Route::LessonProgress(id) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                tracing::info!(lesson_id = id, %body, "lesson progress reported");
                ok(&json!({ "success": true }))
            }
            Route::CompleteLesson(_) => ok(&json!({ "success": true })),
            Route::Announcements => self.announcements(query),
        }
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let body: LoginBody = match parse_body(request) {
            Ok(body) => body,
            Err(resp) => return resp,
        };
        let Some(user) = self.fixtures.users.iter().find(|u| u.cpf == body.cpf) else {
            return error(404, "CPF not found");
        };
        let valid = self
            .fixtures
            .credentials
            .iter()
            .any(|(cpf, password)| *cpf == body.cpf && *password == body.password);
        if !valid {
            return error(401, "Incorrect password");
        }
        ok(&AuthResponse {
            token: MOCK_TOKEN.to_string(),
            user: user.clone(),
        })
    }

    fn recover_password(&self, request: &ApiRequest) -> ApiResponse {
        let body: CpfBody = match parse_body(request) {
            Ok(body) => body,
            Err(resp) => return resp,
        };
        match self.fixtures.users.iter().find(|u| u.cpf == body.cpf) {
            Some(user) => ok(&json!({
                "message": "Token sent to the registered email",
                "email": user.email,
            })),
            None => error(404, "CPF not found"),
        }
    }

    fn me(&self, request: &ApiRequest) -> ApiResponse {
        let authorized = request
            .header("Authorization")
            .is_some_and(|value| value.contains(MOCK_TOKEN));
        match self.fixtures.users.first() {
            Some(user) if authorized => ok(user),
            _ => error(401, "Unauthorized"),
        }
    }

    fn course(&self, id: &str) -> Option<&Course> {
        self.fixtures.courses.iter().find(|c| c.id == id)
    }

    fn lesson(&self, id: &str) -> ApiResponse {
        let found = self.fixtures.courses.iter().find_map(|course| {
            course
                .lessons()
                .find(|(_, _, lesson)| lesson.id == id)
                .map(|(module, discipline, lesson)| (course, module, discipline, lesson))
        });
        let Some((course, module, discipline, lesson)) = found else {
            return ApiResponse::new(404, Value::Null);
        };

        let mut value = lesson_with_location(module, discipline, lesson);
        if let Value::Object(fields) = &mut value {
            fields.insert("courseId".into(), Value::String(course.id.clone()));
            fields.insert("courseTitle".into(), Value::String(course.title.clone()));
        }
        ApiResponse::new(200, value)
    }

    fn announcements(&self, query: &str) -> ApiResponse {
        let course_id = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "courseId")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        let visible: Vec<_> = self
            .fixtures
            .announcements
            .iter()
            .filter(|a| course_id.as_deref().is_none_or(|id| a.visible_in(id)))
            .collect();
        ok(&visible)
    }
}

#[async_trait]
impl ApiClient for MockApi {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.handle(&request).await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Login,
    RecoverPassword,
    ValidateToken,
    ResetPassword,
    Me,
    Courses,
    Course(&'a str),
    CourseLessons(&'a str),
    Lesson(&'a str),
    LessonProgress(&'a str),
    CompleteLesson(&'a str),
    Announcements,
}

impl<'a> Route<'a> {
    fn resolve(method: Method, segments: &[&'a str]) -> Option<Self> {
        let route = match (method, segments) {
            (Method::Post, ["api", "auth", "login"]) => Route::Login,
            (Method::Post, ["api", "auth", "recover-password"]) => Route::RecoverPassword,
            (Method::Post, ["api", "auth", "validate-token"]) => Route::ValidateToken,
            (Method::Post, ["api", "auth", "reset-password"]) => Route::ResetPassword,
            (Method::Get, ["api", "me"]) => Route::Me,
            (Method::Get, ["api", "courses"]) => Route::Courses,
            (Method::Get, ["api", "courses", id]) => Route::Course(*id),
            (Method::Get, ["api", "courses", id, "lessons"]) => Route::CourseLessons(*id),
            (Method::Get, ["api", "lessons", id]) => Route::Lesson(*id),
            (Method::Put, ["api", "lessons", id, "progress"]) => Route::LessonProgress(*id),
            (Method::Post, ["api", "lessons", id, "complete"]) => Route::CompleteLesson(*id),
            (Method::Get, ["api", "announcements"]) => Route::Announcements,
            _ => return None,
        };
        Some(route)
    }

    fn is_auth(self) -> bool {
        matches!(
            self,
            Route::Login | Route::RecoverPassword | Route::ValidateToken | Route::ResetPassword
        )
    }
}

fn validate_token(request: &ApiRequest) -> ApiResponse {
    match parse_body::<TokenBody>(request) {
        Ok(body) if body.token == RECOVERY_CODE => ok(&json!({ "valid": true })),
        Ok(_) => error(400, "Invalid token"),
        Err(resp) => resp,
    }
}

fn course_lessons(course: &Course) -> Vec<Value> {
    course
        .lessons()
        .map(|(module, discipline, lesson)| lesson_with_location(module, discipline, lesson))
        .collect()
}

fn lesson_with_location(module: &Module, discipline: &Discipline, lesson: &Lesson) -> Value {
    let mut fields = match serde_json::to_value(lesson) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    fields.insert("moduleId".into(), Value::String(module.id.clone()));
    fields.insert("moduleTitle".into(), Value::String(module.title.clone()));
    fields.insert("disciplineId".into(), Value::String(discipline.id.clone()));
    fields.insert("disciplineTitle".into(), Value::String(discipline.title.clone()));
    Value::Object(fields)
}

fn parse_body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiResponse> {
    let body = request.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(body).map_err(|_| error(400, "Invalid request body"))
}

fn ok<T: Serialize + ?Sized>(body: &T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(value) => ApiResponse::new(200, value),
        Err(err) => error(500, &err.to_string()),
    }
}

fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "message": message }))
}
