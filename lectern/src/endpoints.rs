//! Catalog of backend operations.
//!
//! Each operation is an [`Endpoint`] variant resolving to a fixed method, path, and body
//! encoding, plus a same-named async method on [`ApiClient`] that dispatches it.

use crate::client::{multipart, ApiClient, Body, Method, RequestOptions};
use crate::error::ApiError;
use crate::types::{Credentials, SaveConversationRequest, SignupRequest, TutorChatRequest};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// Leaderboard size when the caller does not pick one
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    None,
    Json,
    /// Raw multipart form data; no content type is forced
    Multipart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub encoding: BodyEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    // auth
    Login,
    Register,
    Logout,

    // user
    GetProfile,
    UpdateProfile,

    // student dashboard
    GetStudentDashboard,
    GetRecommendations,
    GetLeaderboard { course: Option<String>, limit: u32 },

    // courses and lessons
    GetCourses,
    GetCourse(String),
    EnrollInCourse(String),
    GetStudentProgress,
    GetLesson(String),

    // AI tutor
    AskAiTutor,
    GetAiTutorHistory,
    SaveAiTutorConversation,
    LoadAiTutorConversation(String),
    GetAiFeedback,

    // quizzes, gamification
    GetUpcomingQuizzes,
    GetQuizAttempts,
    GetBadges,
    GetXpProgress,
    GetAchievements,

    // student profile
    GetStudentProfile,
    UpdateStudentProfile,

    // teacher
    GetTeacherDashboard,
    GetTeacherCourses,
    GetTeacherCourse(String),
    CreateTeacherCourse,
    UpdateTeacherCourse(String),
    DeleteTeacherCourse(String),
    GetTeacherLesson(String),
    CreateTeacherLesson,
    UpdateTeacherLesson(String),
    DeleteTeacherLesson(String),
    GetTeacherQuiz(String),
    CreateTeacherQuiz,
    UpdateTeacherQuiz(String),
    DeleteTeacherQuiz(String),
    GenerateQuizWithAi,
    GetTeacherAnalytics(String),

    // admin
    GetAdminDashboard,
    GetAdminUsers,
    CreateAdminUser,
    UpdateAdminUser(String),
    DeleteAdminUser(String),
    GetPlatformAnalytics(String),
    GetHotjarReports,
    UploadHotjarReport,

    // settings and support
    GetUserSettings,
    UpdateUserSettings,
    ChangePassword,
    GetSupportData,
    SubmitSupportTicket,
}

/// Everything but RFC 3986 unreserved characters is escaped in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes one path segment
fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// Form-encodes one query string value
pub fn query_value(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

impl Endpoint {
    pub fn descriptor(&self) -> RequestDescriptor {
        use BodyEncoding::{Json, Multipart};
        use Endpoint::*;
        let get = |path: String| (Method::GET, path, BodyEncoding::None);
        let (method, path, encoding) = match self {
            Login => (Method::POST, "/login".to_string(), Json),
            Register => (Method::POST, "/signup".to_string(), Json),
            Logout => (Method::POST, "/auth/logout".to_string(), BodyEncoding::None),

            GetProfile => get("/user/profile".to_string()),
            UpdateProfile => (Method::PUT, "/user/profile".to_string(), Json),

            GetStudentDashboard => get("/student/dashboard".to_string()),
            GetRecommendations => get("/recommendations".to_string()),
            GetLeaderboard { course, limit } => {
                let path = match course.as_deref().filter(|c| !c.is_empty()) {
                    Some(c) => format!(
                        "/leaderboard?course={}&limit={limit}",
                        query_value(c)
                    ),
                    None => format!("/leaderboard?limit={limit}"),
                };
                get(path)
            }

            GetCourses => get("/courses".to_string()),
            GetCourse(id) => get(format!("/courses/{}", segment(id))),
            EnrollInCourse(id) => (
                Method::POST,
                format!("/courses/enroll/{}", segment(id)),
                BodyEncoding::None,
            ),
            GetStudentProgress => get("/student/progress".to_string()),
            GetLesson(id) => get(format!("/lessons/{}", segment(id))),

            AskAiTutor => (Method::POST, "/ai/chat".to_string(), Json),
            GetAiTutorHistory => get("/ai/history".to_string()),
            SaveAiTutorConversation => (Method::POST, "/ai/conversation".to_string(), Json),
            LoadAiTutorConversation(id) => get(format!("/ai/conversation/{}", segment(id))),
            GetAiFeedback => (Method::POST, "/ai/feedback".to_string(), Json),

            GetUpcomingQuizzes => get("/student/quizzes/upcoming".to_string()),
            GetQuizAttempts => get("/student/quiz-attempts".to_string()),
            GetBadges => get("/student/badges".to_string()),
            GetXpProgress => get("/student/xp".to_string()),
            GetAchievements => get("/achievements".to_string()),

            GetStudentProfile => get("/student/profile".to_string()),
            UpdateStudentProfile => (Method::PUT, "/student/profile/update".to_string(), Json),

            GetTeacherDashboard => get("/teacher/dashboard".to_string()),
            GetTeacherCourses => get("/teacher/courses".to_string()),
            GetTeacherCourse(id) => get(format!("/teacher/course/{}", segment(id))),
            CreateTeacherCourse => (Method::POST, "/teacher/course".to_string(), Json),
            UpdateTeacherCourse(id) => (
                Method::PUT,
                format!("/teacher/course/{}", segment(id)),
                Json,
            ),
            DeleteTeacherCourse(id) => (
                Method::DELETE,
                format!("/teacher/course/{}", segment(id)),
                BodyEncoding::None,
            ),
            GetTeacherLesson(id) => get(format!("/teacher/lesson/{}", segment(id))),
            CreateTeacherLesson => (Method::POST, "/teacher/lesson".to_string(), Multipart),
            UpdateTeacherLesson(id) => (
                Method::PUT,
                format!("/teacher/lesson/{}", segment(id)),
                Multipart,
            ),
            DeleteTeacherLesson(id) => (
                Method::DELETE,
                format!("/teacher/lesson/{}", segment(id)),
                BodyEncoding::None,
            ),
            GetTeacherQuiz(id) => get(format!("/teacher/quiz/{}", segment(id))),
            CreateTeacherQuiz => (Method::POST, "/teacher/quiz".to_string(), Json),
            UpdateTeacherQuiz(id) => (Method::PUT, format!("/teacher/quiz/{}", segment(id)), Json),
            DeleteTeacherQuiz(id) => (
                Method::DELETE,
                format!("/teacher/quiz/{}", segment(id)),
                BodyEncoding::None,
            ),
            GenerateQuizWithAi => (Method::POST, "/ai/generate-quiz".to_string(), Json),
            GetTeacherAnalytics(course_id) => {
                get(format!("/teacher/analytics/{}", segment(course_id)))
            }

            GetAdminDashboard => get("/admin/dashboard".to_string()),
            GetAdminUsers => get("/admin/users".to_string()),
            CreateAdminUser => (Method::POST, "/admin/users".to_string(), Json),
            UpdateAdminUser(id) => (Method::PUT, format!("/admin/users/{}", segment(id)), Json),
            DeleteAdminUser(id) => (
                Method::DELETE,
                format!("/admin/users/{}", segment(id)),
                BodyEncoding::None,
            ),
            GetPlatformAnalytics(range) => {
                get(format!("/admin/analytics?range={}", query_value(range)))
            }
            GetHotjarReports => get("/admin/hotjar-report".to_string()),
            UploadHotjarReport => (Method::POST, "/admin/hotjar-report".to_string(), Multipart),

            GetUserSettings => get("/settings".to_string()),
            UpdateUserSettings => (Method::PUT, "/settings/update".to_string(), Json),
            ChangePassword => (Method::PUT, "/settings/password".to_string(), Json),
            GetSupportData => get("/support".to_string()),
            SubmitSupportTicket => (Method::POST, "/support/ticket".to_string(), Json),
        };
        RequestDescriptor {
            method,
            path,
            encoding,
        }
    }
}

impl ApiClient {
    /// Dispatches a catalog operation. The body must match the endpoint's encoding.
    pub async fn call(&self, endpoint: Endpoint, body: Option<Body>) -> Result<Value, ApiError> {
        let desc = endpoint.descriptor();
        let matches = matches!(
            (desc.encoding, &body),
            (BodyEncoding::None, None)
                | (BodyEncoding::Json, Some(Body::Json(_)))
                | (BodyEncoding::Multipart, Some(Body::Multipart(_)))
        );
        if !matches {
            return Err(ApiError::invalid_request(format!(
                "body does not match {:?} encoding for {:?}",
                desc.encoding, endpoint
            )));
        }
        let mut options = RequestOptions::new(desc.method);
        options.body = body;
        self.dispatch(&desc.path, options).await
    }

    async fn call_empty(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
        self.call(endpoint, None).await
    }

    async fn call_json<T: serde::Serialize>(
        &self,
        endpoint: Endpoint,
        body: &T,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::invalid_request)?;
        self.call(endpoint, Some(Body::Json(body))).await
    }

    async fn call_multipart(
        &self,
        endpoint: Endpoint,
        form: multipart::Form,
    ) -> Result<Value, ApiError> {
        self.call(endpoint, Some(Body::Multipart(form))).await
    }

    // auth

    /// Authenticates; the response is the identity (with `token`) to hand to
    /// [`crate::session::SessionStore::login`]
    pub async fn login(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        self.call_json(Endpoint::Login, credentials).await
    }

    pub async fn register(&self, signup: &SignupRequest) -> Result<Value, ApiError> {
        self.call_json(Endpoint::Register, signup).await
    }

    /// Ends the session on the backend; local session state is left to the caller
    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::Logout).await
    }

    // user

    pub async fn get_profile(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetProfile).await
    }

    pub async fn update_profile(&self, profile: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateProfile, profile).await
    }

    // student dashboard

    pub async fn get_student_dashboard(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetStudentDashboard).await
    }

    pub async fn get_recommendations(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetRecommendations).await
    }

    /// `limit` defaults to [`DEFAULT_LEADERBOARD_LIMIT`]
    pub async fn get_leaderboard(
        &self,
        course: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetLeaderboard {
            course: course.map(|c| c.to_string()),
            limit: limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT),
        })
        .await
    }

    // courses and lessons

    pub async fn get_courses(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetCourses).await
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetCourse(course_id.to_string()))
            .await
    }

    pub async fn enroll_in_course(&self, course_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::EnrollInCourse(course_id.to_string()))
            .await
    }

    pub async fn get_student_progress(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetStudentProgress).await
    }

    pub async fn get_lesson(&self, lesson_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetLesson(lesson_id.to_string()))
            .await
    }

    // AI tutor

    pub async fn ask_ai_tutor(&self, request: &TutorChatRequest) -> Result<Value, ApiError> {
        self.call_json(Endpoint::AskAiTutor, request).await
    }

    pub async fn get_ai_tutor_history(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetAiTutorHistory).await
    }

    pub async fn save_ai_tutor_conversation(
        &self,
        conversation: &SaveConversationRequest,
    ) -> Result<Value, ApiError> {
        self.call_json(Endpoint::SaveAiTutorConversation, conversation)
            .await
    }

    pub async fn load_ai_tutor_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::LoadAiTutorConversation(
            conversation_id.to_string(),
        ))
        .await
    }

    pub async fn get_ai_feedback(&self, quiz: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::GetAiFeedback, quiz).await
    }

    // quizzes, gamification

    pub async fn get_upcoming_quizzes(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetUpcomingQuizzes).await
    }

    pub async fn get_quiz_attempts(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetQuizAttempts).await
    }

    pub async fn get_badges(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetBadges).await
    }

    pub async fn get_xp_progress(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetXpProgress).await
    }

    pub async fn get_achievements(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetAchievements).await
    }

    // student profile

    pub async fn get_student_profile(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetStudentProfile).await
    }

    pub async fn update_student_profile(&self, profile: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateStudentProfile, profile).await
    }

    // teacher

    pub async fn get_teacher_dashboard(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherDashboard).await
    }

    pub async fn get_teacher_courses(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherCourses).await
    }

    pub async fn get_teacher_course(&self, course_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherCourse(course_id.to_string()))
            .await
    }

    pub async fn create_teacher_course(&self, course: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::CreateTeacherCourse, course).await
    }

    pub async fn update_teacher_course(
        &self,
        course_id: &str,
        course: &Value,
    ) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateTeacherCourse(course_id.to_string()), course)
            .await
    }

    pub async fn delete_teacher_course(&self, course_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::DeleteTeacherCourse(course_id.to_string()))
            .await
    }

    pub async fn get_teacher_lesson(&self, lesson_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherLesson(lesson_id.to_string()))
            .await
    }

    pub async fn create_teacher_lesson(&self, form: multipart::Form) -> Result<Value, ApiError> {
        self.call_multipart(Endpoint::CreateTeacherLesson, form)
            .await
    }

    pub async fn update_teacher_lesson(
        &self,
        lesson_id: &str,
        form: multipart::Form,
    ) -> Result<Value, ApiError> {
        self.call_multipart(Endpoint::UpdateTeacherLesson(lesson_id.to_string()), form)
            .await
    }

    pub async fn delete_teacher_lesson(&self, lesson_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::DeleteTeacherLesson(lesson_id.to_string()))
            .await
    }

    pub async fn get_teacher_quiz(&self, quiz_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherQuiz(quiz_id.to_string()))
            .await
    }

    pub async fn create_teacher_quiz(&self, quiz: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::CreateTeacherQuiz, quiz).await
    }

    pub async fn update_teacher_quiz(&self, quiz_id: &str, quiz: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateTeacherQuiz(quiz_id.to_string()), quiz)
            .await
    }

    pub async fn delete_teacher_quiz(&self, quiz_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::DeleteTeacherQuiz(quiz_id.to_string()))
            .await
    }

    pub async fn generate_quiz_with_ai(&self, request: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::GenerateQuizWithAi, request).await
    }

    pub async fn get_teacher_analytics(&self, course_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetTeacherAnalytics(course_id.to_string()))
            .await
    }

    // admin

    pub async fn get_admin_dashboard(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetAdminDashboard).await
    }

    pub async fn get_admin_users(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetAdminUsers).await
    }

    pub async fn create_admin_user(&self, user: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::CreateAdminUser, user).await
    }

    pub async fn update_admin_user(&self, user_id: &str, user: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateAdminUser(user_id.to_string()), user)
            .await
    }

    pub async fn delete_admin_user(&self, user_id: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::DeleteAdminUser(user_id.to_string()))
            .await
    }

    pub async fn get_platform_analytics(&self, time_range: &str) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetPlatformAnalytics(time_range.to_string()))
            .await
    }

    pub async fn get_hotjar_reports(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetHotjarReports).await
    }

    pub async fn upload_hotjar_report(&self, form: multipart::Form) -> Result<Value, ApiError> {
        self.call_multipart(Endpoint::UploadHotjarReport, form).await
    }

    // settings and support

    pub async fn get_user_settings(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetUserSettings).await
    }

    pub async fn update_user_settings(&self, settings: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::UpdateUserSettings, settings).await
    }

    pub async fn change_password(&self, passwords: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::ChangePassword, passwords).await
    }

    pub async fn get_support_data(&self) -> Result<Value, ApiError> {
        self.call_empty(Endpoint::GetSupportData).await
    }

    pub async fn submit_support_ticket(&self, ticket: &Value) -> Result<Value, ApiError> {
        self.call_json(Endpoint::SubmitSupportTicket, ticket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(endpoint: Endpoint, method: Method, path: &str, encoding: BodyEncoding) {
        let desc = endpoint.descriptor();
        assert_eq!(desc.method, method, "{endpoint:?}");
        assert_eq!(desc.path, path, "{endpoint:?}");
        assert_eq!(desc.encoding, encoding, "{endpoint:?}");
    }

    #[test]
    fn test_auth_and_student_paths() {
        use BodyEncoding::*;
        check(Endpoint::Login, Method::POST, "/login", Json);
        check(Endpoint::Register, Method::POST, "/signup", Json);
        check(Endpoint::Logout, Method::POST, "/auth/logout", None);
        check(Endpoint::GetProfile, Method::GET, "/user/profile", None);
        check(Endpoint::UpdateProfile, Method::PUT, "/user/profile", Json);
        check(Endpoint::GetCourses, Method::GET, "/courses", None);
        check(
            Endpoint::GetCourse("7".to_string()),
            Method::GET,
            "/courses/7",
            None,
        );
        check(
            Endpoint::EnrollInCourse("42".to_string()),
            Method::POST,
            "/courses/enroll/42",
            None,
        );
        check(
            Endpoint::GetLesson("l1".to_string()),
            Method::GET,
            "/lessons/l1",
            None,
        );
        check(Endpoint::GetXpProgress, Method::GET, "/student/xp", None);
        check(
            Endpoint::UpdateStudentProfile,
            Method::PUT,
            "/student/profile/update",
            Json,
        );
        check(
            Endpoint::GetQuizAttempts,
            Method::GET,
            "/student/quiz-attempts",
            None,
        );
    }

    #[test]
    fn test_tutor_paths() {
        use BodyEncoding::*;
        check(Endpoint::AskAiTutor, Method::POST, "/ai/chat", Json);
        check(Endpoint::GetAiTutorHistory, Method::GET, "/ai/history", None);
        check(
            Endpoint::SaveAiTutorConversation,
            Method::POST,
            "/ai/conversation",
            Json,
        );
        check(
            Endpoint::LoadAiTutorConversation("1700000000000".to_string()),
            Method::GET,
            "/ai/conversation/1700000000000",
            None,
        );
        check(
            Endpoint::GenerateQuizWithAi,
            Method::POST,
            "/ai/generate-quiz",
            Json,
        );
    }

    #[test]
    fn test_multipart_endpoints() {
        let multipart: Vec<Endpoint> = vec![
            Endpoint::CreateTeacherLesson,
            Endpoint::UpdateTeacherLesson("3".to_string()),
            Endpoint::UploadHotjarReport,
        ];
        for e in multipart {
            assert_eq!(e.descriptor().encoding, BodyEncoding::Multipart, "{e:?}");
        }
        check(
            Endpoint::UpdateTeacherLesson("3".to_string()),
            Method::PUT,
            "/teacher/lesson/3",
            BodyEncoding::Multipart,
        );
        check(
            Endpoint::DeleteTeacherLesson("3".to_string()),
            Method::DELETE,
            "/teacher/lesson/3",
            BodyEncoding::None,
        );
    }

    #[test]
    fn test_query_paths() {
        check(
            Endpoint::GetLeaderboard {
                course: None,
                limit: DEFAULT_LEADERBOARD_LIMIT,
            },
            Method::GET,
            "/leaderboard?limit=50",
            BodyEncoding::None,
        );
        check(
            Endpoint::GetLeaderboard {
                course: Some("rust 101".to_string()),
                limit: 5,
            },
            Method::GET,
            "/leaderboard?course=rust+101&limit=5",
            BodyEncoding::None,
        );
        check(
            Endpoint::GetLeaderboard {
                course: Some("".to_string()),
                limit: 5,
            },
            Method::GET,
            "/leaderboard?limit=5",
            BodyEncoding::None,
        );
        check(
            Endpoint::GetPlatformAnalytics("30d".to_string()),
            Method::GET,
            "/admin/analytics?range=30d",
            BodyEncoding::None,
        );
    }

    #[test]
    fn test_path_segments_encoded() {
        assert_eq!(segment("42"), "42");
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
        assert_eq!(segment("intro-1.v2_x~"), "intro-1.v2_x~");
        assert_eq!(segment("é?#"), "%C3%A9%3F%23");
        check(
            Endpoint::DeleteAdminUser("../x".to_string()),
            Method::DELETE,
            "/admin/users/..%2Fx",
            BodyEncoding::None,
        );
    }

    #[tokio::test]
    async fn test_call_rejects_mismatched_body() {
        use crate::client::ApiConfig;
        use crate::session::SessionStore;
        use crate::storage::MemoryStorage;
        use std::sync::Arc;

        let client = ApiClient::new(
            ApiConfig::new("http://127.0.0.1:9"),
            SessionStore::new(Arc::new(MemoryStorage::new())),
        )
        .unwrap();
        let err = client
            .call(Endpoint::GetCourses, Some(Body::Json(Value::Null)))
            .await
            .unwrap_err();
        assert_eq!(err.status, 0);
        assert!(err.message.contains("encoding"));
        assert!(err.is_invalid_request());
        assert!(!err.is_network());
    }
}
