use lectern::client::multipart;
use lectern::session::AUTH_STORAGE_KEY;
use lectern::{ApiClient, ApiConfig, MemoryStorage, RequestOptions, SessionStore, Storage};
use rouille::{Request, Response};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Seen {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Local HTTP server recording every request it gets
struct TestServer {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start<F>(respond: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let seen: Arc<Mutex<Vec<Seen>>> = Default::default();
        let sink = seen.clone();
        let server = rouille::Server::new("127.0.0.1:0", move |request| {
            let mut body = Vec::new();
            if let Some(mut data) = request.data() {
                data.read_to_end(&mut body).unwrap();
            }
            sink.lock().unwrap().push(Seen {
                method: request.method().to_string(),
                url: request.raw_url().to_string(),
                headers: request
                    .headers()
                    .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                    .collect(),
                body,
            });
            respond(request)
        })
        .unwrap();
        let base_url = format!("http://{}/api", server.server_addr());
        let (handle, stop) = server.stoppable();
        TestServer {
            base_url,
            seen,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn last(&self) -> Seen {
        self.requests().pop().expect("no request recorded")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn client_for(base_url: &str, storage: &Arc<MemoryStorage>) -> ApiClient {
    let session = SessionStore::new(storage.clone());
    session.init();
    ApiClient::new(ApiConfig::new(base_url), session).unwrap()
}

#[tokio::test]
async fn test_anonymous_get() {
    let server = TestServer::start(|_| Response::json(&json!([{"id": 1, "title": "Rust"}])));
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let courses = client.get_courses().await.unwrap();
    assert_eq!(courses, json!([{"id": 1, "title": "Rust"}]));

    let req = server.last();
    assert_eq!(req.method, "GET");
    assert_eq!(req.url, "/api/courses");
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("authorization"), None);
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = TestServer::start(|_| Response::json(&json!({"enrolled": true})));
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set(AUTH_STORAGE_KEY, r#"{"name": "alice", "token": "abc123"}"#)
        .unwrap();
    let client = client_for(&server.base_url, &storage);

    let res = client.enroll_in_course("42").await.unwrap();
    assert_eq!(res["enrolled"], true);

    let req = server.last();
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/api/courses/enroll/42");
    assert_eq!(req.header("authorization"), Some("Bearer abc123"));
}

#[tokio::test]
async fn test_auth_header_overrides_caller() {
    let server = TestServer::start(|_| Response::json(&json!({})));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(AUTH_STORAGE_KEY, r#"{"token": "abc123"}"#).unwrap();
    let client = client_for(&server.base_url, &storage);

    let opts = RequestOptions::get()
        .header("Authorization", "Bearer forged")
        .header("X-Request-Source", "test");
    client.dispatch("/user/profile", opts).await.unwrap();

    let req = server.last();
    assert_eq!(req.header("authorization"), Some("Bearer abc123"));
    assert_eq!(req.header("x-request-source"), Some("test"));
}

#[tokio::test]
async fn test_session_lifecycle_drives_auth_header() {
    let server = TestServer::start(|request| match request.url().as_str() {
        "/api/login" => Response::json(&json!({"name": "alice", "token": "t-alice"})),
        _ => Response::json(&json!({"ok": true})),
    });
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));
    let creds = lectern::types::Credentials {
        mail: Some("alice@example.com".to_string()),
        name: None,
        password: "secret".to_string(),
    };

    let identity = client.login(&creds).await.unwrap();
    let login_req = server.last();
    assert_eq!(
        serde_json::from_slice::<Value>(&login_req.body).unwrap(),
        json!({"mail": "alice@example.com", "password": "secret"})
    );
    assert_eq!(login_req.header("authorization"), None);

    client.session().login(identity);
    client.get_profile().await.unwrap();
    assert_eq!(server.last().header("authorization"), Some("Bearer t-alice"));

    client.session().logout();
    client.get_profile().await.unwrap();
    assert_eq!(server.last().header("authorization"), None);
}

#[tokio::test]
async fn test_error_detail() {
    let server = TestServer::start(|_| {
        Response::json(&json!({"detail": "invalid token"})).with_status_code(401)
    });
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let err = client.get_profile().await.unwrap_err();
    assert_eq!(err.status, 401);
    assert_eq!(err.message, "invalid token");
    assert_eq!(err.data, json!({"detail": "invalid token"}));
}

#[tokio::test]
async fn test_error_message_field() {
    let server = TestServer::start(|_| {
        Response::json(&json!({"message": "course not found"})).with_status_code(404)
    });
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let err = client.get_course("999").await.unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "course not found");
}

#[tokio::test]
async fn test_error_unparsable_body() {
    let server =
        TestServer::start(|_| Response::text("<html>bad gateway</html>").with_status_code(502));
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let err = client.get_student_dashboard().await.unwrap_err();
    assert_eq!(err.status, 502);
    assert_eq!(err.message, lectern::error::FALLBACK_ERROR_MESSAGE);
    assert_eq!(err.data, json!({}));
}

#[tokio::test]
async fn test_network_failure() {
    // grab a free port, then close it so nothing is listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = client_for(
        &format!("http://127.0.0.1:{port}/api"),
        &Arc::new(MemoryStorage::new()),
    );

    let err = client.get_courses().await.unwrap_err();
    assert_eq!(err.status, 0);
    assert_eq!(err.message, lectern::error::NETWORK_ERROR_MESSAGE);
    assert!(err.data["originalError"].is_string());
}

#[tokio::test]
async fn test_success_body_not_json() {
    let server = TestServer::start(|_| Response::text("plain text"));
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let err = client.get_support_data().await.unwrap_err();
    assert_eq!(err.status, 0);
    assert!(err.is_network());
}

#[tokio::test]
async fn test_success_empty_body() {
    let server = TestServer::start(|_| Response::empty_204());
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    assert_eq!(client.logout().await.unwrap(), Value::Null);
    assert_eq!(server.last().url, "/api/auth/logout");
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = TestServer::start(|_| Response::json(&json!({"id": 7})));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(AUTH_STORAGE_KEY, r#"{"token": "abc123"}"#).unwrap();
    let client = client_for(&server.base_url, &storage);

    let form = multipart::Form::new()
        .text("title", "Ownership")
        .part(
            "video",
            multipart::Part::bytes(b"fake-video".to_vec()).file_name("intro.mp4"),
        );
    let res = client.create_teacher_lesson(form).await.unwrap();
    assert_eq!(res["id"], 7);

    let req = server.last();
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/api/teacher/lesson");
    let content_type = req.header("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(req.header("authorization"), Some("Bearer abc123"));
    let body = String::from_utf8_lossy(&req.body);
    assert!(body.contains("Ownership"));
    assert!(body.contains("intro.mp4"));
}

#[tokio::test]
async fn test_query_and_json_body() {
    let server = TestServer::start(|_| Response::json(&json!({"entries": []})));
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    client.get_leaderboard(None, Some(5)).await.unwrap();
    assert_eq!(server.last().url, "/api/leaderboard?limit=5");
    client.get_leaderboard(Some("rust"), None).await.unwrap();
    assert_eq!(server.last().url, "/api/leaderboard?course=rust&limit=50");

    client
        .update_user_settings(&json!({"theme": "dark"}))
        .await
        .unwrap();
    let req = server.last();
    assert_eq!(req.method, "PUT");
    assert_eq!(req.url, "/api/settings/update");
    assert_eq!(
        serde_json::from_slice::<Value>(&req.body).unwrap(),
        json!({"theme": "dark"})
    );
}

#[tokio::test]
async fn test_concurrent_calls() {
    let server = TestServer::start(|request| Response::json(&json!({"path": request.url()})));
    let client = client_for(&server.base_url, &Arc::new(MemoryStorage::new()));

    let (dashboard, recommendations, leaderboard) = tokio::join!(
        client.get_student_dashboard(),
        client.get_recommendations(),
        client.get_leaderboard(None, Some(5)),
    );
    assert_eq!(dashboard.unwrap()["path"], "/api/student/dashboard");
    assert_eq!(recommendations.unwrap()["path"], "/api/recommendations");
    assert_eq!(leaderboard.unwrap()["path"], "/api/leaderboard");
    assert_eq!(server.requests().len(), 3);
}
