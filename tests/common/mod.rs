//! Common test utilities and helpers

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use feedback_portal::{
    api::{build_router, AppState},
    services::auth::hash_password,
    types::new_id,
    Faculty, LibsqlStorage, StorageBackend, Student,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const STUDENT_PASSWORD: &str = "student123";
pub const FACULTY_PASSWORD: &str = "vidya123";
pub const SIGNING_SECRET: &[u8] = b"integration-test-secret";

/// A migrated database with one student and one faculty member, and a router over it
pub struct TestPortal {
    _dir: TempDir,
    pub storage: Arc<LibsqlStorage>,
    pub router: Router,
    pub student: Student,
    pub faculty: Faculty,
}

/// Create a temp-file LibSQL storage; `:memory:` is private to one connection
pub async fn create_test_storage() -> (TempDir, Arc<LibsqlStorage>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("portal.db");
    let storage = LibsqlStorage::open_local(path.to_str().expect("utf-8 path"))
        .await
        .expect("Failed to create test storage");
    (dir, Arc::new(storage))
}

pub async fn create_test_portal() -> TestPortal {
    let (dir, storage) = create_test_storage().await;

    let student = Student {
        id: new_id(),
        usn: "4SC21CS001".to_string(),
        name: "Mourya".to_string(),
        email: "mourya@student.scem".to_string(),
        password_hash: hash_password(STUDENT_PASSWORD).expect("hash"),
        semester: 5,
        branch: "CS".to_string(),
    };
    let faculty = Faculty {
        id: new_id(),
        name: "Vidya VV".to_string(),
        email: "vidya@scem.ac.in".to_string(),
        password_hash: hash_password(FACULTY_PASSWORD).expect("hash"),
        branch: "CS".to_string(),
    };
    storage.insert_student(&student).await.expect("insert student");
    storage.insert_faculty(&faculty).await.expect("insert faculty");

    let router = build_router(AppState::new(storage.clone(), SIGNING_SECRET));

    TestPortal {
        _dir: dir,
        storage,
        router,
        student,
        faculty,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_with_token(router: &Router, uri: &str, token: &str) -> TestResponse {
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> TestResponse {
    post_raw(router, uri, body.to_string()).await
}

pub async fn post_raw(router: &Router, uri: &str, body: String) -> TestResponse {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}
