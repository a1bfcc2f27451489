//! End-to-end tests for the REST surface, driven through the router

mod common;

use axum::http::{header, StatusCode};
use chrono::{Duration, Utc};
use common::*;
use feedback_portal::{
    types::{new_id, Ratings},
    Feedback, Sentiment, StorageBackend,
};
use serde_json::{json, Value};

async fn login_token(portal: &TestPortal, body: Value) -> String {
    let response = post_json(&portal.router, "/api/login", body).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    response.json()["token"].as_str().unwrap().to_string()
}

async fn submit(portal: &TestPortal, comment: &str) -> Value {
    let response = post_json(
        &portal.router,
        "/api/feedback",
        json!({
            "studentId": portal.student.id,
            "facultyId": portal.faculty.id,
            "ratings": {"communication": 5, "clarity": 4},
            "comment": comment,
            "semester": 5,
            "subjectName": "Database Systems",
            "subjectCode": "CS501"
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    response.json()
}

#[tokio::test]
async fn test_health_reports_storage() {
    let portal = create_test_portal().await;
    let response = get(&portal.router, "/api/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true, "db": true}));
}

#[tokio::test]
async fn test_student_login_by_usn_and_email_match() {
    let portal = create_test_portal().await;

    let by_usn = post_json(
        &portal.router,
        "/api/login",
        json!({"role": "student", "usn": "4SC21CS001", "password": STUDENT_PASSWORD}),
    )
    .await
    .json();
    let by_email = post_json(
        &portal.router,
        "/api/login",
        json!({"role": "student", "email": "mourya@student.scem", "password": STUDENT_PASSWORD}),
    )
    .await
    .json();

    assert!(by_usn["token"].is_string());
    assert_eq!(by_usn["user"], by_email["user"]);
    assert_eq!(by_usn["user"]["id"], json!(portal.student.id));
    assert_eq!(by_usn["user"]["role"], "student");
    assert!(by_usn["user"].get("password").is_none());
    assert!(by_usn["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let portal = create_test_portal().await;
    let router = &portal.router;

    let wrong = post_json(
        router,
        "/api/login",
        json!({"role": "student", "usn": "4SC21CS001", "password": "nope"}),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["error"], "Invalid credentials");
    assert_eq!(wrong.json()["success"], false);

    let unknown = post_json(
        router,
        "/api/login",
        json!({"role": "faculty", "email": "ghost@scem.ac.in", "password": "x"}),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json()["error"], "Invalid credentials");

    let cases = [
        (json!({"usn": "4SC21CS001", "password": "x"}), "Missing password/role"),
        (json!({"role": "student", "usn": "4SC21CS001"}), "Missing password/role"),
        (json!({"role": "student", "password": "x"}), "Provide email or usn"),
        (json!({"role": "faculty", "usn": "4SC21CS001", "password": "x"}), "Faculty login requires email"),
        (json!({"role": "admin", "email": "a@b", "password": "x"}), "Unknown role: admin"),
    ];
    for (body, message) in cases {
        let response = post_json(router, "/api/login", body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["error"], message);
    }
}

#[tokio::test]
async fn test_session_resolves_bearer_token() {
    let portal = create_test_portal().await;
    let token = login_token(
        &portal,
        json!({"role": "faculty", "email": "vidya@scem.ac.in", "password": FACULTY_PASSWORD}),
    )
    .await;

    let response = get_with_token(&portal.router, "/api/session", &token).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["user"]["role"], "faculty");
    assert_eq!(body["user"]["name"], "Vidya VV");
    assert!(body["expiresAt"].is_string());

    let missing = get(&portal.router, "/api/session").await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let forged = get_with_token(&portal.router, "/api/session", "not.a.token").await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submission_appears_for_faculty() {
    let portal = create_test_portal().await;

    let body = submit(&portal, "Great teaching").await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Feedback submitted successfully!");
    let feedback = &body["feedback"];
    assert_eq!(feedback["sentiment"], "positive");
    assert_eq!(feedback["sentimentAnalyzed"], false);
    assert_eq!(feedback["comment"], "Great teaching");
    assert_eq!(feedback["semester"], "5");
    assert_eq!(feedback["subjectCode"], "CS501");
    assert!(feedback.get("reply").is_none());
    assert!(feedback.get("repliedAt").is_none());

    for uri in [
        format!("/api/faculty/{}/feedback", portal.faculty.id),
        format!("/api/feedback/{}", portal.faculty.id),
    ] {
        let listing = get(&portal.router, &uri).await.json();
        let items = listing.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["comment"], "Great teaching");
        assert_eq!(items[0]["student"]["usn"], "4SC21CS001");
        assert_eq!(items[0]["student"]["name"], "Mourya");
        assert_eq!(items[0]["student"]["semester"], 5);
        assert_eq!(items[0]["faculty"]["email"], "vidya@scem.ac.in");
    }

    let mine = get(
        &portal.router,
        &format!("/api/students/{}/feedback", portal.student.id),
    )
    .await
    .json();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_submission_validation() {
    let portal = create_test_portal().await;

    let missing = post_json(
        &portal.router,
        "/api/feedback",
        json!({"studentId": portal.student.id, "comment": "hi"}),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        missing.json(),
        json!({"success": false, "error": "Missing required fields: studentId or facultyId"})
    );

    let malformed = post_raw(&portal.router, "/api/feedback", "{ not json".to_string()).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.json()["success"], false);

    let orphan = post_json(
        &portal.router,
        "/api/feedback",
        json!({"studentId": portal.student.id, "facultyId": "no-such-faculty"}),
    )
    .await;
    assert_eq!(orphan.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_reply_workflow() {
    let portal = create_test_portal().await;
    let id = submit(&portal, "Please share slides").await["feedback"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/feedback/{}/reply", id);

    let empty = post_json(&portal.router, &uri, json!({"reply": "   "})).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.json()["error"], "Reply message is required");
    let stored = portal.storage.get_feedback(&id).await.unwrap().unwrap();
    assert!(stored.feedback.reply.is_none());

    let replied = post_json(&portal.router, &uri, json!({"reply": "Uploaded to the portal"})).await;
    assert_eq!(replied.status, StatusCode::OK);
    let body = replied.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Reply sent successfully!");
    assert_eq!(body["feedback"]["reply"], "Uploaded to the portal");
    assert!(body["feedback"]["repliedAt"].is_string());

    let again = post_json(&portal.router, &uri, json!({"reply": "Again"})).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let unknown = post_json(
        &portal.router,
        "/api/feedback/does-not-exist/reply",
        json!({"reply": "Hello"}),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let listing = get(&portal.router, &format!("/api/faculty/{}/feedback", portal.faculty.id))
        .await
        .json();
    assert_eq!(listing[0]["reply"], "Uploaded to the portal");
}

#[tokio::test]
async fn test_stats_with_no_recent_feedback() {
    let portal = create_test_portal().await;

    let response = get(&portal.router, "/api/feedback/stats?days=0").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "period": "Last 0 days",
            "statistics": {
                "totalFeedback": 0,
                "activeFaculties": 0,
                "activeStudents": 0,
                "averageFeedbackPerFaculty": 0.0
            }
        })
    );
}

#[tokio::test]
async fn test_windowed_dashboard_queries() {
    let portal = create_test_portal().await;
    submit(&portal, "first").await;
    submit(&portal, "second").await;

    // An old record outside the default window
    let old = Feedback {
        id: new_id(),
        student_id: portal.student.id.clone(),
        faculty_id: portal.faculty.id.clone(),
        ratings: Ratings::default(),
        comment: "last term".to_string(),
        sentiment: Sentiment::Neutral,
        sentiment_analyzed: false,
        semester: None,
        subject_id: None,
        subject_name: None,
        subject_code: None,
        created_at: Utc::now() - Duration::days(30),
        reply: None,
    };
    portal.storage.insert_feedback(&old).await.unwrap();

    let stats = get(&portal.router, "/api/feedback/stats").await.json();
    assert_eq!(stats["period"], "Last 7 days");
    assert_eq!(stats["statistics"]["totalFeedback"], 2);
    assert_eq!(stats["statistics"]["activeFaculties"], 1);
    assert_eq!(stats["statistics"]["averageFeedbackPerFaculty"], 2.0);

    let stats = get(&portal.router, "/api/feedback/stats?days=bogus").await.json();
    assert_eq!(stats["period"], "Last 7 days");

    let recent = get(&portal.router, "/api/feedback/recent?days=60&limit=2").await.json();
    assert_eq!(recent["success"], true);
    assert_eq!(recent["count"], 2);
    assert_eq!(recent["data"][0]["comment"], "second");
    assert_eq!(recent["data"][1]["comment"], "first");

    let count = get(&portal.router, "/api/feedback/count?days=60").await.json();
    assert_eq!(count, json!({"success": true, "count": 3}));

    let today = get(&portal.router, "/api/feedback/today").await.json();
    assert_eq!(today["success"], true);
    assert_eq!(today["count"], 2);
    let date = today["date"].as_str().unwrap();
    assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
}

#[tokio::test]
async fn test_faculty_summary_filters() {
    let portal = create_test_portal().await;
    submit(&portal, "Excellent examples").await;
    submit(&portal, "Too fast in class").await;

    let uri = format!("/api/faculty/{}/summary", portal.faculty.id);
    let all = get(&portal.router, &uri).await.json();
    assert_eq!(all["success"], true);
    assert_eq!(all["count"], 2);
    assert_eq!(all["statistics"]["totalFeedbacks"], 2);
    assert_eq!(all["statistics"]["uniqueStudents"], 1);
    assert_eq!(all["statistics"]["averageRating"], 4.5);
    assert_eq!(all["statistics"]["sentimentCounts"]["positive"], 2);
    assert_eq!(all["statistics"]["sentimentCounts"]["negative"], 0);
    assert_eq!(all["statistics"]["recentFeedbacks"], 2);

    let searched = get(&portal.router, &format!("{}?search=TOO%20FAST&period=today", uri))
        .await
        .json();
    assert_eq!(searched["count"], 1);
    assert_eq!(searched["data"][0]["comment"], "Too fast in class");

    let negative = get(&portal.router, &format!("{}?sentiment=negative", uri)).await.json();
    assert_eq!(negative["count"], 0);
    assert_eq!(negative["statistics"]["averageRating"], 0.0);

    let bad = get(&portal.router, &format!("{}?period=decade", uri)).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_directory_endpoints() {
    let portal = create_test_portal().await;

    let faculty = get(&portal.router, "/api/faculty").await.json();
    assert_eq!(
        faculty,
        json!([{
            "id": portal.faculty.id,
            "name": "Vidya VV",
            "email": "vidya@scem.ac.in",
            "branch": "CS"
        }])
    );

    let count = get(&portal.router, "/api/students/count").await.json();
    assert_eq!(count, json!({"count": 1}));
}

#[tokio::test]
async fn test_typed_bracket_suffix_is_not_parsed_as_metadata() {
    let portal = create_test_portal().await;
    let comment = "Revise unit 2 [Semester: 3, Subject: OS (CS302)]";

    let response = post_json(
        &portal.router,
        "/api/feedback",
        json!({
            "studentId": portal.student.id,
            "facultyId": portal.faculty.id,
            "comment": comment
        }),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let feedback = &response.json()["feedback"];
    assert_eq!(feedback["comment"], comment);
    assert!(feedback.get("semester").is_none());

    let uri = format!("/api/faculty/{}/feedback", portal.faculty.id);
    let listing = get(&portal.router, &uri).await.json();
    assert_eq!(listing[0]["comment"], comment);
    assert!(listing[0].get("subjectCode").is_none());
}

#[tokio::test]
async fn test_partial_ratings_are_accepted() {
    let portal = create_test_portal().await;

    for clarity in [Value::Null, json!("5")] {
        let response = post_json(
            &portal.router,
            "/api/feedback",
            json!({
                "studentId": portal.student.id,
                "facultyId": portal.faculty.id,
                "ratings": {"communication": 5, "clarity": clarity.clone()},
                "comment": "Partial"
            }),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        assert_eq!(response.json()["feedback"]["ratings"]["clarity"], clarity);
    }

    let uri = format!("/api/faculty/{}/summary", portal.faculty.id);
    let summary = get(&portal.router, &uri).await;
    assert_eq!(summary.status, StatusCode::OK, "{}", summary.text());
    assert_eq!(summary.json()["statistics"]["averageRating"], 5.0);
}

#[tokio::test]
async fn test_export_csv() {
    let portal = create_test_portal().await;
    submit(&portal, "Line one\nline \"two\"").await;

    let response = get(&portal.router, "/api/export/feedback").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=feedback_report.csv"
    );

    let text = response.text();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with("\"Student Name\",\"USN\""));

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 11);
    assert_eq!(&headers[10], "Submitted At");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "Mourya");
    assert_eq!(&rows[0][1], "4SC21CS001");
    assert_eq!(&rows[0][5], "Vidya VV");
    assert_eq!(
        &rows[0][8],
        "Line one line \"two\" [Semester: 5, Subject: Database Systems (CS501)]"
    );
    assert_eq!(&rows[0][9], "positive");
    assert!(rows[0][10].ends_with('Z'));
}
