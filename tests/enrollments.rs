//! Tests for the GET /enrollments read surface.

use axum::{body::Body, http::Request};
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::*;

#[tokio::test]
async fn test_enrollments_requires_authentication() {
    let (state, _db) = create_test_app_state();
    let app = public_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/enrollments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_enrollments_lists_only_callers_rows() {
    let (state, _db) = create_test_app_state();
    let course_a;
    let course_b;
    {
        let conn = state.db.get().unwrap();
        course_a = create_test_course(&conn, "Course A", 10000.0).id;
        course_b = create_test_course(&conn, "Course B", 20000.0).id;
        queries::ensure_enrolled(&conn, "u1", &course_a).unwrap();
        queries::ensure_enrolled(&conn, "u1", &course_b).unwrap();
        queries::ensure_enrolled(&conn, "u2", &course_a).unwrap();
    }
    let app = public_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/enrollments")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["ok"], true);
    let enrollments = json["enrollments"].as_array().unwrap();
    assert_eq!(enrollments.len(), 2);
    assert!(enrollments.iter().all(|e| e["userId"] == "u1"));
    let course_ids: Vec<_> = enrollments
        .iter()
        .map(|e| e["courseId"].as_str().unwrap().to_string())
        .collect();
    assert!(course_ids.contains(&course_a));
    assert!(course_ids.contains(&course_b));
}

#[tokio::test]
async fn test_enrollments_empty_for_new_user() {
    let (state, _db) = create_test_app_state();
    let app = public_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/enrollments")
                .header("x-user-id", "nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["enrollments"].as_array().unwrap().len(), 0);
}
