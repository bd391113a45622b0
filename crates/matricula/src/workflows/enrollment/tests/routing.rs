use super::common::*;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn enroll_request(section: &str, student: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/sections/{section}/enrollments"))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "student_id": student })).expect("serialize"),
        ))
        .expect("request")
}

#[tokio::test]
async fn open_section_returns_created() {
    let router = router_with_section(1);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/sections")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "section_id": "MATH-201-B", "seats": 30 }))
                        .expect("serialize"),
                ))
                .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(payload.get("seats").and_then(Value::as_u64), Some(30));
}

#[tokio::test]
async fn enroll_reports_resulting_status() {
    let router = router_with_section(1);

    let response = router
        .clone()
        .oneshot(enroll_request("CS-101-A", "s-001"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(
        payload.get("status").and_then(Value::as_str),
        Some("enrolled")
    );

    let response = router
        .clone()
        .oneshot(enroll_request("CS-101-A", "s-002"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json(response).await;
    assert_eq!(
        payload.get("status").and_then(Value::as_str),
        Some("waitlisted")
    );
}

#[tokio::test]
async fn duplicate_enrollment_maps_to_conflict() {
    let router = router_with_section(2);

    let response = router
        .clone()
        .oneshot(enroll_request("CS-101-A", "s-001"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(enroll_request("CS-101-A", "s-001"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_section_maps_to_not_found() {
    let router = router_with_section(1);

    let response = router
        .oneshot(enroll_request("GHOST-1", "s-001"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_student_id_maps_to_unprocessable() {
    let router = router_with_section(1);

    let response = router
        .oneshot(enroll_request("CS-101-A", "   "))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cancellation_reports_the_promotion() {
    let router = router_with_section(1);

    for student in ["s-001", "s-002"] {
        let response = router
            .clone()
            .oneshot(enroll_request("CS-101-A", student))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/sections/CS-101-A/enrollments/s-001")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(
        payload
            .pointer("/cancelled/status")
            .and_then(Value::as_str),
        Some("cancelled")
    );
    assert_eq!(
        payload
            .pointer("/promoted/student_id")
            .and_then(Value::as_str),
        Some("s-002")
    );

    // A second cancellation finds no active row.
    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/sections/CS-101-A/enrollments/s-001")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resize_reports_promotions_and_roster_orders_the_waitlist() {
    let router = router_with_section(1);

    for student in ["s-001", "s-002", "s-003"] {
        let response = router
            .clone()
            .oneshot(enroll_request("CS-101-A", student))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/sections/CS-101-A/roster")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let waitlist = payload
        .get("waitlist")
        .and_then(Value::as_array)
        .expect("waitlist array");
    assert_eq!(waitlist.len(), 2);
    assert_eq!(
        waitlist[0].get("student_id").and_then(Value::as_str),
        Some("s-002")
    );

    let response = router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/sections/CS-101-A/seats")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "seats": 2 })).expect("serialize"),
                ))
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let promoted = payload
        .get("promoted")
        .and_then(Value::as_array)
        .expect("promoted array");
    assert_eq!(promoted.len(), 1);
    assert_eq!(
        promoted[0].get("student_id").and_then(Value::as_str),
        Some("s-002")
    );
}

#[tokio::test]
async fn status_read_returns_the_active_row_or_not_found() {
    let router = router_with_section(1);

    let response = router
        .clone()
        .oneshot(enroll_request("CS-101-A", "s-001"))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/sections/CS-101-A/enrollments/s-001")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(
        payload.get("status").and_then(Value::as_str),
        Some("enrolled")
    );

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/sections/CS-101-A/enrollments/s-404")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
