/*!
Interoperation between clients and the server: the HTTP surface over the
store.

Every response body carries the `{success, message?, data?, errors?}`
envelope. Validation failures and uniqueness conflicts come back as 400
with enough detail to fix the input; missing records are 404; anything
unexpected is a 500 whose detail goes to the log, not the caller.
*/
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::store::{Store, StoreError};
use crate::student::{RegisterStudent, Student, StudentOut, UpdateStudent};
use crate::validate::validate_candidate;

/**
This guy hauls around the process-wide long-lived state and gets passed
in an `axum::Extension` to the handlers who need him.
*/
#[derive(Debug)]
pub struct Glob {
    pub store: Store,
    /// Page size used when `?limit=` is absent.
    pub default_page_limit: u64,
}

impl Glob {
    pub fn new(default_page_limit: u64) -> Self {
        Self {
            store: Store::new(),
            default_page_limit,
        }
    }
}

pub fn router(glob: Arc<Glob>) -> Router {
    Router::new()
        .route("/students/register", post(register))
        .route("/students", get(list_students))
        .route("/students/stats/summary", get(stats_summary))
        .route("/students/roll/:roll_no", get(get_by_roll))
        .route("/students/page/:page", get(page))
        .route(
            "/students/:id",
            get(get_by_id).put(update_student).delete(delete_student),
        )
        .layer(Extension(glob))
}

fn respond_message(code: StatusCode, msg: &str) -> Response {
    (
        code,
        Json(json!({
            "success": false,
            "message": msg,
        })),
    ).into_response()
}

/// Map a store failure onto the envelope. Internal detail is logged here
/// and replaced by `cover_message` on the wire.
fn respond_store_error(e: StoreError, cover_message: &str) -> Response {
    match e {
        StoreError::Conflict(field) => respond_message(
            StatusCode::BAD_REQUEST,
            &format!("{} already exists", field),
        ),
        StoreError::NotFound => respond_message(
            StatusCode::NOT_FOUND,
            "Student not found",
        ),
        StoreError::Internal(detail) => {
            log::error!("store error: {}", &detail);
            respond_message(StatusCode::INTERNAL_SERVER_ERROR, cover_message)
        },
    }
}

async fn register(
    Extension(glob): Extension<Arc<Glob>>,
    Json(candidate): Json<RegisterStudent>,
) -> Response {
    log::trace!("register( {:?} ) called.", &candidate.roll_no);

    let validation_errors = validate_candidate(&candidate);
    if !validation_errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Validation failed",
                "errors": validation_errors,
            })),
        ).into_response();
    }

    if let Some(field) = glob.store
        .find_conflict(&candidate.roll_no, &candidate.email)
        .await
    {
        return respond_message(
            StatusCode::BAD_REQUEST,
            &format!("{} already exists", field),
        );
    }

    let student = Student::create(candidate, OffsetDateTime::now_utc());
    let registration_date = match student.registration_date.format(&Rfc3339) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Error formatting registration date: {}", &e);
            return respond_message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error registering student",
            );
        },
    };
    let summary = json!({
        "id": student.id,
        "rollNo": &student.roll_no,
        "name": student.display_name(),
        "registrationDate": registration_date,
    });

    // A lost race against a concurrent registration surfaces here as the
    // same conflict kind the pre-check reports.
    if let Err(e) = glob.store.insert(student).await {
        return respond_store_error(e, "Error registering student");
    }

    log::info!("Student registered: {}", summary["rollNo"]);

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Student registered successfully",
            "data": summary,
        })),
    ).into_response()
}

async fn list_students(Extension(glob): Extension<Arc<Glob>>) -> Response {
    log::trace!("list_students() called.");

    let students = glob.store.all_sorted().await;

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": students.len(),
            "data": students,
        })),
    ).into_response()
}

async fn get_by_id(
    Extension(glob): Extension<Arc<Glob>>,
    Path(id): Path<Uuid>,
) -> Response {
    log::trace!("get_by_id( {} ) called.", &id);

    match glob.store.get(id).await {
        Ok(student) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": StudentOut::from(&student),
            })),
        ).into_response(),
        Err(e) => respond_store_error(e, "Error fetching student"),
    }
}

async fn get_by_roll(
    Extension(glob): Extension<Arc<Glob>>,
    Path(roll_no): Path<String>,
) -> Response {
    log::trace!("get_by_roll( {:?} ) called.", &roll_no);

    match glob.store.get_by_roll(&roll_no).await {
        Ok(student) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": StudentOut::from(&student),
            })),
        ).into_response(),
        Err(e) => respond_store_error(e, "Error fetching student"),
    }
}

async fn update_student(
    Extension(glob): Extension<Arc<Glob>>,
    Path(id): Path<Uuid>,
    Json(upd): Json<UpdateStudent>,
) -> Response {
    log::trace!("update_student( {} ) called.", &id);

    let mut student = match glob.store.get(id).await {
        Ok(s) => s,
        Err(e) => { return respond_store_error(e, "Error updating student"); },
    };

    student.apply(upd);

    let validation_errors = validate_candidate(&student.as_candidate());
    if !validation_errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Validation failed",
                "errors": validation_errors,
            })),
        ).into_response();
    }

    let out = StudentOut::from(&student);
    if let Err(e) = glob.store.replace(student).await {
        return respond_store_error(e, "Error updating student");
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Student updated successfully",
            "data": out,
        })),
    ).into_response()
}

async fn delete_student(
    Extension(glob): Extension<Arc<Glob>>,
    Path(id): Path<Uuid>,
) -> Response {
    log::trace!("delete_student( {} ) called.", &id);

    match glob.store.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Student deleted successfully",
            })),
        ).into_response(),
        Err(e) => respond_store_error(e, "Error deleting student"),
    }
}

async fn stats_summary(Extension(glob): Extension<Arc<Glob>>) -> Response {
    log::trace!("stats_summary() called.");

    let summary = glob.store.stats(OffsetDateTime::now_utc()).await;

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": summary,
        })),
    ).into_response()
}

#[derive(Debug, Deserialize)]
struct PageParams {
    limit: Option<u64>,
}

async fn page(
    Extension(glob): Extension<Arc<Glob>>,
    Path(page): Path<u64>,
    Query(params): Query<PageParams>,
) -> Response {
    log::trace!("page( {}, {:?} ) called.", &page, &params);

    let page = page.max(1);
    let limit = params.limit
        .unwrap_or(glob.default_page_limit)
        .max(1);

    let (students, total, pages) = glob.store.page(page, limit).await;

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "page": page,
            "limit": limit,
            "total": total,
            "pages": pages,
            "data": students,
        })),
    ).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::student::tests::candidate;
    use crate::tests::ensure_logging;

    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(Arc::new(Glob::new(10)))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let req = match body {
            Some(v) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let code = res.status();
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        let val: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (code, val)
    }

    fn register_body(roll: &str, email: &str) -> Value {
        serde_json::to_value(candidate(roll, email)).unwrap()
    }

    #[tokio::test]
    async fn register_fetch_conflict_delete_scenario() {
        ensure_logging();
        let app = test_router();

        let (code, body) = send(
            &app, "POST", "/students/register",
            Some(register_body("R1", "a@x.com")),
        ).await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["rollNo"], "R1");
        assert_eq!(body["data"]["name"], "Rifat Bhuiyan");
        let id = body["data"]["id"].as_str().unwrap().to_owned();

        // Same roll number, different email: conflict names the roll.
        let (code, body) = send(
            &app, "POST", "/students/register",
            Some(register_body("R1", "b@x.com")),
        ).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "roll number already exists");

        // Different roll, same email.
        let (code, body) = send(
            &app, "POST", "/students/register",
            Some(register_body("R2", "a@x.com")),
        ).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "email already exists");

        let (code, body) = send(
            &app, "GET", &format!("/students/{}", id), None,
        ).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["rollNo"], "R1");
        assert_eq!(body["data"]["email"], "a@x.com");
        assert!(body["data"].get("password").is_none());

        let (code, body) = send(
            &app, "DELETE", &format!("/students/{}", id), None,
        ).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["message"], "Student deleted successfully");

        let (code, _) = send(
            &app, "GET", &format!("/students/{}", id), None,
        ).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_without_mandatory_qualification_rejected() {
        ensure_logging();
        let app = test_router();

        let mut body = register_body("R1", "a@x.com");
        body["academicQualifications"][0]["examType"] = "H.S.C.".into();
        let (code, body) = send(
            &app, "POST", "/students/register", Some(body),
        ).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.iter().any(
            |e| e == "S.S.C. qualification is mandatory"
        ));
    }

    #[tokio::test]
    async fn validation_lists_every_failure() {
        ensure_logging();
        let app = test_router();

        let mut body = register_body("", "a@x.com");
        body["password"] = "".into();
        body["academicQualifications"] = json!([]);
        let (code, body) = send(
            &app, "POST", "/students/register", Some(body),
        ).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn list_excludes_password_and_sorts() {
        ensure_logging();
        let app = test_router();

        for (roll, email) in [("R1", "a@x.com"), ("R2", "b@x.com")] {
            let (code, _) = send(
                &app, "POST", "/students/register",
                Some(register_body(roll, email)),
            ).await;
            assert_eq!(code, StatusCode::CREATED);
        }

        let (code, body) = send(&app, "GET", "/students", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["count"], 2);
        for rec in body["data"].as_array().unwrap() {
            assert!(rec.get("password").is_none());
        }
    }

    #[tokio::test]
    async fn get_by_roll_round_trip() {
        ensure_logging();
        let app = test_router();

        send(
            &app, "POST", "/students/register",
            Some(register_body("R7", "r7@x.com")),
        ).await;

        let (code, body) = send(&app, "GET", "/students/roll/R7", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["rollNo"], "R7");
        assert!(body["data"].get("password").is_none());

        let (code, _) = send(&app, "GET", "/students/roll/R8", None).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_strips_password_and_revalidates() {
        ensure_logging();
        let app = test_router();

        let (_, body) = send(
            &app, "POST", "/students/register",
            Some(register_body("R1", "a@x.com")),
        ).await;
        let id = body["data"]["id"].as_str().unwrap().to_owned();

        let (code, body) = send(
            &app, "PUT", &format!("/students/{}", id),
            Some(json!({ "city": "Khulna", "password": "sneaky" })),
        ).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["city"], "Khulna");
        assert!(body["data"].get("password").is_none());

        // Updating away the mandatory qualification is a validation error.
        let (code, body) = send(
            &app, "PUT", &format!("/students/{}", id),
            Some(json!({ "academicQualifications": [] })),
        ).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");

        let (code, _) = send(
            &app, "PUT", &format!("/students/{}", Uuid::new_v4()),
            Some(json!({ "city": "Khulna" })),
        ).await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_and_pagination_endpoints() {
        ensure_logging();
        let app = test_router();

        for n in 0..25 {
            let mut body = register_body(
                &format!("R{:02}", n),
                &format!("s{}@x.com", n),
            );
            body["course"] = if n < 2 { "A".into() } else { "B".into() };
            let (code, _) = send(
                &app, "POST", "/students/register", Some(body),
            ).await;
            assert_eq!(code, StatusCode::CREATED);
        }

        let (code, body) = send(
            &app, "GET", "/students/stats/summary", None,
        ).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["totalStudents"], 25);
        assert_eq!(body["data"]["recentRegistrations"], 25);
        assert_eq!(body["data"]["courseStats"][0]["_id"], "B");
        assert_eq!(body["data"]["courseStats"][0]["count"], 23);

        let (code, body) = send(
            &app, "GET", "/students/page/3?limit=10", None,
        ).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["page"], 3);
        assert_eq!(body["total"], 25);
        assert_eq!(body["pages"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
    }
}
