use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (axum::Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (name, role) in [("alice", "member"), ("bob", "member"), ("root", "admin")] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, role) VALUES (?, ?, ?)",
            vec![name.into(), "password".into(), role.into()],
        ))
        .await
        .unwrap();
    }
    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (server::router(Arc::new(engine), db.clone()), db)
}

fn basic(user: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:password")))
}

fn request(method: &str, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn missing_credentials_are_rejected() {
    let (router, _db) = app().await;
    let req = Request::builder()
        .uri("/expenses")
        .body(Body::empty())
        .unwrap();
    let res = router.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (router, _db) = app().await;
    let req = Request::builder()
        .uri("/expenses")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("alice:nope")),
        )
        .body(Body::empty())
        .unwrap();
    let res = router.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn split_pay_and_settle_over_http() {
    let (router, _db) = app().await;

    let (status, created) = send(
        &router,
        request(
            "POST",
            "/expenses",
            "alice",
            Some(json!({
                "amount_minor": 10000,
                "category": "dinner",
                "date": "2026-03-01T20:00:00+01:00"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = created["id"].as_str().unwrap().to_string();

    let (status, split) = send(
        &router,
        request(
            "POST",
            "/split",
            "alice",
            Some(json!({
                "expense_id": expense_id,
                "group_id": "flat",
                "policy": { "kind": "equal" },
                "participants": ["alice", "bob"],
                "due_date": "2026-04-01T00:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(split["status"], "open");
    let shares = split["shares"].as_array().unwrap();
    assert_eq!(shares.len(), 2);
    let split_id = split["id"].as_str().unwrap().to_string();
    let share_of = |user: &str| {
        shares
            .iter()
            .find(|s| s["user_id"] == user)
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    };
    let alice_share = share_of("alice");
    let bob_share = share_of("bob");

    let (status, _) = send(
        &router,
        request(
            "POST",
            &format!("/share/{bob_share}/payment"),
            "bob",
            Some(json!({ "amount_minor": 6000 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, paid) = send(
        &router,
        request(
            "POST",
            &format!("/share/{bob_share}/payment"),
            "bob",
            Some(json!({
                "amount_minor": 5000,
                "paid_at": "2026-03-10T00:00:00Z",
                "idempotency_key": "bob-1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paid["share"]["status"], "paid");
    assert_eq!(paid["settlement"]["status"], "partially_settled");

    let (status, replay) = send(
        &router,
        request(
            "POST",
            &format!("/share/{bob_share}/payment"),
            "bob",
            Some(json!({
                "amount_minor": 5000,
                "paid_at": "2026-03-10T00:00:00Z",
                "idempotency_key": "bob-1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["replayed"], true);

    let (status, paid) = send(
        &router,
        request(
            "POST",
            &format!("/share/{alice_share}/payment"),
            "alice",
            Some(json!({ "amount_minor": 5000, "paid_at": "2026-03-11T00:00:00Z" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paid["settlement"]["status"], "settled");
    assert_eq!(paid["settlement"]["events"].as_array().unwrap().len(), 2);

    let (status, report) = send(
        &router,
        request("GET", &format!("/split/{split_id}/status"), "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "settled");
    assert!(report["events"].as_array().unwrap().is_empty());

    let (status, history) = send(
        &router,
        request("GET", "/score/bob/history", "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["current"], 5.0);
}

#[tokio::test]
async fn outsiders_cannot_read_a_split() {
    let (router, db) = app().await;
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "INSERT INTO users (username, password, role) VALUES ('carol', 'password', 'member')",
    ))
    .await
    .unwrap();

    let (_, created) = send(
        &router,
        request(
            "POST",
            "/expenses",
            "alice",
            Some(json!({
                "amount_minor": 900,
                "category": "taxi",
                "date": "2026-03-01T08:00:00Z"
            })),
        ),
    )
    .await;
    let (_, split) = send(
        &router,
        request(
            "POST",
            "/split",
            "alice",
            Some(json!({
                "expense_id": created["id"],
                "group_id": "trip",
                "policy": { "kind": "equal" },
                "participants": ["alice", "bob"],
                "due_date": "2026-04-01T00:00:00Z"
            })),
        ),
    )
    .await;
    let split_id = split["id"].as_str().unwrap();

    let (status, _) = send(
        &router,
        request("GET", &format!("/split/{split_id}"), "carol", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        request("GET", &format!("/split/{split_id}"), "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn score_endpoints() {
    let (router, _db) = app().await;

    let (status, history) = send(&router, request("GET", "/score/alice/history", "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(history["entries"].as_array().unwrap().is_empty());
    assert_eq!(history["current"], Value::Null);

    let (status, entry) = send(
        &router,
        request("POST", "/score/alice/initialize", "alice", None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["old_score"], 0.0);
    assert_eq!(entry["new_score"], 50.0);
    assert_eq!(entry["reason"], "Initial score setup");

    let (status, _) = send(
        &router,
        request("POST", "/score/alice/initialize", "alice", None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &router,
        request(
            "PUT",
            "/score/alice",
            "alice",
            Some(json!({ "new_score": 90.0, "reason": "self promotion" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        request(
            "PUT",
            "/score/alice",
            "root",
            Some(json!({ "new_score": 101.0, "reason": "typo" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, entry) = send(
        &router,
        request(
            "PUT",
            "/score/alice",
            "root",
            Some(json!({ "new_score": 70.0, "reason": "manual review" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["old_score"], 50.0);
    assert_eq!(entry["new_score"], 70.0);
}

#[tokio::test]
async fn status_read_reports_without_scoring() {
    let (router, _db) = app().await;
    let (_, created) = send(
        &router,
        request(
            "POST",
            "/expenses",
            "alice",
            Some(json!({
                "amount_minor": 4000,
                "category": "groceries",
                "date": "2026-03-02T10:00:00Z"
            })),
        ),
    )
    .await;
    let (_, split) = send(
        &router,
        request(
            "POST",
            "/split",
            "alice",
            Some(json!({
                "expense_id": created["id"],
                "group_id": "flat",
                "policy": { "kind": "equal" },
                "participants": ["alice", "bob"],
                "due_date": "2026-04-01T00:00:00Z"
            })),
        ),
    )
    .await;
    let split_id = split["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, report) = send(
            &router,
            request("GET", &format!("/split/{split_id}/status"), "bob", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["split_id"], split_id.as_str());
        assert_eq!(report["status"], "open");
        assert!(report["events"].as_array().unwrap().is_empty());
    }

    let (status, history) = send(
        &router,
        request("GET", "/score/bob/history", "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(history["current"].is_null());
    assert!(history["entries"].as_array().unwrap().is_empty());
}
