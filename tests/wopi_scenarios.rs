//! End-to-end tests driving the axum `Router` in-process via
//! `tower::ServiceExt::oneshot`, the same "exercise the real router, no
//! socket" discipline the teacher's `test-vfs` crate and `examples/fs.rs`
//! use for driving `Vfs` implementations against real files.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use wopi_host::access::InMemoryTokenAuthority;
use wopi_host::app::build_router;
use wopi_host::proof::AllowAll;
use wopi_host::state::AppState;
use wopi_host::storage::mem::MemStorage;
use wopi_host::types::{FileId, Permission};

struct Harness {
    state: AppState,
    token: String,
}

fn harness() -> Harness {
    let storage = Arc::new(MemStorage::new("root"));
    storage.seed("doc.docx", b"hello world".to_vec());
    let authority = Arc::new(InMemoryTokenAuthority::new());
    let token = authority.mint("alice", &FileId::new("doc.docx"), Permission::Write);
    let state = AppState::new(storage, authority, Arc::new(AllowAll), "test-machine");
    Harness { state, token }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn scenario_lock_an_unlocked_file_succeeds() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/wopi/files/doc.docx?access_token={token}"))
                .header("X-WOPI-Override", "LOCK")
                .header("X-WOPI-Lock", "L1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-WOPI-ServerVersion").is_some());
    assert!(response.headers().get("X-WOPI-MachineName").is_some());
}

#[tokio::test]
async fn scenario_relocking_with_a_different_string_conflicts() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let lock = |lock: &'static str| {
        Request::builder()
            .method("POST")
            .uri(format!("/wopi/files/doc.docx?access_token={token}"))
            .header("X-WOPI-Override", "LOCK")
            .header("X-WOPI-Lock", lock)
            .body(Body::empty())
            .unwrap()
    };

    let first = router.clone().oneshot(lock("L1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.oneshot(lock("L2")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(second.headers().get("X-WOPI-Lock").unwrap(), "L1");
}

#[tokio::test]
async fn scenario_put_file_under_matching_lock_emits_item_version() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let lock_request = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/doc.docx?access_token={token}"))
        .header("X-WOPI-Override", "LOCK")
        .header("X-WOPI-Lock", "L1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        router.clone().oneshot(lock_request).await.unwrap().status(),
        StatusCode::OK
    );

    let put_request = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/doc.docx/contents?access_token={token}"))
        .header("X-WOPI-Lock", "L1")
        .body(Body::from("new contents"))
        .unwrap();
    let response = router.oneshot(put_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-WOPI-ItemVersion").is_some());
}

#[tokio::test]
async fn scenario_unlock_then_get_lock_reports_empty() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let lock_request = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/doc.docx?access_token={token}"))
        .header("X-WOPI-Override", "LOCK")
        .header("X-WOPI-Lock", "L1")
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(lock_request).await.unwrap();

    let unlock_request = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/doc.docx?access_token={token}"))
        .header("X-WOPI-Override", "UNLOCK")
        .header("X-WOPI-Lock", "L1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(
        router
            .clone()
            .oneshot(unlock_request)
            .await
            .unwrap()
            .status(),
        StatusCode::OK
    );

    let get_lock_request = Request::builder()
        .method("POST")
        .uri(format!("/wopi/files/doc.docx?access_token={token}"))
        .header("X-WOPI-Override", "GET_LOCK")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(get_lock_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-WOPI-Lock").unwrap(), "");
}

#[tokio::test]
async fn scenario_token_bound_to_a_different_file_is_rejected() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/wopi/files/missing.docx?access_token={token}"))
                .header("X-WOPI-Override", "GET_LOCK")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // A token minted for doc.docx does not bind to missing.docx, so the
    // access gate itself rejects the request before storage is consulted.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scenario_put_relative_with_extension_suggestion() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/wopi/files/doc.docx?access_token={token}"))
                .header("X-WOPI-Override", "PUT_RELATIVE")
                .header("X-WOPI-SuggestedTarget", ".pdf")
                .body(Body::from(b"pdf bytes".to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["Name"], "doc.pdf");
    assert!(json["Url"].as_str().unwrap().contains("access_token="));
}

#[tokio::test]
async fn check_file_info_reports_size_and_read_only() {
    let Harness { state, token } = harness();
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/wopi/files/doc.docx?access_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["BaseFileName"], "doc.docx");
    assert_eq!(json["Size"], 11);
    assert_eq!(json["ReadOnly"], false);
}

#[tokio::test]
async fn a_read_only_token_cannot_lock() {
    let storage = Arc::new(MemStorage::new("root"));
    storage.seed("doc.docx", b"hello".to_vec());
    let authority = Arc::new(InMemoryTokenAuthority::new());
    let token = authority.mint("bob", &FileId::new("doc.docx"), Permission::Read);
    let state = AppState::new(storage, authority, Arc::new(AllowAll), "test-machine");
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/wopi/files/doc.docx?access_token={token}"))
                .header("X-WOPI-Override", "LOCK")
                .header("X-WOPI-Lock", "L1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
