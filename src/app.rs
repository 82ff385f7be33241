//! Wires the URL grammar from §4.1 onto axum's `Router`, then layers the
//! proof-key check (C7) and the response-header stamping middleware (C6) on
//! top, the same way the teacher wires its own connection dispatch loop
//! ahead of request handling.

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::handlers::{dispatch_post, files, folders};
use crate::proof::verify_proof_key;
use crate::response::stamp_server_headers;
use crate::state::AppState;

/// Builds the complete router for a given [`AppState`]. Split out from
/// `main` so the integration test suite can build the same router against
/// an in-memory backend without touching a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/wopi/files/{id}",
            get(files::check_file_info).post(dispatch_post),
        )
        .route(
            "/wopi/files/{id}/contents",
            get(files::get_file).post(files::put_file),
        )
        .route("/wopi/files/{id}/ancestry", get(files::enumerate_ancestors))
        .route("/wopi/folders/{id}", get(folders::check_folder_info))
        .route(
            "/wopi/folders/{id}/children",
            get(folders::enumerate_children),
        )
        // `verify_proof_key` is layered first (innermost, closest to the
        // routes) and `stamp_server_headers` second (outermost) so that a
        // proof-key rejection's 500 still passes back out through the
        // header-stamping layer — every response carries
        // X-WOPI-ServerVersion/X-WOPI-MachineName, success or failure.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            verify_proof_key,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            stamp_server_headers,
        ))
        .with_state(state)
}
