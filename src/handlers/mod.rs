//! Operation Handlers (component C5, §4.4 of SPEC_FULL.md) — the bulk of
//! the dispatcher. Split the way the teacher splits its own `server.rs`
//! request-kind match arms into focused functions: one module per group of
//! related WOPI operations, plus the shared gate/JSON helpers every one of
//! them needs.

pub mod files;
pub mod folders;
pub mod locks;
pub mod misc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::access::{self, TokenBinding};
use crate::request::{classify_override, Operation};
use crate::response::WopiError;
use crate::state::AppState;
use crate::types::FileId;

/// Runs the Access Gate (C2) for a file-scoped operation, mapping its single
/// failure mode straight to `401 Invalid Token`.
pub(crate) fn gate(
    state: &AppState,
    token: &str,
    id: &FileId,
    write_required: bool,
) -> Result<TokenBinding, WopiError> {
    access::authorize(state.token_authority(), token, id, write_required)
        .map_err(|_| WopiError::InvalidToken)
}

/// Confirms a file exists, the way §4.4 prescribes: `storage.size(id) ==
/// -1` (here, `None`) means `404 File Unknown`.
pub(crate) fn require_exists(state: &AppState, id: &FileId) -> Result<(), WopiError> {
    state
        .storage()
        .size(id)?
        .ok_or(WopiError::FileUnknown)
        .map(|_| ())
}

/// Reads the `Host` header for building absolute URLs in JSON response
/// bodies (`PutRelativeFile`, `EnumerateChildren`). Falls back to a fixed
/// placeholder host when the header is absent, which only happens in
/// synthetic test requests.
pub(crate) fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

/// Characters a URL path segment must escape; leaves the RFC 3986
/// unreserved set (alphanumerics, `-`, `.`, `_`, `~`) untouched so a file
/// id like `doc.pdf` still reads as `doc.pdf` in the embedded URL.
const PATH_SEGMENT: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds the absolute URL WOPI embeds for a file, with a freshly minted
/// access token bound to it.
pub(crate) fn file_url(host: &str, id: &FileId, token: &str) -> String {
    format!(
        "http://{host}/wopi/files/{}?access_token={token}",
        percent_encoding::utf8_percent_encode(id.as_str(), PATH_SEGMENT),
    )
}

/// `POST /wopi/files/{id}` entry point: classifies the request via
/// `X-WOPI-Override` (§4.1) and dispatches to the matching sub-handler. An
/// unrecognized or missing override is a `500` per §4.1's table, distinct
/// from `ExecuteCobaltRequest`'s `501` (always-unsupported, a recognized but
/// unimplemented operation).
pub async fn dispatch_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let operation = classify_override(&headers);

    match operation {
        Operation::Lock { lock } => locks::lock(&state, &id, &uri, &lock).await,
        Operation::UnlockAndRelock { old_lock, new_lock } => {
            locks::unlock_and_relock(&state, &id, &uri, &old_lock, &new_lock).await
        }
        Operation::Unlock { lock } => locks::unlock(&state, &id, &uri, &lock).await,
        Operation::RefreshLock { lock } => locks::refresh_lock(&state, &id, &uri, &lock).await,
        Operation::GetLock => locks::get_lock(&state, &id, &uri).await,
        Operation::PutRelativeFile => {
            files::put_relative_file(State(state), Path(raw_id), uri, headers, body).await
        }
        Operation::DeleteFile => files::delete_file(State(state), Path(raw_id), uri)
            .await
            .map(IntoResponse::into_response),
        Operation::RenameFile => files::rename_file(State(state), Path(raw_id), uri, headers).await,
        Operation::ReadSecureStore => misc::read_secure_store(&state, &id, &uri, &headers).await,
        Operation::GetRestrictedLink => {
            misc::get_restricted_link(&state, &id, &uri, &headers).await
        }
        Operation::RevokeRestrictedLink => {
            misc::revoke_restricted_link(&state, &id, &uri, &headers).await
        }
        Operation::GetShareUrl => misc::get_share_url(&state, &id, &uri, &headers).await,
        Operation::PutUserInfo => {
            let body = String::from_utf8_lossy(&body).into_owned();
            misc::put_user_info(&state, &id, &uri, &body).await
        }
        Operation::AddActivities => misc::add_activities(&state, &id, &uri, &body).await,
        Operation::ExecuteCobaltRequest => misc::execute_cobalt_request().await,
        Operation::Unknown => Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
    }
}
