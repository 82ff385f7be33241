//! `Lock`, `UnlockAndRelock`, `Unlock`, `RefreshLock` and `GetLock` — the
//! lock state machine operations of §4.3, dispatched from the `POST
//! /wopi/files/{id}` route in [`crate::app`] after
//! [`crate::request::classify_override`] has classified the request.

use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use time::OffsetDateTime;

use super::{gate, require_exists};
use crate::lock::LockOutcome;
use crate::request::extract_access_token;
use crate::response::{WopiError, HEADER_ITEM_VERSION, HEADER_LOCK, HEADER_LOCK_FAILURE_REASON, HEADER_OLD_LOCK};
use crate::state::AppState;
use crate::types::FileId;

fn outcome_into_response(outcome: LockOutcome, emit_item_version: bool, state: &AppState, id: &FileId) -> Response {
    match outcome {
        LockOutcome::Ok { lock } => {
            let mut response = StatusCode::OK.into_response();
            if let Ok(value) = HeaderValue::from_str(&lock) {
                response.headers_mut().insert(HEADER_LOCK, value);
            }
            if emit_item_version {
                if let Ok(version) = state.storage().version(id) {
                    if let Ok(value) = HeaderValue::from_str(&version) {
                        response.headers_mut().insert(HEADER_ITEM_VERSION, value);
                    }
                }
            }
            response
        }
        LockOutcome::Conflict { current, reason } => {
            let mut response = StatusCode::CONFLICT.into_response();
            if let Ok(value) = HeaderValue::from_str(&current) {
                response.headers_mut().insert(HEADER_LOCK, value);
            }
            if let Some(reason) = reason {
                if let Ok(value) = HeaderValue::from_str(reason) {
                    response
                        .headers_mut()
                        .insert(HEADER_LOCK_FAILURE_REASON, value);
                }
            }
            response
        }
    }
}

pub async fn lock(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    new_lock: &str,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, true)?;
    require_exists(state, id)?;

    let now = OffsetDateTime::now_utc();
    let outcome = state.lock_table().lock(id, new_lock, now);
    Ok(outcome_into_response(outcome, true, state, id))
}

pub async fn unlock(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    lock: &str,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, true)?;
    require_exists(state, id)?;

    let now = OffsetDateTime::now_utc();
    let outcome = state.lock_table().unlock(id, lock, now);
    Ok(outcome_into_response(outcome, true, state, id))
}

pub async fn refresh_lock(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    lock: &str,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, true)?;
    require_exists(state, id)?;

    let now = OffsetDateTime::now_utc();
    let outcome = state.lock_table().refresh_lock(id, lock, now);
    Ok(outcome_into_response(outcome, false, state, id))
}

pub async fn unlock_and_relock(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    old_lock: &str,
    new_lock: &str,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, true)?;
    require_exists(state, id)?;

    let now = OffsetDateTime::now_utc();
    let outcome = state
        .lock_table()
        .unlock_and_relock(id, old_lock, new_lock, now);
    // Quirk preserved from §4.3: on success, X-WOPI-OldLock carries the new
    // lock value, not the old one.
    match outcome {
        LockOutcome::Ok { lock } => {
            let mut response = StatusCode::OK.into_response();
            if let Ok(value) = HeaderValue::from_str(&lock) {
                response.headers_mut().insert(HEADER_OLD_LOCK, value);
            }
            Ok(response)
        }
        conflict => Ok(outcome_into_response(conflict, false, state, id)),
    }
}

pub async fn get_lock(state: &AppState, id: &FileId, uri: &Uri) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    let now = OffsetDateTime::now_utc();
    let lock = state.lock_table().get_lock(id, now);
    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&lock) {
        response.headers_mut().insert(HEADER_LOCK, value);
    }
    Ok(response)
}
