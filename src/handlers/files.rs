//! `CheckFileInfo`, `GetFile`, `PutFile`, `DeleteFile`, `RenameFile`,
//! `PutRelativeFile` and `EnumerateAncestors` — the operations scoped to a
//! single file that are not part of the lock state machine.

use std::path::Path as StdPath;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use time::OffsetDateTime;

use super::{file_url, gate, request_host, require_exists};
use crate::lock::LockOutcome;
use crate::request::{
    extract_access_token, header_bool, header_decoded, header_str, HEADER_LOCK,
    HEADER_OVERWRITE_RELATIVE_TARGET, HEADER_RELATIVE_TARGET, HEADER_REQUESTED_NAME,
    HEADER_SUGGESTED_TARGET,
};
use crate::response::{WopiError, HEADER_INVALID_FILE_NAME_ERROR, HEADER_ITEM_VERSION};
use crate::state::AppState;
use crate::storage::StorageError;
use crate::types::FileId;

pub async fn check_file_info(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Value>, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    let binding = gate(&state, &token, &id, false)?;

    let size = state
        .storage()
        .size(&id)?
        .ok_or(WopiError::FileUnknown)?;
    let read_only = state.storage().read_only(&id)?;
    let version = state.storage().version(&id)?;
    let extension = StdPath::new(id.as_str())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let user_info = state.user_info(&binding.user).unwrap_or_default();

    Ok(Json(json!({
        "BaseFileName": id.as_str(),
        "Size": size,
        "Version": version,
        "OwnerId": binding.user,
        "UserId": binding.user,
        "UserFriendlyName": binding.user,
        "UserPrincipalName": binding.user,
        "FileExtension": extension,
        "ReadOnly": read_only,
        "UserCanWrite": !read_only,
        "UserCanNotWriteRelative": false,
        "SupportsLocks": true,
        "SupportsUpdate": true,
        "SupportsGetLock": true,
        "SupportsExtendedLockLength": true,
        "SupportsRename": true,
        "UserCanRename": true,
        "SupportsFolders": true,
        "SupportsSecureStore": true,
        "SupportsScenarioLinks": true,
        "SupportsUserInfo": true,
        "SupportsAddActivities": true,
        "SupportedShareUrlTypes": ["ReadOnly", "ReadWrite"],
        "BreadcrumbBrandName": state.storage().root_name(),
        "BreadcrumbFolderName": state.storage().root_name(),
        "BreadcrumbFolderUrl": format!("http://{}/wopi/folders/{}", request_host(&headers), state.storage().root_name()),
        "UserInfo": user_info,
    })))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    gate(&state, &token, &id, false)?;

    let data = state.storage().read(&id)?;
    Ok((StatusCode::OK, data).into_response())
}

pub async fn put_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    gate(&state, &token, &id, true)?;
    require_exists(&state, &id)?;

    let new_lock = header_str(&headers, HEADER_LOCK).unwrap_or("");
    let now = OffsetDateTime::now_utc();
    match state.lock_table().check(&id, new_lock, now) {
        LockOutcome::Ok { .. } => {}
        LockOutcome::Conflict { current, reason } => {
            return Err(WopiError::LockMismatch { current, reason });
        }
    }

    state.storage().write(&id, &body)?;
    let version = state.storage().version(&id)?;

    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&version) {
        response
            .headers_mut()
            .insert(HEADER_ITEM_VERSION, value);
    }
    Ok(response)
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
) -> Result<StatusCode, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    gate(&state, &token, &id, true)?;
    require_exists(&state, &id)?;

    let now = OffsetDateTime::now_utc();
    match state.lock_table().check(&id, "", now) {
        LockOutcome::Ok { .. } => {}
        LockOutcome::Conflict { current, reason } => {
            return Err(WopiError::LockMismatch { current, reason });
        }
    }

    state.storage().delete(&id)?;
    Ok(StatusCode::OK)
}

pub async fn rename_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    gate(&state, &token, &id, true)?;
    require_exists(&state, &id)?;

    let client_lock = header_str(&headers, HEADER_LOCK).unwrap_or("");
    let now = OffsetDateTime::now_utc();
    match state.lock_table().check(&id, client_lock, now) {
        LockOutcome::Ok { .. } => {}
        LockOutcome::Conflict { current, reason } => {
            return Err(WopiError::LockMismatch { current, reason });
        }
    }

    let requested_name = header_decoded(&headers, HEADER_REQUESTED_NAME)
        .ok_or_else(|| WopiError::BadRequest {
            message: "missing X-WOPI-RequestedName".to_string(),
        })?;

    match state.storage().rename(&id, &requested_name) {
        Ok(()) => Ok(Json(json!({ "Name": requested_name })).into_response()),
        Err(StorageError::AlreadyExists) => {
            let mut response = StatusCode::BAD_REQUEST.into_response();
            if let Ok(value) = HeaderValue::from_str("a file with that name already exists") {
                response
                    .headers_mut()
                    .insert(HEADER_INVALID_FILE_NAME_ERROR, value);
            }
            Ok(response)
        }
        Err(e) => Err(e.into()),
    }
}

/// Applies the extension-swap rule from §4.4: a target starting with `.`
/// and containing no further `.` is the new extension for the current
/// file's stem, rather than a full file name.
fn resolve_target_name(current_id: &FileId, target: &str) -> String {
    if target.starts_with('.') && !target[1..].contains('.') {
        let stem = StdPath::new(current_id.as_str())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(current_id.as_str());
        format!("{stem}{target}")
    } else {
        target.to_string()
    }
}

pub async fn put_relative_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    let binding = gate(&state, &token, &id, true)?;
    require_exists(&state, &id)?;

    let suggested = header_decoded(&headers, HEADER_SUGGESTED_TARGET);
    let relative = header_decoded(&headers, HEADER_RELATIVE_TARGET);
    let overwrite = header_bool(&headers, HEADER_OVERWRITE_RELATIVE_TARGET);

    let final_name = match (suggested, relative) {
        (Some(suggested), None) => {
            let target = resolve_target_name(&id, &suggested);
            if state.storage().exists(&FileId::new(&target))? {
                let guid = super::misc::random_guid();
                format!("{guid}-{target}")
            } else {
                target
            }
        }
        (None, Some(relative)) => {
            let target = resolve_target_name(&id, &relative);
            let target_id = FileId::new(&target);
            if state.storage().exists(&target_id)? {
                let now = OffsetDateTime::now_utc();
                let locked = state.lock_table().current(&target_id, now).is_some();
                if !overwrite || locked {
                    return Err(WopiError::LockMismatch {
                        current: state
                            .lock_table()
                            .current(&target_id, now)
                            .unwrap_or_default(),
                        reason: None,
                    });
                }
            }
            target
        }
        _ => return Err(WopiError::Unsupported),
    };

    state.storage().create_or_overwrite(&final_name, &body)?;

    let new_id = FileId::new(&final_name);
    let host = request_host(&headers);
    let new_token = state
        .token_authority()
        .mint(&binding.user, &new_id, crate::types::Permission::Write);
    let url = file_url(&host, &new_id, &new_token);

    Ok(Json(json!({
        "Name": final_name,
        "Url": url,
        "HostViewUrl": url,
        "HostEditUrl": url,
    }))
    .into_response())
}

pub async fn enumerate_ancestors(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, WopiError> {
    let id = FileId::new(&raw_id);
    let token = extract_access_token(&uri);
    gate(&state, &token, &id, false)?;
    require_exists(&state, &id)?;

    let host = request_host(&headers);
    let root_url = format!("http://{host}/wopi/folders/{}", state.storage().root_name());

    let mut response = Json(json!({
        "AncestorsWithRootFirst": [{
            "Name": state.storage().root_name(),
            "Url": root_url,
        }],
    }))
    .into_response();
    response.headers_mut().insert(
        crate::response::HEADER_ENUMERATION_INCOMPLETE,
        HeaderValue::from_static("true"),
    );
    Ok(response)
}
