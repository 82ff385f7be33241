//! The remaining `POST /wopi/files/{id}` overrides that are neither lock
//! transitions nor storage mutations: share links, user info, the secure
//! store stub, activity logging, and the always-unsupported cobalt request.

use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{gate, require_exists};
use crate::request::{extract_access_token, header_bool, header_str, HEADER_APPLICATION_ID, HEADER_PERF_TRACE_REQUESTED, HEADER_RESTRICTED_USE_LINK, HEADER_URL_TYPE};
use crate::response::{WopiError, HEADER_PERF_TRACE};
use crate::state::AppState;
use crate::types::FileId;

/// Generates the globally-unique prefix `PutRelativeFile`'s `SuggestedTarget`
/// path mints on a name collision (§4.4). Not a real UUID implementation —
/// a fixed-width random hex string serves the same purpose here, the same
/// way `access::InMemoryTokenAuthority::random_token` mints opaque tokens.
pub(crate) fn random_guid() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:x}", rng.gen_range(0..16))).collect()
}

pub async fn get_share_url(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    headers: &axum::http::HeaderMap,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    match header_str(headers, HEADER_URL_TYPE) {
        Some("ReadOnly") | Some("ReadWrite") => {
            let share_url = format!("http://officeserver4/share/{id}");
            Ok(Json(json!({ "ShareUrl": share_url })).into_response())
        }
        _ => Err(WopiError::Unsupported),
    }
}

pub async fn put_user_info(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    body: &str,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    let binding = gate(state, &token, id, false)?;
    require_exists(state, id)?;

    state.set_user_info(&binding.user, body.to_string());
    Ok(StatusCode::OK.into_response())
}

pub async fn get_restricted_link(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    headers: &axum::http::HeaderMap,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    if header_str(headers, HEADER_RESTRICTED_USE_LINK) != Some("FORMS") {
        return Err(WopiError::Unsupported);
    }

    let link = if state.is_link_revoked(id) {
        String::new()
    } else {
        format!("http://officeserver4/restricted/{id}")
    };

    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&link) {
        response
            .headers_mut()
            .insert(HEADER_RESTRICTED_USE_LINK, value);
    }
    Ok(response)
}

pub async fn revoke_restricted_link(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    headers: &axum::http::HeaderMap,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    if header_str(headers, HEADER_RESTRICTED_USE_LINK) != Some("FORMS") {
        return Err(WopiError::Unsupported);
    }

    state.revoke_link(id);
    Ok(StatusCode::OK.into_response())
}

pub async fn read_secure_store(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    headers: &axum::http::HeaderMap,
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    let application_id = header_str(headers, HEADER_APPLICATION_ID).unwrap_or("");
    if application_id.is_empty() {
        return Err(WopiError::Unsupported);
    }

    let mut response = Json(json!({
        "UserName": "secure-store-user",
        "Password": "secure-store-password",
        "IsWindowsCredentials": false,
        "IsGroup": false,
    }))
    .into_response();

    if header_bool(headers, HEADER_PERF_TRACE_REQUESTED) {
        response
            .headers_mut()
            .insert(HEADER_PERF_TRACE, HeaderValue::from_static("0"));
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ActivityData {
    #[serde(rename = "ContentId")]
    #[allow(dead_code)]
    content_id: Option<String>,
    #[serde(rename = "ContentAction")]
    #[allow(dead_code)]
    content_action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Activity {
    #[serde(rename = "Type")]
    #[allow(dead_code)]
    kind: String,
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Timestamp")]
    #[allow(dead_code)]
    timestamp: String,
    #[serde(rename = "Data")]
    #[allow(dead_code)]
    data: ActivityData,
}

#[derive(Debug, Deserialize)]
struct AddActivitiesRequest {
    #[serde(rename = "Activities")]
    activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
struct ActivityResponse {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Message")]
    message: String,
}

pub async fn add_activities(
    state: &AppState,
    id: &FileId,
    uri: &Uri,
    body: &[u8],
) -> Result<Response, WopiError> {
    let token = extract_access_token(uri);
    gate(state, &token, id, false)?;
    require_exists(state, id)?;

    let request: AddActivitiesRequest = serde_json::from_slice(body).map_err(|e| WopiError::BadRequest {
        message: format!("invalid AddActivities body: {e}"),
    })?;

    let responses: Vec<ActivityResponse> = request
        .activities
        .into_iter()
        .map(|activity| ActivityResponse {
            id: activity.id,
            status: 0,
            message: String::new(),
        })
        .collect();

    Ok(Json(json!({ "ActivityResponses": responses })).into_response())
}

pub async fn execute_cobalt_request() -> Result<Response, WopiError> {
    Err(WopiError::Unsupported)
}
