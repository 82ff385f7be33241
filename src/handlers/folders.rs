//! `CheckFolderInfo` and `EnumerateChildren` — the two folder-scoped
//! operations. This host exposes exactly one folder, the configured storage
//! root, so both handlers just confirm the requested id names it.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::{file_url, request_host};
use crate::response::WopiError;
use crate::state::AppState;
use crate::types::Permission;

fn require_root(state: &AppState, raw_id: &str) -> Result<(), WopiError> {
    if state.storage().root_name().eq_ignore_ascii_case(raw_id) {
        Ok(())
    } else {
        Err(WopiError::FileUnknown)
    }
}

pub async fn check_folder_info(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, WopiError> {
    require_root(&state, &raw_id)?;

    Ok(Json(json!({
        "FolderName": state.storage().root_name(),
        "OwnerId": state.storage().root_name(),
    }))
    .into_response())
}

pub async fn enumerate_children(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, WopiError> {
    require_root(&state, &raw_id)?;

    let host = request_host(&headers);
    let children: Vec<_> = state
        .storage()
        .list_root()?
        .into_iter()
        .map(|file_id| {
            let version = state.storage().version(&file_id).unwrap_or_default();
            // Children listings need a user identity to bind the freshly
            // minted per-file token to; the root folder itself carries no
            // token, so an anonymous placeholder user is used here.
            let token = state
                .token_authority()
                .mint("anonymous", &file_id, Permission::Read);
            json!({
                "Name": file_id.as_str(),
                "Version": version,
                "Url": file_url(&host, &file_id, &token),
            })
        })
        .collect();

    Ok(Json(json!({ "Children": children })).into_response())
}
