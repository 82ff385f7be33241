//! Maps the `X-WOPI-Override` header on `POST /wopi/files/{id}` to a typed
//! [`Operation`], so handler code never string-compares header values itself
//! (see Design Notes in SPEC_FULL.md). The five URL-shape routes
//! (`CheckFileInfo`, `GetFile`, `EnumerateAncestors`, `CheckFolderInfo`,
//! `EnumerateChildren`) are instead dispatched directly by the axum `Router`
//! in [`crate::app`], since their classification is purely a function of the
//! URL and method and needs no runtime header inspection.

use axum::http::{HeaderMap, Uri};

/// The sub-operation a `POST /wopi/files/{id}` request is classified as,
/// read from `X-WOPI-Override` (and, for lock operations, the accompanying
/// `X-WOPI-Lock`/`X-WOPI-OldLock` headers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Lock { lock: String },
    UnlockAndRelock { old_lock: String, new_lock: String },
    Unlock { lock: String },
    RefreshLock { lock: String },
    GetLock,
    PutRelativeFile,
    DeleteFile,
    RenameFile,
    ReadSecureStore,
    GetRestrictedLink,
    RevokeRestrictedLink,
    GetShareUrl,
    PutUserInfo,
    AddActivities,
    ExecuteCobaltRequest,
    /// `X-WOPI-Override` missing or unrecognized. Always a 500 per spec.
    Unknown,
}

pub const HEADER_OVERRIDE: &str = "X-WOPI-Override";
pub const HEADER_LOCK: &str = "X-WOPI-Lock";
pub const HEADER_OLD_LOCK: &str = "X-WOPI-OldLock";
pub const HEADER_SUGGESTED_TARGET: &str = "X-WOPI-SuggestedTarget";
pub const HEADER_RELATIVE_TARGET: &str = "X-WOPI-RelativeTarget";
pub const HEADER_OVERWRITE_RELATIVE_TARGET: &str = "X-WOPI-OverwriteRelativeTarget";
pub const HEADER_REQUESTED_NAME: &str = "X-WOPI-RequestedName";
pub const HEADER_URL_TYPE: &str = "X-WOPI-UrlType";
pub const HEADER_RESTRICTED_USE_LINK: &str = "X-WOPI-RestrictedUseLink";
pub const HEADER_APPLICATION_ID: &str = "X-WOPI-ApplicationId";
pub const HEADER_PERF_TRACE_REQUESTED: &str = "X-WOPI-PerfTraceRequested";

/// Reads a header as a UTF-8 string, the one place every handler goes to
/// avoid repeating the `get`/`to_str` dance.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Reads a header and percent-decodes it, for the handful of WOPI headers
/// (`SuggestedTarget`, `RelativeTarget`, `RequestedName`) the protocol
/// requires to carry percent-encoded values.
pub fn header_decoded(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).map(|v| {
        percent_encoding::percent_decode_str(v)
            .decode_utf8_lossy()
            .into_owned()
    })
}

/// Parses a WOPI boolean header (`"true"`, case-insensitive; anything else
/// is `false`), used for `X-WOPI-OverwriteRelativeTarget` and
/// `X-WOPI-PerfTraceRequested`.
pub fn header_bool(headers: &HeaderMap, name: &str) -> bool {
    header_str(headers, name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Classify a `POST /wopi/files/{id}` request from its headers.
pub fn classify_override(headers: &HeaderMap) -> Operation {
    let lock = header_str(headers, HEADER_LOCK).unwrap_or("").to_string();
    let old_lock = header_str(headers, HEADER_OLD_LOCK);

    match header_str(headers, HEADER_OVERRIDE) {
        Some("LOCK") => match old_lock {
            None => Operation::Lock { lock },
            Some(old_lock) => Operation::UnlockAndRelock {
                old_lock: old_lock.to_string(),
                new_lock: lock,
            },
        },
        Some("UNLOCK") => Operation::Unlock { lock },
        Some("REFRESH_LOCK") => Operation::RefreshLock { lock },
        Some("GET_LOCK") => Operation::GetLock,
        Some("PUT_RELATIVE") => Operation::PutRelativeFile,
        Some("DELETE") => Operation::DeleteFile,
        Some("RENAME_FILE") => Operation::RenameFile,
        Some("READ_SECURE_STORE") => Operation::ReadSecureStore,
        Some("GET_RESTRICTED_LINK") => Operation::GetRestrictedLink,
        Some("REVOKE_RESTRICTED_LINK") => Operation::RevokeRestrictedLink,
        Some("GET_SHARE_URL") => Operation::GetShareUrl,
        Some("PUT_USER_INFO") => Operation::PutUserInfo,
        Some("ADD_ACTIVITIES") => Operation::AddActivities,
        Some("COBALT") => Operation::ExecuteCobaltRequest,
        _ => Operation::Unknown,
    }
}

/// Pulls `access_token` out of the request's query string. WOPI carries the
/// token as a query parameter on every operation, including `POST`s, so it
/// has to be read from the URI rather than from any extractor tied to the
/// request body.
pub fn extract_access_token(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return String::new();
    };
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == "access_token" {
                return percent_encoding::percent_decode_str(value)
                    .decode_utf8_lossy()
                    .into_owned();
            }
        }
    }
    String::new()
}
