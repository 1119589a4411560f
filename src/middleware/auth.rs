//! Signed-request authentication gate.
//!
//! Every request (health excluded) carries three headers:
//! `X-App-Request-Timestamp` (epoch millis), `X-App-Signature`
//! (`applicationName=hexDigest`) and optionally `X-Provider-Key`.
//! The digest is HMAC-SHA-256 over `appName:timestamp:body` with the
//! application's shared secret. Verification happens on the raw body
//! bytes, before any JSON parsing, so the comparison is byte-for-byte
//! with what the caller signed.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::warn;

use shared::AppError;

use crate::models::{Provider, RequestIdentity};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_HEADER: &str = "x-app-request-timestamp";
const SIGNATURE_HEADER: &str = "x-app-signature";
const PROVIDER_KEY_HEADER: &str = "x-provider-key";

/// Body bytes are buffered here for verification; anything larger is
/// not a legitimate invoice payload.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub async fn signature_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request = authenticate(&state, request).await?;
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, request: Request) -> Result<Request, AppError> {
    let headers = request.headers().clone();

    let timestamp = header_value(&headers, TIMESTAMP_HEADER);
    let signature = header_value(&headers, SIGNATURE_HEADER);
    let provider_key = header_value(&headers, PROVIDER_KEY_HEADER);

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(AppError::MissingHeaders),
    };

    // `appName=hexDigest`; a header without the separator or with an
    // empty digest is treated the same as a missing one.
    let (app_name, provided_digest) = match signature.split_once('=') {
        Some((name, digest)) if !digest.is_empty() => (name, digest),
        _ => return Err(AppError::MissingHeaders),
    };

    // A request whose claimed timestamp is older than the tolerance
    // window is a potential replay, rejected before anything else is
    // looked at.
    if !is_fresh(
        &timestamp,
        chrono::Utc::now().timestamp_millis(),
        state.config.request.timestamp_delay_ms,
    ) {
        warn!(application = app_name, "request outside the replay window");
        return Err(AppError::ReplayDetected);
    }

    if app_name.is_empty() {
        return Err(AppError::ApplicationNotFound);
    }

    let secret = state
        .credentials
        .secret_for(app_name)
        .ok_or(AppError::ApplicationKeyNotFound)?
        .to_string();

    // Buffer the raw body for signing; it is reassembled below for the
    // JSON extractors downstream.
    let (parts, body) = request.into_parts();
    let body_bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!("failed to read request body: {e}")))?;

    let expected = compute_digest(app_name, &timestamp, canonical_body(&body_bytes), &secret);
    if !digests_match(provided_digest, &expected) {
        warn!(application = app_name, "request signature mismatch");
        return Err(AppError::SignatureMismatch);
    }

    let identity = resolve_identity(state, app_name, provider_key.as_deref()).await?;

    let mut request = Request::from_parts(parts, Body::from(body_bytes));
    request.extensions_mut().insert(identity);
    Ok(request)
}

/// Resolve which provider credential this request acts as: the profile
/// named by `X-Provider-Key`, or the platform default when absent.
async fn resolve_identity(
    state: &AppState,
    app_name: &str,
    provider_key: Option<&str>,
) -> Result<RequestIdentity, AppError> {
    match provider_key.filter(|k| !k.is_empty()) {
        Some(key) => {
            let provider = state
                .providers
                .find_by_pid(key)
                .await?
                .ok_or(AppError::ProviderKeyNotFound)?;

            // A provider key only works for the application that
            // registered it, even if both apps authenticate correctly.
            if provider.application != app_name {
                warn!(
                    application = app_name,
                    provider_application = %provider.application,
                    "provider key used by foreign application"
                );
                return Err(AppError::ProviderNotInApplication);
            }

            Ok(RequestIdentity {
                application: app_name.to_string(),
                provider,
                explicit: true,
            })
        }
        None => {
            let emcf = &state.config.emcf;
            // A missing default credential is a deployment defect, not
            // a caller error; surfaced with its own reason so operators
            // can tell the two apart.
            if emcf.user_name.is_empty() || emcf.user_token.is_empty() {
                return Err(AppError::BadDefaultConfiguration);
            }

            Ok(RequestIdentity {
                application: emcf.user_name.clone(),
                provider: Provider::from_default_credential(emcf),
                explicit: false,
            })
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Signed view of the body: callers sign the JSON they send, and an
/// absent body is signed as the empty JSON object.
fn canonical_body(body: &Bytes) -> &[u8] {
    if body.is_empty() {
        b"{}"
    } else {
        body
    }
}

/// True when the claimed timestamp is within the tolerance window.
/// Future timestamps pass: this is a replay bound, not a clock-skew
/// check. A non-numeric timestamp fails, as does one so far in the
/// past that the difference does not fit in an i64.
pub fn is_fresh(raw_timestamp: &str, now_ms: i64, tolerance_ms: i64) -> bool {
    match raw_timestamp.trim().parse::<i64>() {
        Ok(timestamp) => now_ms
            .checked_sub(timestamp)
            .is_some_and(|age| age <= tolerance_ms),
        Err(_) => false,
    }
}

/// Hex HMAC-SHA-256 over `appName:timestamp:body`.
pub fn compute_digest(app_name: &str, timestamp: &str, body: &[u8], secret: &str) -> String {
    // HMAC-SHA-256 accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(app_name.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time digest comparison. Length is not secret here; `ct_eq`
/// on unequal-length slices short-circuits to false.
pub fn digests_match(provided: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
