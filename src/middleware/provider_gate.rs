//! Authorization gate for provider-scoped routes.
//!
//! Runs after the authentication gate has resolved an identity; routes
//! behind it refuse to operate with the default credential.

use axum::{extract::Request, middleware::Next, response::Response};
use shared::AppError;

use crate::models::RequestIdentity;

pub async fn require_provider(request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<RequestIdentity>()
        .ok_or(AppError::UnknownProvider)?;

    if !identity.explicit {
        return Err(AppError::UnknownProvider);
    }

    Ok(next.run(request).await)
}
