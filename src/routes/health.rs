//! Unauthenticated health probe. Excluded from the signature gate.

use axum::Json;
use serde_json::{json, Value};

pub async fn status() -> Json<Value> {
    Json(json!({
        "statusCode": 200,
        "status": "up",
    }))
}
