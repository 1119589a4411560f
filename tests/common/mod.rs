//! Shared fixtures for the integration tests: a router over in-memory
//! stores, a seeded provider and request-signing helpers.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request},
    Router,
};
use std::sync::Arc;

use emcf_gateway_ws::{
    create_app_router,
    db::{MemoryInvoiceStore, MemoryProviderStore},
    middleware::auth::compute_digest,
    models::{Invoice, InvoicePayload, InvoiceStatus, Operator, Payment, Provider},
    state::AppState,
};
use shared::config::{AppConfig, Config, EmcfConfig, HttpConfig, NotifyConfig, RequestConfig};

pub const APP_NAME: &str = "app_1";
pub const APP_SECRET: &str = "d21a10bd27519666489c69b503";
pub const OTHER_APP_NAME: &str = "app_2";
pub const OTHER_APP_SECRET: &str = "c39b9ad189dd8316235a7b4a8d2";

pub const PROVIDER_KEY: &str = "prov-1";
pub const PROVIDER_TOKEN: &str = "prov-token";
pub const DEFAULT_PID: &str = "default-pid";

pub const PENDING_EXPIRY_MS: i64 = 4 * 60 * 1000;

pub fn test_config(upstream_url: &str) -> Config {
    Config {
        http: HttpConfig { port: 0 },
        app: AppConfig {
            allowed: format!("{APP_NAME}:{APP_SECRET}|{OTHER_APP_NAME}:{OTHER_APP_SECRET}"),
        },
        request: RequestConfig {
            timestamp_delay_ms: 5 * 60 * 1000,
            invoice_ts_expiry_ms: PENDING_EXPIRY_MS,
        },
        emcf: EmcfConfig {
            base_url: upstream_url.to_string(),
            user_token: "default-token".into(),
            user_ifu: "0100000000000".into(),
            user_pid: DEFAULT_PID.into(),
            user_name: "platform".into(),
        },
        notify: NotifyConfig {
            api_key: "test-key".into(),
            mail_url: format!("{upstream_url}/mail"),
            sms_url: format!("{upstream_url}/sms"),
        },
    }
}

pub fn test_provider() -> Provider {
    Provider {
        pid: PROVIDER_KEY.into(),
        application: APP_NAME.into(),
        token: PROVIDER_TOKEN.into(),
        ifu: "0202134567890".into(),
        aib: "A".into(),
        tax_group: "B".into(),
        invoice_type: "FV".into(),
        is_active: true,
        email: None,
        phone_number: None,
        notify_limit: 4,
    }
}

pub struct TestApp {
    pub router: Router,
    pub providers: Arc<MemoryProviderStore>,
    pub invoices: Arc<MemoryInvoiceStore>,
    pub state: Arc<AppState>,
}

pub fn spawn_app(upstream_url: &str) -> TestApp {
    spawn_app_with_config(test_config(upstream_url))
}

pub fn spawn_app_with_config(config: Config) -> TestApp {
    let providers = Arc::new(MemoryProviderStore::new());
    let invoices = Arc::new(MemoryInvoiceStore::new());
    providers.insert(test_provider());

    let state = Arc::new(
        AppState::with_stores(config, providers.clone(), invoices.clone())
            .expect("failed to build test state"),
    );

    TestApp {
        router: create_app_router(state.clone()),
        providers,
        invoices,
        state,
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build a correctly signed request for `APP_NAME`. A `None` body is
/// signed as the empty JSON object, matching the gate's canonical view.
pub fn signed_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    provider_key: Option<&str>,
) -> Request<Body> {
    signed_request_as(APP_NAME, APP_SECRET, method, uri, body, provider_key)
}

pub fn signed_request_as(
    app_name: &str,
    secret: &str,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    provider_key: Option<&str>,
) -> Request<Body> {
    let timestamp = now_ms().to_string();
    let raw_body = body.map(|b| b.to_string());
    let signed_bytes = raw_body.as_deref().unwrap_or("{}").as_bytes().to_vec();

    let digest = compute_digest(app_name, &timestamp, &signed_bytes, secret);

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-app-request-timestamp", &timestamp)
        .header("x-app-signature", format!("{app_name}={digest}"));

    if let Some(key) = provider_key {
        builder = builder.header("x-provider-key", key);
    }

    match raw_body {
        Some(raw) => builder
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(raw))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn declaration_body(transaction_id: &str) -> serde_json::Value {
    serde_json::json!({
        "transactionId": transaction_id,
        "items": [
            { "name": "Airtime", "price": 500.0, "quantity": 2.0 }
        ],
        "operator": { "name": "counter-1" },
        "payment": [
            { "name": "ESPECES", "amount": 1000.0 }
        ]
    })
}

pub fn pending_invoice(uid: &str, transaction_id: &str, created_at: i64) -> Invoice {
    Invoice {
        uid: uid.into(),
        provider_key: PROVIDER_KEY.into(),
        is_default_token: false,
        status: InvoiceStatus::Pending,
        created_at,
        pending_response: Some("{}".into()),
        action_response: None,
        payload: InvoicePayload {
            transaction_id: transaction_id.into(),
            ifu: Some("0202134567890".into()),
            aib: None,
            invoice_type: Some("FV".into()),
            items: vec![],
            client: None,
            operator: Operator {
                id: None,
                name: "counter-1".into(),
            },
            payment: vec![Payment {
                name: "ESPECES".into(),
                amount: 1000.0,
            }],
            reference: None,
        },
    }
}

pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
