pub mod auth;
pub mod provider_gate;
