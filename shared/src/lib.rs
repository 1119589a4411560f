//! Shared configuration and error handling for the e-MCF gateway.

pub mod config;
pub mod error;

pub use config::{Config, CredentialRegistry};
pub use error::{AppError, Result};
