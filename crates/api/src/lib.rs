//! `gridcheck-api`: the reference-data side of a validation scenario.
//!
//! One call per record type with named query parameters. No retries beyond
//! basic backoff, no caching.

mod client;
mod credentials;
mod error;
mod params;

pub use client::{FixtureApi, HttpApi, RecordType, ReferenceApi};
pub use credentials::{default_secrets_path, CredentialSource, DefaultCredentials, Secrets, SecretsFilePath, SECRETS_ENV};
pub use error::ApiError;
pub use params::{ParamValue, QueryParams};
