//! service-core: shared infrastructure for the account-linking services.
//!
//! HTTP error mapping, base configuration, request-id and security-header
//! middleware, and tracing bootstrap with outbound trace propagation.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
