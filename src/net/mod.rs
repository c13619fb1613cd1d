//! Networking modules for the auth REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` performs HTTP calls, `types` defines the envelope and DTO schema,
//! and `error` describes failures below the envelope layer.

pub mod api;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
