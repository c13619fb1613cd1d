//! # sessiongate
//!
//! Cookie-session authentication client with client-side route guarding.
//!
//! This crate contains the REST adapter for the auth endpoints (`net`), the
//! single-writer session store that owns the current user (`state`), and the
//! navigation guard plus router that gate routes on that state (`router`).
//! The `cli/` package drives all three against a live API.

pub mod config;
pub mod net;
pub mod router;
pub mod state;
