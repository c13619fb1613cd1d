//! Client-side application state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` owns the authenticated user; the router reads it to gate routes.

pub mod session;
