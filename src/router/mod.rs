//! Client-side routing: route table, guard, and the router that applies it.
//!
//! ARCHITECTURE
//! ============
//! `Router::push` runs the guard for a target and follows redirects, guarding
//! each redirect target in turn, until a transition is allowed. The settled
//! location is published on a `watch` channel for observers.

pub mod guard;
pub mod location;
pub mod routes;


use std::sync::Arc;

use tokio::sync::watch;

use crate::state::session::SessionStore;
use guard::{Navigation, NavigationGuard};
use location::Location;
use routes::RouteTable;

/// Upper bound on redirects followed for a single `push`.
pub const MAX_REDIRECTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation to {target} exceeded the redirect limit")]
    RedirectLoop { target: String },
}

pub struct Router {
    guard: NavigationGuard,
    current: watch::Sender<Option<Location>>,
}

impl Router {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, routes: RouteTable) -> Self {
        let (current, _) = watch::channel(None);
        Self { guard: NavigationGuard::new(store, Arc::new(routes)), current }
    }

    #[must_use]
    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        self.guard.store()
    }

    /// Location of the last settled navigation, if any.
    #[must_use]
    pub fn current(&self) -> Option<Location> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.current.subscribe()
    }

    /// Navigate to `target`, following guard redirects.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::RedirectLoop`] if redirects do not settle.
    pub async fn push(&self, target: &str) -> Result<Location, NavigationError> {
        let mut location = Location::parse(target);
        for _ in 0..=MAX_REDIRECTS {
            match self.guard.before_each(&location).await {
                Navigation::Allow => {
                    tracing::debug!(to = %location, "navigation settled");
                    self.current.send_replace(Some(location.clone()));
                    return Ok(location);
                }
                Navigation::Redirect(next) => {
                    tracing::debug!(from = %location, to = %next, "navigation redirected");
                    location = next;
                }
            }
        }
        tracing::warn!(requested = target, "navigation redirect loop");
        Err(NavigationError::RedirectLoop { target: target.to_owned() })
    }
}
