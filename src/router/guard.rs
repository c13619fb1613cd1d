//! Navigation guard gating every route transition on session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs before each transition. The first transition resolves the session
//! (`SessionStore::initialize`); after that the guard only reads state.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use super::location::{Location, REDIRECT_QUERY_KEY};
use super::routes::{RouteMeta, RouteName, RouteTable};
use crate::state::session::SessionStore;

/// Outcome of guarding one transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    /// Abort the transition and go here instead.
    Redirect(Location),
}

#[derive(Clone)]
pub struct NavigationGuard {
    store: Arc<SessionStore>,
    routes: Arc<RouteTable>,
}

impl NavigationGuard {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, routes: Arc<RouteTable>) -> Self {
        Self { store, routes }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide whether the transition to `to` may proceed.
    ///
    /// Waits for session initialization on the first call; an initialization
    /// failure has already been absorbed into "not authenticated".
    pub async fn before_each(&self, to: &Location) -> Navigation {
        if !self.store.is_initialized() {
            self.store.initialize().await;
        }
        let meta = self.routes.meta_for(&to.path);
        decide(meta, self.store.is_authenticated(), to, &self.routes)
    }
}

pub(crate) fn decide(meta: RouteMeta, authenticated: bool, to: &Location, routes: &RouteTable) -> Navigation {
    if meta.requires_auth && !authenticated {
        let login = routes
            .location_for(RouteName::Login)
            .with_query(REDIRECT_QUERY_KEY, to.full_path());
        return Navigation::Redirect(login);
    }
    if meta.guest_only && authenticated {
        return Navigation::Redirect(routes.location_for(RouteName::Dashboard));
    }
    Navigation::Allow
}
