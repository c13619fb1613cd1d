//! Static route table with per-route auth metadata.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use super::location::Location;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteName {
    Landing,
    Login,
    Register,
    Dashboard,
}

impl RouteName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Login => "login",
            Self::Register => "register",
            Self::Dashboard => "dashboard",
        }
    }

    /// Path used when a table has no record for this name.
    #[must_use]
    pub fn default_path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
        }
    }
}

/// Auth flags attached to a route when the table is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Only authenticated sessions may enter.
    pub requires_auth: bool,
    /// Only unauthenticated sessions may enter.
    pub guest_only: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRecord {
    pub name: RouteName,
    pub path: &'static str,
    pub meta: RouteMeta,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteRecord { name: RouteName::Landing, path: "/", meta: RouteMeta::default() },
            RouteRecord {
                name: RouteName::Login,
                path: "/login",
                meta: RouteMeta { requires_auth: false, guest_only: true },
            },
            RouteRecord {
                name: RouteName::Register,
                path: "/register",
                meta: RouteMeta { requires_auth: false, guest_only: true },
            },
            RouteRecord {
                name: RouteName::Dashboard,
                path: "/dashboard",
                meta: RouteMeta { requires_auth: true, guest_only: false },
            },
        ])
    }
}

impl RouteTable {
    #[must_use]
    pub fn new(records: Vec<RouteRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    /// Match a path to its record. Matching ignores ASCII case and a trailing slash.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&RouteRecord> {
        let wanted = normalize_path(path);
        self.records
            .iter()
            .find(|record| normalize_path(record.path).eq_ignore_ascii_case(wanted))
    }

    #[must_use]
    pub fn record(&self, name: RouteName) -> Option<&RouteRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// Metadata for a path; unmatched paths carry none.
    #[must_use]
    pub fn meta_for(&self, path: &str) -> RouteMeta {
        self.resolve(path).map(|record| record.meta).unwrap_or_default()
    }

    #[must_use]
    pub fn location_for(&self, name: RouteName) -> Location {
        let path = self.record(name).map_or(name.default_path(), |record| record.path);
        Location::new(path)
    }
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
