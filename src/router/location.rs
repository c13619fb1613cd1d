//! Parsed navigation targets (`path?query#hash`).

#[cfg(test)]
#[path = "location_test.rs"]
mod location_test;

use std::borrow::Cow;
use std::fmt;

/// Query key carrying the originally requested path on a login redirect.
pub const REDIRECT_QUERY_KEY: &str = "redirect";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// Decoded query pairs in their original order.
    pub query: Vec<(String, String)>,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self { path: if path.is_empty() { "/".to_owned() } else { path }, query: Vec::new(), hash: String::new() }
    }

    /// Parse a full path such as `/dashboard?tab=1#top`.
    #[must_use]
    pub fn parse(full_path: &str) -> Self {
        let (rest, hash) = match full_path.find('#') {
            Some(idx) => (&full_path[..idx], full_path[idx..].to_owned()),
            None => (full_path, String::new()),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (rest, Vec::new()),
        };
        let mut location = Self::new(path);
        location.query = query;
        location.hash = hash;
        location
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// First value for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path, encoded query, and hash joined back together.
    #[must_use]
    pub fn full_path(&self) -> String {
        let mut out = self.path.clone();
        if !self.query.is_empty() {
            out.push('?');
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect();
            out.push_str(&pairs.join("&"));
        }
        out.push_str(&self.hash);
        out
    }

    /// The `redirect` query value when it is a same-site absolute path.
    ///
    /// Values like `//evil.test` or `https://evil.test` are rejected.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        self.query_value(REDIRECT_QUERY_KEY)
            .filter(|target| target.starts_with('/') && !target.starts_with("//"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Where to send the user after a successful login from `from`.
#[must_use]
pub fn post_login_destination(from: &Location, fallback: &str) -> String {
    from.redirect_target().unwrap_or(fallback).to_owned()
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map_or_else(|_| spaced.clone(), Cow::into_owned)
}

/// Percent-encode a query component; slashes stay readable in redirect paths.
fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%2F", "/")
}
