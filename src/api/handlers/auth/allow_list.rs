//! Routes that may be called without a session.
//!
//! The list is keyed by route template and built once at startup; the auth
//! gate only reads it. Lookups go through [`AllowList::normalize`]:
//!
//! - a trailing `/` is dropped (the root path stays `/`);
//! - a path that is itself registered is used as-is;
//! - otherwise, if removing exactly one trailing segment yields a registered
//!   route, that route is used (`/api/articles/42` resolves to `/api/articles`);
//! - otherwise the path is used unchanged.
//!
//! Only one level is ever removed, and the root never acts as a collection, so
//! `/api/articles/42/comments` does not inherit the exemptions of `/api/articles`
//! and `/anything` does not inherit those of `/`.

use anyhow::{anyhow, Context, Result};
use axum::http::Method;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct AllowList {
    routes: HashMap<String, HashSet<Method>>,
}

impl AllowList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Public routes of the service.
    #[must_use]
    pub fn default_routes() -> Self {
        Self::new()
            .allow("/", [Method::GET])
            .allow("/health", [Method::GET])
            .allow("/openapi.json", [Method::GET])
            .allow("/api/users", [Method::POST])
            .allow("/api/users/login", [Method::POST])
            .allow("/api/articles", [Method::GET])
    }

    /// Exempt `methods` on `route` from authentication.
    #[must_use]
    pub fn allow<I>(mut self, route: &str, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.routes
            .entry(trim_trailing_slash(route).to_string())
            .or_default()
            .extend(methods);
        self
    }

    /// Add an entry in `ROUTE=METHOD[,METHOD...]` form, as given on the command line.
    ///
    /// # Errors
    /// Returns an error if the entry is malformed or names an invalid method.
    pub fn with_entry(self, entry: &str) -> Result<Self> {
        let (route, methods) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("allow-list entry must be ROUTE=METHODS: {entry}"))?;
        let route = route.trim();
        if !route.starts_with('/') {
            return Err(anyhow!("allow-list route must start with '/': {route}"));
        }

        let methods = methods
            .split(',')
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .map(|method| {
                Method::from_bytes(method.to_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method in allow-list: {method}"))
            })
            .collect::<Result<Vec<_>>>()?;
        if methods.is_empty() {
            return Err(anyhow!("allow-list entry has no methods: {entry}"));
        }

        Ok(self.allow(route, methods))
    }

    /// Resolve a request path to the route template used for lookups.
    #[must_use]
    pub fn normalize<'a>(&self, path: &'a str) -> &'a str {
        let path = trim_trailing_slash(path);
        if self.routes.contains_key(path) {
            return path;
        }

        match path.rsplit_once('/') {
            Some((parent, segment))
                if !parent.is_empty() && !segment.is_empty() && self.routes.contains_key(parent) =>
            {
                parent
            }
            _ => path,
        }
    }

    /// Whether `method` on `path` may skip authentication.
    #[must_use]
    pub fn is_exempt(&self, path: &str, method: &Method) -> bool {
        self.routes
            .get(self.normalize(path))
            .is_some_and(|methods| methods.contains(method))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes_exempt_public_pairs() {
        let list = AllowList::default_routes();
        assert!(list.is_exempt("/api/users", &Method::POST));
        assert!(list.is_exempt("/api/users/login", &Method::POST));
        assert!(list.is_exempt("/api/articles", &Method::GET));
        assert!(list.is_exempt("/health", &Method::GET));
        assert!(list.is_exempt("/", &Method::GET));
    }

    #[test]
    fn other_methods_are_not_exempt() {
        let list = AllowList::default_routes();
        assert!(!list.is_exempt("/api/users", &Method::GET));
        assert!(!list.is_exempt("/api/articles", &Method::POST));
        assert!(!list.is_exempt("/api/articles", &Method::PUT));
        assert!(!list.is_exempt("/api/user", &Method::GET));
        assert!(!list.is_exempt("/api/user/logout", &Method::POST));
    }

    #[test]
    fn entity_route_resolves_to_collection() {
        let list = AllowList::default_routes();
        assert_eq!(list.normalize("/api/articles/123"), "/api/articles");
        assert_eq!(list.normalize("/api/articles"), "/api/articles");
        assert!(list.is_exempt("/api/articles/123", &Method::GET));
        assert!(!list.is_exempt("/api/articles/123", &Method::PUT));
        assert!(!list.is_exempt("/api/articles/123", &Method::DELETE));
    }

    #[test]
    fn only_one_level_is_stripped() {
        let list = AllowList::default_routes();
        assert_eq!(
            list.normalize("/api/articles/123/comments"),
            "/api/articles/123/comments"
        );
        assert!(!list.is_exempt("/api/articles/123/comments", &Method::GET));
    }

    #[test]
    fn registered_route_wins_over_parent() {
        let list = AllowList::default_routes();
        assert_eq!(list.normalize("/api/users/login"), "/api/users/login");
    }

    #[test]
    fn root_is_not_a_collection() {
        let list = AllowList::default_routes();
        assert_eq!(list.normalize("/api"), "/api");
        assert!(!list.is_exempt("/api", &Method::GET));
    }

    #[test]
    fn trailing_slash_ignored() {
        let list = AllowList::default_routes();
        assert!(list.is_exempt("/api/articles/", &Method::GET));
        assert!(list.is_exempt("/api/articles/7/", &Method::GET));
        assert_eq!(list.normalize("/"), "/");
        assert_eq!(list.normalize("//"), "/");
    }

    #[test]
    fn unregistered_parent_is_not_stripped() {
        let list = AllowList::default_routes();
        assert_eq!(list.normalize("/api/user/logout"), "/api/user/logout");
    }

    #[test]
    fn with_entry_parses_methods() -> Result<()> {
        let list = AllowList::new().with_entry("/api/tags=get, head")?;
        assert!(list.is_exempt("/api/tags", &Method::GET));
        assert!(list.is_exempt("/api/tags", &Method::HEAD));
        assert!(!list.is_exempt("/api/tags", &Method::POST));
        assert_eq!(list.len(), 1);
        Ok(())
    }

    #[test]
    fn with_entry_merges_into_existing_route() -> Result<()> {
        let list = AllowList::default_routes().with_entry("/api/articles=HEAD")?;
        assert!(list.is_exempt("/api/articles", &Method::GET));
        assert!(list.is_exempt("/api/articles", &Method::HEAD));
        Ok(())
    }

    #[test]
    fn with_entry_rejects_malformed() {
        assert!(AllowList::new().with_entry("/api/tags").is_err());
        assert!(AllowList::new().with_entry("api/tags=GET").is_err());
        assert!(AllowList::new().with_entry("/api/tags=").is_err());
        assert!(AllowList::new().with_entry("/api/tags=G ET").is_err());
    }

    #[test]
    fn empty_list_exempts_nothing() {
        let list = AllowList::new();
        assert!(list.is_empty());
        assert!(!list.is_exempt("/", &Method::GET));
    }
}
