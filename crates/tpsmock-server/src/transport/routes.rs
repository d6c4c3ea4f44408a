//! Live route table: `path -> endpoint id`.
//!
//! Unlike a router built once at startup, bindings here change as endpoints
//! are created, moved and deleted, so a path update takes effect on the next
//! request.

use dashmap::DashMap;

use tpsmock_core::RouteBinder;

const ID_ROUTE_PREFIX: &str = "/w/";

#[derive(Default)]
pub struct RouteTable {
    paths: DashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint id for a request path.
    ///
    /// Exact bindings win; a trailing slash is ignored; otherwise
    /// `/w/{id}` addresses an endpoint by id whatever its bound path.
    pub fn resolve(&self, path: &str) -> Option<String> {
        if let Some(id) = self.paths.get(path) {
            return Some(id.value().clone());
        }
        let trimmed = path.trim_end_matches('/');
        if !trimmed.is_empty() && trimmed != path {
            if let Some(id) = self.paths.get(trimmed) {
                return Some(id.value().clone());
            }
        }
        trimmed
            .strip_prefix(ID_ROUTE_PREFIX)
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .map(str::to_string)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl RouteBinder for RouteTable {
    fn bind(&self, path: &str, id: &str) {
        self.paths.insert(path.to_string(), id.to_string());
    }

    fn unbind(&self, path: &str) {
        self.paths.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_then_id_fallback() {
        let t = RouteTable::new();
        t.bind("/webhook", "default");
        t.bind("/hooks/gh", "abc12345");

        assert_eq!(t.resolve("/webhook").as_deref(), Some("default"));
        assert_eq!(t.resolve("/webhook/").as_deref(), Some("default"));
        assert_eq!(t.resolve("/hooks/gh").as_deref(), Some("abc12345"));
        assert_eq!(t.resolve("/w/abc12345").as_deref(), Some("abc12345"));
        assert_eq!(t.resolve("/w/").as_deref(), None);
        assert_eq!(t.resolve("/w/a/b").as_deref(), None);
        assert_eq!(t.resolve("/nothing").as_deref(), None);
    }

    #[test]
    fn rebinding_moves_the_route() {
        let t = RouteTable::new();
        t.bind("/old", "x");
        t.unbind("/old");
        t.bind("/new", "x");

        assert_eq!(t.resolve("/old"), None);
        assert_eq!(t.resolve("/new").as_deref(), Some("x"));
        assert_eq!(t.len(), 1);
    }
}
