/// RouteClass
///
/// The four disjoint categories every request path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Session plumbing under the API-auth prefix. Never redirected.
    ApiAuth,
    /// Login/registration pages. Only meaningful to anonymous visitors.
    AuthRoute,
    /// Reachable by anyone.
    Public,
    /// Everything else. Requires a session.
    Protected,
}

/// RouteTable
///
/// The route sets the classifier matches against. Built once at startup and shared
/// read-only; tests construct fabricated tables through `RouteTable::new`.
///
/// Paths are compared verbatim. No trailing-slash or case normalization is applied,
/// so `/auth/login/` is a different path from `/auth/login` and falls through to
/// `Protected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    api_auth_prefix: String,
    auth_routes: Vec<String>,
    public_routes: Vec<String>,
}

pub const API_AUTH_PREFIX: &str = "/api/auth";
pub const AUTH_ROUTES: [&str; 5] = [
    "/auth/login",
    "/auth/register",
    "/auth/error",
    "/auth/reset",
    "/auth/new-password",
];
pub const PUBLIC_ROUTES: [&str; 2] = ["/", "/auth/new-verification"];

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::new(API_AUTH_PREFIX, AUTH_ROUTES, PUBLIC_ROUTES)
    }
}

impl RouteTable {
    pub fn new<A, P>(api_auth_prefix: impl Into<String>, auth_routes: A, public_routes: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        RouteTable {
            api_auth_prefix: api_auth_prefix.into(),
            auth_routes: auth_routes.into_iter().map(Into::into).collect(),
            public_routes: public_routes.into_iter().map(Into::into).collect(),
        }
    }

    /// classify
    ///
    /// First match wins: API-auth, then auth route, then public, else protected.
    /// Total over all strings. The API-auth prefix is a plain string prefix, so
    /// `/api/authz` passes through as well.
    pub fn classify(&self, path: &str) -> RouteClass {
        if path.starts_with(self.api_auth_prefix.as_str()) {
            RouteClass::ApiAuth
        } else if self.auth_routes.iter().any(|r| r == path) {
            RouteClass::AuthRoute
        } else if self.public_routes.iter().any(|r| r == path) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_prefix_wins_over_everything() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/api/auth"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/api/auth/callback"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/api/auth/session"), RouteClass::ApiAuth);
    }

    #[test]
    fn api_auth_prefix_is_a_plain_string_prefix() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/api/authz"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/api/authority"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/api/aut"), RouteClass::Protected);
        assert_eq!(table.classify("/api"), RouteClass::Protected);
    }

    #[test]
    fn every_auth_route_is_classified_as_auth() {
        let table = RouteTable::default();
        for route in AUTH_ROUTES {
            assert_eq!(table.classify(route), RouteClass::AuthRoute, "{route}");
        }
    }

    #[test]
    fn public_routes_are_exact_matches() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/"), RouteClass::Public);
        assert_eq!(table.classify("/auth/new-verification"), RouteClass::Public);
        assert_eq!(table.classify("/auth/new-verification/x"), RouteClass::Protected);
    }

    #[test]
    fn trailing_slash_is_not_normalized() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/auth/login/"), RouteClass::Protected);
        assert_eq!(table.classify("/users/"), RouteClass::Protected);
    }

    #[test]
    fn unknown_paths_are_protected() {
        let table = RouteTable::default();
        for path in ["/users", "/client", "/signatory", "/settings", "/AUTH/LOGIN", ""] {
            assert_eq!(table.classify(path), RouteClass::Protected, "{path}");
        }
    }

    #[test]
    fn overlapping_sets_resolve_by_precedence() {
        // The same path listed everywhere still gets exactly one class.
        let table = RouteTable::new("/x", ["/x", "/y"], ["/x", "/y", "/z"]);
        assert_eq!(table.classify("/x"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/y"), RouteClass::AuthRoute);
        assert_eq!(table.classify("/z"), RouteClass::Public);
    }

    #[test]
    fn configured_prefix_is_used_verbatim() {
        let table = RouteTable::new("/api/auth/", AUTH_ROUTES, PUBLIC_ROUTES);
        assert_eq!(table.classify("/api/auth/signout"), RouteClass::ApiAuth);
        assert_eq!(table.classify("/api/auth"), RouteClass::Protected);
    }
}
