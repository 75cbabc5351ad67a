use super::{
    classify::{RouteClass, RouteTable},
    identity::Identity,
    landing::LandingTable,
};

/// Decision
///
/// Outcome of evaluating one request. The gate turns `RedirectTo` into a `302 Found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

/// AccessPolicy
///
/// Immutable routing policy: the route sets plus the landing table. Constructed once
/// and shared behind an `Arc`; evaluation holds no state between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    routes: RouteTable,
    landing: LandingTable,
}

impl AccessPolicy {
    pub fn new(routes: RouteTable, landing: LandingTable) -> Self {
        AccessPolicy { routes, landing }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn landing(&self) -> &LandingTable {
        &self.landing
    }

    /// decide
    ///
    /// | class     | anonymous       | authenticated          |
    /// |-----------|-----------------|------------------------|
    /// | ApiAuth   | allow           | allow                  |
    /// | AuthRoute | allow           | redirect to role home  |
    /// | Public    | allow           | allow                  |
    /// | Protected | redirect login  | allow                  |
    pub fn decide(&self, path: &str, identity: &Identity) -> Decision {
        match (self.routes.classify(path), identity) {
            (RouteClass::ApiAuth, _) => Decision::Allow,
            (RouteClass::AuthRoute, Identity::Authenticated { role, .. }) => {
                Decision::RedirectTo(self.landing.landing_for(Some(*role)).to_string())
            }
            (RouteClass::AuthRoute, Identity::Anonymous) => Decision::Allow,
            (RouteClass::Public, _) => Decision::Allow,
            (RouteClass::Protected, Identity::Authenticated { .. }) => Decision::Allow,
            (RouteClass::Protected, Identity::Anonymous) => {
                Decision::RedirectTo(self.landing.login_path().to_string())
            }
        }
    }
}
