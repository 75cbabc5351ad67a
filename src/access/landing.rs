use crate::models::Role;

pub const LOGIN_PATH: &str = "/auth/login";

/// LandingTable
///
/// Where each role lands after logging in. Also used by the access gate when an
/// authenticated user opens an auth route, so both agree on "home" for a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandingTable {
    client: String,
    signatory: String,
    admin: String,
    login: String,
}

impl Default for LandingTable {
    fn default() -> Self {
        LandingTable::new("/client", "/signatory", "/users", LOGIN_PATH)
    }
}

impl LandingTable {
    pub fn new(
        client: impl Into<String>,
        signatory: impl Into<String>,
        admin: impl Into<String>,
        login: impl Into<String>,
    ) -> Self {
        LandingTable {
            client: client.into(),
            signatory: signatory.into(),
            admin: admin.into(),
            login: login.into(),
        }
    }

    /// landing_for
    ///
    /// A missing role resolves to the login path, never to a protected area.
    pub fn landing_for(&self, role: Option<Role>) -> &str {
        match role {
            Some(Role::Client) => &self.client,
            Some(Role::Signatory) => &self.signatory,
            Some(Role::Admin) => &self.admin,
            None => &self.login,
        }
    }

    /// Same as `landing_for` for a role string as stored on the user record.
    pub fn landing_for_raw(&self, raw_role: &str) -> &str {
        self.landing_for(Role::parse(raw_role))
    }

    pub fn login_path(&self) -> &str {
        &self.login
    }
}
