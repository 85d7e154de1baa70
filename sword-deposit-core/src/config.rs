use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Server endpoint and credentials for one run.
///
/// Built once by the config loader and passed by reference afterwards; nothing
/// mutates it after load.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Service document IRI (`sdIRI`).
    pub sd_iri: String,
    pub user: String,
    pub pass: String,
    pub sso_token: Option<String>,
    /// Mediated deposit: the user the deposit is made on behalf of (`obo`).
    pub on_behalf_of: Option<String>,
    /// Per-request timeout applied by the transport.
    pub timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn new(sd_iri: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            sd_iri: sd_iri.into(),
            user: user.into(),
            pass: pass.into(),
            sso_token: None,
            on_behalf_of: None,
            timeout: None,
        }
    }

    pub fn credentials(&self) -> AuthCredentials {
        AuthCredentials {
            user: self.user.clone(),
            pass: self.pass.clone(),
            on_behalf_of: self.on_behalf_of.clone(),
            sso_token: self.sso_token.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            sd_iri = %self.sd_iri,
            user = %self.user,
            sso_token_set = self.sso_token.is_some(),
            on_behalf_of = self.on_behalf_of.as_deref().unwrap_or("-"),
            "Loaded server config"
        );
        debug!(?self, "Server config loaded (full debug)");
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("sd_iri", &self.sd_iri)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("sso_token", &self.sso_token.as_ref().map(|_| "<redacted>"))
            .field("on_behalf_of", &self.on_behalf_of)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Credentials sent with every request of a run.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    pub user: String,
    pub pass: String,
    pub on_behalf_of: Option<String>,
    pub sso_token: Option<String>,
}

impl AuthCredentials {
    /// Overrides the configured SSO token with one entered interactively.
    /// `None` keeps whatever the config provided.
    pub fn with_sso_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.sso_token = token;
        }
        self
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("user", &self.user)
            .field("on_behalf_of", &self.on_behalf_of)
            .field("sso_token_set", &self.sso_token.is_some())
            .finish_non_exhaustive()
    }
}
