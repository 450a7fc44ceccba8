use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, AuthResponse, LoginRequest, RegisterRequest};
use crate::config::Config;
use crate::error::GatewayError;
use crate::models::Identity;
use crate::storage::TokenStorage;

/// Holds the authenticated identity and the client bound to its token.
/// Built once in `main` and handed to whoever needs it.
pub struct SessionStore {
    storage: TokenStorage,
    anonymous: ApiClient,
    client: Option<ApiClient>,
    identity: Option<Identity>,
}

impl SessionStore {
    pub fn new(config: &Config) -> Result<Self> {
        let anonymous = ApiClient::new(config).context("Failed to create HTTP client")?;

        Ok(Self {
            storage: TokenStorage::new(config.session_path()),
            anonymous,
            client: None,
            identity: None,
        })
    }

    /// Restore a previous session: take the env token or the stored one and
    /// confirm it against the profile endpoint. A token the server refuses is
    /// discarded; a network failure keeps it for the next run.
    pub async fn bootstrap(&mut self, config: &Config) -> Result<Option<&Identity>> {
        let token = match config.env_token() {
            Some(token) => Some(token),
            None => self.storage.load()?.map(|s| s.token),
        };

        let Some(token) = token else {
            debug!("no stored session");
            return Ok(None);
        };

        let client = self.anonymous.with_token(token);
        match client.profile().await {
            Ok(identity) => {
                info!(user = %identity.id, role = ?identity.role, "session restored");
                self.client = Some(client);
                self.identity = Some(identity);
            }
            Err(GatewayError::Network(err)) => {
                return Err(anyhow::anyhow!("Could not reach the server: {}", err));
            }
            Err(err) => {
                warn!(error = %err, "stored token rejected, clearing session");
                self.storage.clear()?;
            }
        }

        Ok(self.identity.as_ref())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Identity> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .anonymous
            .login(&request)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message("Login failed")))?;

        self.adopt(response)
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<&Identity> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .anonymous
            .register(&request)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message("Registration failed")))?;

        self.adopt(response)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.client = None;
        self.identity = None;
        self.storage.clear()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }

    /// Authenticated client, if logged in
    pub fn client(&self) -> Option<&ApiClient> {
        self.client.as_ref()
    }

    fn adopt(&mut self, response: AuthResponse) -> Result<&Identity> {
        self.storage.save(&response.token)?;
        self.client = Some(self.anonymous.with_token(&response.token));
        info!(user = %response.identity.id, "signed in");
        Ok(self.identity.insert(response.identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn store(dir: &std::path::Path) -> SessionStore {
        let config = Config {
            home: dir.to_path_buf(),
            api_url: "http://127.0.0.1:9/api/".to_string(),
            ..Config::default()
        };
        SessionStore::new(&config).unwrap()
    }

    #[test]
    fn test_adopt_persists_token_and_logout_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = store(dir.path());
        assert!(session.identity().is_none());
        assert!(!session.is_admin());

        let response = AuthResponse {
            token: "jwt".to_string(),
            identity: Identity {
                id: "u1".to_string(),
                display_name: "Admin".to_string(),
                email: None,
                role: Role::Admin,
            },
        };
        session.adopt(response).unwrap();

        assert!(session.is_admin());
        assert!(session.client().is_some_and(ApiClient::has_token));
        assert!(dir.path().join("session.json").exists());

        session.logout().unwrap();
        assert!(session.identity().is_none());
        assert!(session.client().is_none());
        assert!(!dir.path().join("session.json").exists());
    }
}
