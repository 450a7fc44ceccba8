use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::ChatGateway;
use crate::models::{Chat, Identity};
use crate::stats::{DailyCount, DiagnosisCount, OverallStats, Period, SymptomRecord};

/// Credentials for `auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login and register both answer with the identity plus a bearer token
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

/// HTTP client for the MedAssyst REST API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let mut base_url = config.api_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Copy of this client that authenticates with `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "api request");

        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, GatewayError> {
        let mut builder = self.request(reqwest::Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        decode(builder.send().await?).await
    }

    // Auth

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, GatewayError> {
        self.post("auth/register", Some(request)).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError> {
        self.post("auth/login", Some(request)).await
    }

    pub async fn profile(&self) -> Result<Identity, GatewayError> {
        self.get("auth/profile").await
    }

    // Statistics (admin only on the server side)

    pub async fn symptom_stats(&self, period: Period) -> Result<Vec<SymptomRecord>, GatewayError> {
        self.get(&format!("stats/symptoms?period={}", period.as_ref())).await
    }

    pub async fn daily_stats(&self, period: Period) -> Result<Vec<DailyCount>, GatewayError> {
        self.get(&format!("stats/daily?period={}", period.as_ref())).await
    }

    pub async fn diagnosis_stats(&self, period: Period) -> Result<Vec<DiagnosisCount>, GatewayError> {
        self.get(&format!("stats/diagnosis?period={}", period.as_ref())).await
    }

    pub async fn overall_stats(&self) -> Result<OverallStats, GatewayError> {
        self.get("stats/overall").await
    }
}

#[async_trait]
impl ChatGateway for ApiClient {
    async fn list_chats(&self, identity: &Identity) -> Result<Vec<Chat>, GatewayError> {
        debug!(user = %identity.id, "listing chats");
        self.get("chat").await
    }

    async fn get_chat(&self, id: &str) -> Result<Chat, GatewayError> {
        self.get(&format!("chat/{}", id)).await
    }

    async fn create_chat(&self, identity: &Identity) -> Result<Chat, GatewayError> {
        debug!(user = %identity.id, "creating chat");
        self.post::<(), _>("chat", None).await
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<Chat, GatewayError> {
        let body = SendMessageBody { content: text };
        self.post(&format!("chat/{}/messages", chat_id), Some(&body)).await
    }

    async fn close_chat(&self, chat_id: &str) -> Result<Chat, GatewayError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("chat/{}/close", chat_id))
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_status(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Map a non-success status and its body onto the error taxonomy
pub(crate) fn error_from_status(status: u16, body: &str) -> GatewayError {
    let message = server_message(body);
    match status {
        404 => GatewayError::NotFound(message),
        400 | 422 => GatewayError::Validation(message),
        _ => GatewayError::ServerRejected { status, message },
    }
}

/// The `message` field of a JSON error body, empty when absent
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> ApiClient {
        let config = Config {
            api_url: url.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:5000/api");
        assert_eq!(api.url("chat"), "http://localhost:5000/api/chat");
        assert_eq!(api.url("/chat/c1/messages"), "http://localhost:5000/api/chat/c1/messages");
    }

    #[test]
    fn test_with_token() {
        let api = client("http://localhost:5000/api/");
        assert!(!api.has_token());
        assert!(api.with_token("t").has_token());
    }

    #[test]
    fn test_error_from_status() {
        assert_eq!(
            error_from_status(404, r#"{"message":"Chat not found"}"#),
            GatewayError::NotFound("Chat not found".to_string())
        );
        assert_eq!(
            error_from_status(400, r#"{"message":"Content is required"}"#),
            GatewayError::Validation("Content is required".to_string())
        );
        assert_eq!(
            error_from_status(502, "<html>Bad gateway</html>"),
            GatewayError::ServerRejected {
                status: 502,
                message: String::new()
            }
        );
    }

    #[test]
    fn test_auth_response_flattens_identity() {
        let raw = r#"{"_id":"u1","name":"Dana","email":"d@example.com","role":"user","token":"jwt"}"#;
        let auth: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(auth.token, "jwt");
        assert_eq!(auth.identity.id, "u1");
        assert!(!auth.identity.is_admin());
    }
}
