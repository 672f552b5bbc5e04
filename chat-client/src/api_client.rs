use anyhow::{Context, Result};
use chat::Identity;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// REST responses are wrapped as `{status_code, data}`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserSummary {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: UserSummary,
}

/// A successful login: the bearer token and the identity it carries.
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub identity: Identity,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Identity> {
        let url = format!("{}/api/auth/register", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest {
                username,
                email,
                password,
            })
            .send()
            .await
            .context("Failed to send register request")?;

        if !response.status().is_success() {
            anyhow::bail!("Registration failed: {}", response.status());
        }

        let body: ApiResponse<UserSummary> = response
            .json()
            .await
            .context("Failed to parse register response")?;
        Ok(Identity::new(body.data.id, body.data.username))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Login> {
        let url = format!("{}/api/auth/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .context("Failed to send login request")?;

        match response.status() {
            StatusCode::UNAUTHORIZED => anyhow::bail!("Login failed: invalid credentials"),
            status if !status.is_success() => anyhow::bail!("Login failed: {status}"),
            _ => {}
        }

        let body: ApiResponse<LoginResponse> = response
            .json()
            .await
            .context("Failed to parse login response")?;

        Ok(Login {
            token: body.data.token,
            identity: Identity::new(body.data.user.id, body.data.user.username),
        })
    }
}

/// The chat endpoint for a REST base URL, e.g. `http://host:5000` becomes
/// `ws://host:5000/ws`.
pub fn socket_url(base_url: &str, token: Option<&str>) -> String {
    let base_url = base_url.trim_end_matches('/');
    let socket_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };

    match token {
        Some(token) => format!("{socket_base}/ws?token={token}"),
        None => format!("{socket_base}/ws"),
    }
}
