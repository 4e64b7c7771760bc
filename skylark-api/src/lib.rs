//! REST boundary client: registration, login, token refresh, profile
//! fetch, and user search against the chat backend's JSON endpoints.
//!
//! Authentication is a bearer access token plus a separately stored
//! refresh token; a 401 on an authenticated call triggers one
//! refresh-then-retry before the error surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

mod tokens;

pub use tokens::{Credentials, TokenStore};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Human-readable message extracted from the response body's `error`
    /// field, or a generic fallback.
    #[error("{0}")]
    Server(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("not logged in")]
    MissingToken,
    #[error("token store: {0}")]
    TokenStore(#[from] std::io::Error),
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UserSearchResult {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    access_expires_at: i64,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.tokens.get()
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Logs in and persists the returned token triple.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let tokens: TokenResponse = Self::check(response).await?.json().await?;
        self.save_tokens(tokens)?;
        info!("logged in");
        Ok(())
    }

    /// Exchanges the stored refresh token for a new token triple.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let refresh_token = self
            .tokens
            .get()
            .map(|c| c.refresh_token.clone())
            .ok_or(ApiError::MissingToken)?;
        let response = self
            .http
            .post(self.url("/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let tokens: TokenResponse = Self::check(response).await?.json().await?;
        self.save_tokens(tokens)?;
        debug!("access token refreshed");
        Ok(())
    }

    /// Fetches the logged-in user's profile. A 401 gets one
    /// refresh-then-retry before the error is returned.
    pub async fn me(&mut self) -> Result<Profile, ApiError> {
        let response = self.authed_get(&self.url("/me")).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("profile fetch returned 401, refreshing");
            self.refresh().await?;
            let response = self.authed_get(&self.url("/me")).await?;
            return Ok(Self::check(response).await?.json().await?);
        }
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<UserSearchResult>, ApiError> {
        let response = self
            .http
            .get(self.url("/users/search"))
            .query(&[("q", query)])
            .bearer_auth(self.access_token()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Clears the persisted tokens.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.tokens.clear()?;
        info!("logged out");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn access_token(&self) -> Result<&str, ApiError> {
        self.tokens
            .get()
            .map(|c| c.access_token.as_str())
            .ok_or(ApiError::MissingToken)
    }

    async fn authed_get(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        Ok(self
            .http
            .get(url)
            .bearer_auth(self.access_token()?)
            .send()
            .await?)
    }

    fn save_tokens(&mut self, tokens: TokenResponse) -> Result<(), ApiError> {
        self.tokens.save(Credentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
        })?;
        Ok(())
    }

    /// Passes 2xx responses through; anything else becomes
    /// [`ApiError::Server`] with the message from the body's `error`
    /// field when one is present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("error")?.as_str().map(String::from))
            .unwrap_or_else(|| format!("request failed with status {status}"));
        Err(ApiError::Server(message))
    }
}
