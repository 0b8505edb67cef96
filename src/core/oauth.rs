//! Federated sign-in. The HTTP layer only sees [`IdentityProvider`]; Google
//! is the one concrete provider.

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

pub const CALLBACK_PATH: &str = "/api/auth/google/callback";

/// Profile returned by the identity provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page the browser is redirected to. `state` must come back
    /// unchanged on the callback.
    fn authorize_url(&self, state: &str) -> AppResult<String>;

    /// Trade an authorization code for the user's profile.
    async fn exchange(&self, code: &str) -> AppResult<FederatedIdentity>;
}

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

impl GoogleProvider {
    /// `None` when the client id / secret are not configured.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        let (client_id, client_secret) = cfg.google_credentials()?;
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: format!("{}{CALLBACK_PATH}", cfg.base_url.trim_end_matches('/')),
            http: reqwest::Client::new(),
        })
    }
}

fn oauth_err(stage: &str) -> impl FnOnce(reqwest::Error) -> AppError + '_ {
    move |e| AppError::OAuth(format!("{stage}: {e}"))
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::OAuth(e.to_string()))?;

        Ok(url.into())
    }

    async fn exchange(&self, code: &str) -> AppResult<FederatedIdentity> {
        let token: TokenResponse = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(oauth_err("token exchange"))?
            .json()
            .await
            .map_err(oauth_err("token response"))?;

        let info: UserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(oauth_err("userinfo"))?
            .json()
            .await
            .map_err(oauth_err("userinfo response"))?;

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::OAuth("Google profile has no email".into()))?;

        Ok(FederatedIdentity {
            email,
            name: info.name,
        })
    }
}
