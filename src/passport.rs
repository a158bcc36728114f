//! Login and third-party connect calls.
//!
//! The login response is kept as an opaque JSON document; the only field read
//! from it is `token.access_token`, which authorizes the connect call.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ArtQueryError;

pub const LOGIN_PATH: &str = "/api/v1/users/login";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Passport(pub serde_json::Value);

impl Passport {
    pub fn access_token(&self) -> Option<&str> {
        self.0.get("token")?.get("access_token")?.as_str()
    }
}

pub struct PassportClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PassportClient {
    pub fn new(base_url: Url) -> Self {
        PassportClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> Result<Url, ArtQueryError> {
        self.base_url
            .join(path)
            .map_err(|e| ArtQueryError::ConfigError(format!("Invalid path '{}': {}", path, e)))
    }

    /// Posts the login form and returns whatever the server hands back.
    pub async fn login(&self, fields: &[(&str, &str)]) -> Result<Passport, ArtQueryError> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH)?)
            .form(fields)
            .send()
            .await?
            .error_for_status()?;
        let passport: Passport = serde_json::from_str(&response.text().await?)?;
        info!("Logged in");
        Ok(passport)
    }

    /// Connects the logged-in account to `provider` (e.g. "google").
    /// Returns the HTTP status of the connect call.
    pub async fn connect(
        &self,
        provider: &str,
        passport: &Passport,
    ) -> Result<reqwest::StatusCode, ArtQueryError> {
        let token = passport.access_token().ok_or_else(|| {
            ArtQueryError::Error("Passport has no access token".to_string())
        })?;

        let mut url = self.url(&connect_path(provider))?;
        url.query_pairs_mut().append_pair("provider", provider);

        let response = self.http.get(url).bearer_auth(token).send().await?;
        debug!("Connect to {} answered {}", provider, response.status());
        Ok(response.status())
    }
}

fn connect_path(provider: &str) -> String {
    format!("/api/v1/users/{}/connect", provider)
}
