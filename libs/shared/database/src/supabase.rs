use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl DatabaseError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DatabaseError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// PostgREST answers 409 when a unique or exclusion constraint rejects a write.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.supabase_url, &config.supabase_anon_key)
    }

    pub fn with_base_url(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>, prefer: Option<&'static str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key).map_err(|e| DatabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Service calls fall back to the project key as bearer
        let token = auth_token.unwrap_or(&self.anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| DatabaseError::InvalidHeader(e.to_string()))?,
        );

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<String, DatabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token, prefer)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("API error ({}): {}", status, text);
            return Err(DatabaseError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let text = self.send(method, path, auth_token, body, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Mutating request that asks PostgREST to echo the affected rows back.
    pub async fn request_with_representation<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let text = self
            .send(method, path, auth_token, body, Some("return=representation"))
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Insert-or-merge on the table's conflict target, echoing the stored rows.
    pub async fn upsert<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let text = self
            .send(
                Method::POST,
                path,
                auth_token,
                Some(body),
                Some("resolution=merge-duplicates,return=representation"),
            )
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Request whose response body is irrelevant (deletes, fire-and-forget patches).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), DatabaseError> {
        self.send(method, path, auth_token, body, Some("return=minimal")).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
