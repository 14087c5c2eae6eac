//! REST API client for the CC-Agency HTTP endpoints.
//!
//! Wraps the CC-Agency HTTP API (credential verification, RED submission,
//! batch listing, cancellation, debug info retrieval) using [`reqwest`].

use reqwest::header::{COOKIE, SET_COOKIE};

use nbrelay_core::red::RedDocument;
use nbrelay_core::url::{join_url, normalize_url};

use crate::batch::{extract_history_debug_info, single_batch, Batch, BatchFilter, SubmitResponse};

/// Name of the authorization cookie issued by CC-Agency at login.
pub const AUTHORIZATION_COOKIE_KEY: &str = "authorization_cookie";

/// HTTP client for a single CC-Agency deployment.
pub struct AgencyApi {
    client: reqwest::Client,
    /// Normalized base URL (scheme and trailing slash guaranteed).
    base_url: String,
}

/// Errors from the CC-Agency REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum AgencyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The agency returned a non-2xx status code.
    #[error("CC-Agency API error ({status}) at {url}: {body}")]
    ApiError {
        /// Full request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A successful login response did not include the expected cookie.
    #[error("agency login response did not set an authorization cookie")]
    MissingAuthCookie,

    /// An experiment did not resolve to exactly one batch.
    #[error("expected exactly one batch for experiment {experiment_id}, found {found}")]
    BatchResolution {
        experiment_id: String,
        found: usize,
    },

    /// Neither stderr nor the batch history yielded diagnostic text.
    #[error("no debug information available for batch {batch_id}")]
    DebugInfoUnavailable { batch_id: String },
}

impl AgencyApi {
    /// Create a new API client for an agency deployment.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://agency.example.org/cc`.
    ///   Normalized to carry a scheme and trailing slash.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across agency deployments).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_url(base_url),
        }
    }

    /// Normalized base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verify agency credentials and obtain an authorization cookie.
    ///
    /// Sends a `GET /nodes` request with basic auth. The agency answers a
    /// valid login with a `Set-Cookie` header carrying the authorization
    /// cookie; the cookie value is returned for storage and reuse.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, AgencyApiError> {
        let url = join_url(&self.base_url, "nodes");
        let response = self
            .client
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let response = Self::ensure_success(&url, response).await?;

        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| parse_set_cookie_value(header, AUTHORIZATION_COOKIE_KEY))
            .ok_or(AgencyApiError::MissingAuthCookie)
    }

    /// Submit a RED document for execution.
    ///
    /// Sends a `POST /red` request with the document as JSON body.
    /// Returns the agency-assigned experiment ID.
    pub async fn submit_red(
        &self,
        cookie: &str,
        red: &RedDocument,
    ) -> Result<String, AgencyApiError> {
        let url = join_url(&self.base_url, "red");
        let response = self
            .client
            .post(&url)
            .header(COOKIE, Self::cookie_header(cookie))
            .json(red)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(&url, response).await?;
        Ok(submitted.experiment_id)
    }

    /// List batches matching a filter.
    ///
    /// Sends a `GET /batches` request with the filter rendered as query
    /// parameters.
    pub async fn list_batches(
        &self,
        cookie: &str,
        filter: &BatchFilter,
    ) -> Result<Vec<Batch>, AgencyApiError> {
        let url = join_url(&self.base_url, "batches");
        let response = self
            .client
            .get(&url)
            .query(&filter.query_params())
            .header(COOKIE, Self::cookie_header(cookie))
            .send()
            .await?;

        Self::parse_response(&url, response).await
    }

    /// Fetch a single batch document, including its history.
    pub async fn get_batch(&self, cookie: &str, batch_id: &str) -> Result<Batch, AgencyApiError> {
        let url = join_url(&self.base_url, &format!("batches/{batch_id}"));
        let response = self
            .client
            .get(&url)
            .header(COOKIE, Self::cookie_header(cookie))
            .send()
            .await?;

        Self::parse_response(&url, response).await
    }

    /// Cancel the batch belonging to an experiment.
    ///
    /// Resolves the experiment to exactly one batch first; zero or
    /// multiple batches abort the cancel before any DELETE is issued.
    /// Returns the cancelled batch ID.
    pub async fn cancel_batch(
        &self,
        cookie: &str,
        experiment_id: &str,
    ) -> Result<String, AgencyApiError> {
        let filter = BatchFilter::Experiment(experiment_id.to_string());
        let batches = self.list_batches(cookie, &filter).await?;
        let batch = single_batch(batches, experiment_id)?;

        let url = join_url(&self.base_url, &format!("batches/{}", batch.id));
        let response = self
            .client
            .delete(&url)
            .header(COOKIE, Self::cookie_header(cookie))
            .send()
            .await?;
        Self::check_status(&url, response).await?;

        Ok(batch.id)
    }

    /// Retrieve diagnostic output for a failed batch.
    ///
    /// Reads the captured stderr stream first; when that is empty or
    /// unavailable, falls back to scanning the batch history.
    pub async fn fetch_debug_info(
        &self,
        cookie: &str,
        batch_id: &str,
    ) -> Result<String, AgencyApiError> {
        match self.fetch_stderr(cookie, batch_id).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                tracing::debug!("batch {batch_id} has empty stderr, scanning history");
            }
            Err(error) => {
                tracing::warn!("stderr unavailable for batch {batch_id}: {error}");
            }
        }

        let batch = self.get_batch(cookie, batch_id).await?;
        extract_history_debug_info(&batch.history).ok_or_else(|| {
            AgencyApiError::DebugInfoUnavailable {
                batch_id: batch_id.to_string(),
            }
        })
    }

    async fn fetch_stderr(&self, cookie: &str, batch_id: &str) -> Result<String, AgencyApiError> {
        let url = join_url(&self.base_url, &format!("batches/{batch_id}/stderr"));
        let response = self
            .client
            .get(&url)
            .header(COOKIE, Self::cookie_header(cookie))
            .send()
            .await?;
        let response = Self::ensure_success(&url, response).await?;
        Ok(response.text().await?)
    }

    // ---- private helpers ----

    /// Render the outbound `Cookie` header value.
    fn cookie_header(cookie: &str) -> String {
        format!("{AUTHORIZATION_COOKIE_KEY}={cookie}")
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`AgencyApiError::ApiError`]
    /// containing the URL, status, and body text on failure.
    async fn ensure_success(
        url: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AgencyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AgencyApiError::ApiError {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, AgencyApiError> {
        let response = Self::ensure_success(url, response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(url: &str, response: reqwest::Response) -> Result<(), AgencyApiError> {
        Self::ensure_success(url, response).await?;
        Ok(())
    }
}

/// Extract a cookie value from a `Set-Cookie` header line.
///
/// Only the leading `name=value` pair counts; attributes after the first
/// `;` are ignored.
fn parse_set_cookie_value(header: &str, name: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (key, value) = pair.split_once('=')?;
    if key.trim() == name {
        Some(value.trim().to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_cookie_plain_pair() {
        assert_eq!(
            parse_set_cookie_value("authorization_cookie=abc123", "authorization_cookie"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_parse_set_cookie_ignores_attributes() {
        let header = "authorization_cookie=abc123; Path=/; HttpOnly; Expires=Wed, 21 Oct 2026 07:28:00 GMT";
        assert_eq!(
            parse_set_cookie_value(header, "authorization_cookie"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_parse_set_cookie_rejects_other_names() {
        assert_eq!(
            parse_set_cookie_value("session=abc123; Path=/", "authorization_cookie"),
            None
        );
    }

    #[test]
    fn test_parse_set_cookie_rejects_malformed_header() {
        assert_eq!(parse_set_cookie_value("garbage", "authorization_cookie"), None);
    }

    #[test]
    fn test_cookie_header_format() {
        assert_eq!(
            AgencyApi::cookie_header("abc123"),
            "authorization_cookie=abc123"
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        let api = AgencyApi::new("agency.example.org/cc");
        assert_eq!(api.base_url(), "https://agency.example.org/cc/");
    }
}
