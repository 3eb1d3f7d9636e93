//! Clerk organization API client.
//!
//! [`OrganizationApi`] is the seam between the reconciler and the remote
//! side; [`ClerkClient`] implements it over the Clerk Backend API. Every call
//! is a single request/response exchange with no retries. Dropping the
//! returned future aborts the in-flight request.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, Operation, RemoteError};

/// An organization as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Server-assigned identifier (`org_...`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL-friendly identifier, generated from the name when not supplied.
    #[serde(default)]
    pub slug: String,
    /// Membership limit; zero or absent means no limit.
    #[serde(default)]
    pub max_allowed_memberships: Option<i64>,
    /// Metadata visible to the frontend.
    #[serde(default)]
    pub public_metadata: Option<Value>,
    /// Metadata visible only to the backend.
    #[serde(default)]
    pub private_metadata: Option<Value>,
    /// User that created the organization.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Last update time, epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

/// Body of `POST /organizations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateOrganizationParams {
    /// Display name.
    pub name: String,
    /// Explicit slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Membership limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed_memberships: Option<i64>,
    /// Creating user; only accepted at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Public metadata document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_metadata: Option<Value>,
    /// Private metadata document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<Value>,
}

/// Body of `PATCH /organizations/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOrganizationParams {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Membership limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed_memberships: Option<i64>,
    /// Public metadata document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_metadata: Option<Value>,
    /// Private metadata document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_metadata: Option<Value>,
}

/// The four organization calls the reconciler needs.
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    /// Create an organization.
    async fn create(&self, params: &CreateOrganizationParams)
        -> Result<Organization, RemoteError>;

    /// Fetch an organization by ID.
    async fn get(&self, id: &str) -> Result<Organization, RemoteError>;

    /// Update an organization in place.
    async fn update(
        &self,
        id: &str,
        params: &UpdateOrganizationParams,
    ) -> Result<Organization, RemoteError>;

    /// Delete an organization.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

/// HTTP client for the Clerk Backend API.
#[derive(Debug, Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ClerkClient {
    /// Build a client from its configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("organizations");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.url(id)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.http.request(method, url).bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(status, response.text().await);
        debug!(status = status.as_u16(), message = %message, "Request failed");

        if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(message))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn organization(response: reqwest::Response) -> Result<Organization, ClientError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// Message for a failed exchange: the Clerk error body when it parses, the raw
// body otherwise, the status reason when the body is empty.
fn error_message<E: std::fmt::Display>(status: StatusCode, body: Result<String, E>) -> String {
    let body = match body {
        Ok(body) => body,
        Err(e) => return format!("could not read error response body: {}", e),
    };
    api_error_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body
        }
    })
}

/// Pull a readable message out of a Clerk error body.
///
/// Clerk answers failures with `{"errors": [{"message", "long_message", "code"}]}`.
fn api_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        errors: Vec<ErrorEntry>,
    }

    #[derive(Deserialize)]
    struct ErrorEntry {
        message: Option<String>,
        long_message: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let messages: Vec<String> = parsed
        .errors
        .into_iter()
        .filter_map(|e| {
            let text = e.long_message.or(e.message)?;
            Some(match e.code {
                Some(code) => format!("{} ({})", text, code),
                None => text,
            })
        })
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[async_trait]
impl OrganizationApi for ClerkClient {
    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<Organization, RemoteError> {
        let wrap = |e| RemoteError::new(Operation::Create, e);
        let response = self
            .send(Method::POST, None, Some(params))
            .await
            .map_err(wrap)?;
        Self::organization(response).await.map_err(wrap)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Organization, RemoteError> {
        let wrap = |e| RemoteError::new(Operation::Get, e);
        let response = self
            .send::<()>(Method::GET, Some(id), None)
            .await
            .map_err(wrap)?;
        Self::organization(response).await.map_err(wrap)
    }

    #[instrument(skip(self, params))]
    async fn update(
        &self,
        id: &str,
        params: &UpdateOrganizationParams,
    ) -> Result<Organization, RemoteError> {
        let wrap = |e| RemoteError::new(Operation::Update, e);
        let response = self
            .send(Method::PATCH, Some(id), Some(params))
            .await
            .map_err(wrap)?;
        Self::organization(response).await.map_err(wrap)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.send::<()>(Method::DELETE, Some(id), None)
            .await
            .map_err(|e| RemoteError::new(Operation::Delete, e))?;
        Ok(())
    }
}
