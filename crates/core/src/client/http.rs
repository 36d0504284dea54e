//! `ApiClient` construction, request plumbing and token acquisition.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};
use url::Url;

use super::auth::{AuthSession, AuthToken};
use super::{ApiError, extract_error_message};
use crate::draft::ContactMessage;
use crate::models::Page;

/// Largest page the backend serves; asking for it keeps list calls to one
/// request in the common case.
const PAGE_SIZE: u32 = 1000;

/// Whether a request must carry a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    Required,
    /// Send the token if the session has one.
    Optional,
}

/// Client for the inventory backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if `base_url` is not an absolute URL, or
    /// `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base = base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        // No request timeout: slow backend calls are waited out.
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Absolute URL for an `api/...` path.
    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange username and password for a token pair.
    ///
    /// The token is returned, not stored; callers put it in their session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` if the backend rejects the
    /// credentials, `ApiError::InvalidToken` if the issued token cannot be
    /// decoded.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AuthToken, ApiError> {
        let response = self
            .http()
            .post(self.url("api/token/")?)
            .json(&TokenRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: TokenResponse = response.json().await?;
            return AuthToken::new(body.access, body.refresh);
        }

        let text = response.text().await.unwrap_or_default();
        let message = extract_error_message(status.as_u16(), &text);
        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::BAD_REQUEST
        ) {
            warn!(%status, "Login rejected");
            Err(ApiError::InvalidCredentials(message))
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    // =========================================================================
    // Request execution
    // =========================================================================

    /// Send a request for `session`, mapping error statuses.
    ///
    /// A `401` invalidates the session before returning
    /// `ApiError::Unauthorized`.
    pub(crate) async fn send(
        &self,
        session: &AuthSession,
        request: reqwest::RequestBuilder,
        auth: Auth,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match auth {
            Auth::Required => {
                request.header(reqwest::header::AUTHORIZATION, session.bearer().await?)
            }
            Auth::Optional => match session.bearer().await {
                Ok(bearer) => request.header(reqwest::header::AUTHORIZATION, bearer),
                Err(_) => request,
            },
        };

        let response = request.send().await?;
        let status = response.status();
        debug!(%status, url = %response.url(), "Backend response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            session.invalidate().await;
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_error_message(status.as_u16(), &text),
            });
        }
        Ok(response)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        url: Url,
    ) -> Result<T, ApiError> {
        let response = self.send(session, self.http().get(url), Auth::Required).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http().post(self.url(path)?).json(body);
        let response = self.send(session, request, Auth::Required).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn patch_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http().patch(self.url(path)?).json(body);
        let response = self.send(session, request, Auth::Required).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn delete(&self, session: &AuthSession, path: &str) -> Result<(), ApiError> {
        let request = self.http().delete(self.url(path)?);
        self.send(session, request, Auth::Required).await?;
        Ok(())
    }

    /// Fetch every item of a list endpoint, following `next` links.
    ///
    /// A link to a page already fetched ends the walk.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page_size", &PAGE_SIZE.to_string());
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(url);
        while let Some(current) = next.take() {
            let page: Page<T> = self.get_json(session, current.clone()).await?;
            next = page.next().map(|link| current.join(link)).transpose()?;
            visited.insert(current);
            if next.as_ref().is_some_and(|link| visited.contains(link)) {
                warn!("Pagination loops back to a fetched page");
                next = None;
            }
            items.extend(page.into_items());
        }
        Ok(items)
    }

    // =========================================================================
    // Contact
    // =========================================================================

    /// Send a contact form message. Works with or without a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the message.
    #[instrument(skip(self, session, message), fields(subject = %message.subject))]
    pub async fn submit_contact(
        &self,
        session: &AuthSession,
        message: &ContactMessage,
    ) -> Result<(), ApiError> {
        let request = self.http().post(self.url("api/contact-form/")?).json(message);
        self.send(session, request, Auth::Optional).await?;
        Ok(())
    }
}
