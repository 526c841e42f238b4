//! The request plumbing shared by all backend endpoints.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::Error;

/// A cheaply clonable client for the expense backend.
///
/// The bearer token is not stored here; each call takes the token of the
/// session making the request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`, e.g.
    /// `https://gesthor.example.com`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The absolute URL for an API path such as `/api/gastos/`.
    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(super) fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(token)
    }

    pub(super) fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(token)
    }

    pub(super) fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.put(self.url(path)).bearer_auth(token)
    }

    pub(super) fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.delete(self.url(path)).bearer_auth(token)
    }

    /// A request without a bearer token. Only the login endpoint uses this.
    pub(super) fn post_unauthenticated(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    /// Send a request and map HTTP failures onto the crate error taxonomy.
    ///
    /// A 401 means the token has expired or been revoked; callers translate
    /// [Error::Unauthorized] into a session invalidation. Other non-success
    /// statuses carry the backend's message body so mutation handlers can map
    /// recognized validation messages to friendlier text.
    pub(super) async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("The backend rejected the request ({status}): {body}");
                Err(Error::BackendRejected(body))
            }
        }
    }

    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, Error> {
        let response = self.send(request).await?;

        response
            .json()
            .await
            .map_err(|error| Error::JsonError(error.to_string()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::FetchFailed(value.to_string())
    }
}

#[cfg(test)]
mod client_tests {
    use super::ApiClient;

    #[test]
    fn url_joins_base_and_path() {
        let client = ApiClient::new("https://backend.example.com");

        assert_eq!(
            client.url("/api/gastos/"),
            "https://backend.example.com/api/gastos/"
        );
    }

    #[test]
    fn url_tolerates_trailing_slash_in_base() {
        let client = ApiClient::new("https://backend.example.com/");

        assert_eq!(
            client.url("/api/categorias"),
            "https://backend.example.com/api/categorias"
        );
    }
}
