//! The login call against the backend's authentication endpoint.

use serde::{Deserialize, Serialize};

use crate::Error;

use super::ApiClient;

const AUTHENTICATE: &str = "/auth/authenticate";

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCredentials] when the backend rejects the
    /// credentials, and [Error::FetchFailed] when it cannot be reached.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, Error> {
        let request = self
            .post_unauthenticated(AUTHENTICATE)
            .json(&AuthRequest {
                user: username,
                password,
            });

        match self.send_json::<AuthResponse>(request).await {
            Ok(response) => Ok(response.token),
            // The backend answers 401 to wrong credentials; at this endpoint
            // that is not an expired session.
            Err(Error::Unauthorized) => Err(Error::InvalidCredentials),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod auth_tests {
    use super::{AuthRequest, AuthResponse};

    #[test]
    fn request_uses_backend_field_names() {
        let body = serde_json::to_string(&AuthRequest {
            user: "ana",
            password: "secreta",
        })
        .unwrap();

        assert_eq!(body, r#"{"user":"ana","password":"secreta"}"#);
    }

    #[test]
    fn response_parses_token() {
        let response: AuthResponse = serde_json::from_str(r#"{"token":"abc123"}"#).unwrap();

        assert_eq!(response.token, "abc123");
    }
}
