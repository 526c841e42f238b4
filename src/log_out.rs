//! Route handler for logging out.

use axum::response::Redirect;
use axum_extra::extract::PrivateCookieJar;

use crate::{endpoints, session::invalidate_session_cookie};

/// Invalidate the session cookie and send the user back to the log-in page.
///
/// The backend's tokens are stateless, so there is nothing to revoke server
/// side; dropping the cookie is the whole operation.
pub async fn get_log_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (
        invalidate_session_cookie(jar),
        Redirect::to(endpoints::LOG_IN_VIEW),
    )
}

#[cfg(test)]
mod log_out_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        endpoints,
        session::{COOKIE_SESION, DEFAULT_COOKIE_DURATION, SessionState},
    };

    use super::get_log_out;

    #[tokio::test]
    async fn log_out_deletes_the_cookie_and_redirects() {
        let hash = Sha512::digest("opaque secret");
        let state = SessionState {
            cookie_key: axum_extra::extract::cookie::Key::from(&hash),
            cookie_duration: DEFAULT_COOKIE_DURATION,
        };
        let app = Router::new()
            .route(endpoints::LOG_OUT, get(get_log_out))
            .with_state(state);
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);

        let cookie = response.cookie(COOKIE_SESION);
        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
