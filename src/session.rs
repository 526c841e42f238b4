//! Session handling with encrypted private cookies.
//!
//! The session is a single typed value ([Sesion]) serialized into one private
//! cookie. It is only ever written in three places: login sets it, logout
//! clears it, and the guard middleware refreshes its expiry. Handlers read it
//! through `Extension(sesion)` after the guard has validated it.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderName, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use axum_htmx::HxRedirect;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, endpoints};

pub(crate) const COOKIE_SESION: &str = "sesion";

/// The default duration for which session cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Marker header that [Error::Unauthorized] responses carry so the guard
/// middleware, which owns the cookie key, can append the cookie invalidation.
/// Stripped before the response leaves the server.
pub(crate) const SESSION_EXPIRED_HEADER: HeaderName =
    HeaderName::from_static("x-sesion-caducada");

/// The authenticated session: the backend's bearer token plus the username it
/// was issued to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sesion {
    /// The bearer token the backend issued.
    pub token: String,
    /// The username the token was issued to.
    pub username: String,
}

/// Add the session cookie to the jar, expiring `duration` from now.
///
/// # Errors
///
/// Returns [Error::JsonError] if the session cannot be serialized.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    sesion: &Sesion,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let value =
        serde_json::to_string(sesion).map_err(|error| Error::JsonError(error.to_string()))?;
    let expiry = OffsetDateTime::now_utc() + duration;

    Ok(jar.add(
        Cookie::build((COOKIE_SESION, value))
            .expires(expiry)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Set the session cookie to an invalid value with max age zero, which deletes
/// the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read and parse the session cookie.
pub(crate) fn get_session_from_cookies(jar: &PrivateCookieJar) -> Result<Sesion, Error> {
    let cookie = jar.get(COOKIE_SESION).ok_or(Error::SessionMissing)?;

    serde_json::from_str(cookie.value_trimmed()).map_err(|error| {
        tracing::debug!("Could not parse session cookie: {error}");
        Error::SessionMissing
    })
}

/// The state needed by the session guard middleware.
#[derive(Clone)]
pub struct SessionState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which session cookies are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SessionState> for Key {
    fn from_ref(state: &SessionState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware that requires a valid session cookie.
///
/// On success the [Sesion] is placed into the request extensions and the
/// cookie expiry is refreshed on the way out. If a handler reports an expired
/// token via the [SESSION_EXPIRED_HEADER] marker, the invalidation cookie is
/// appended instead.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(sesion): Extension<Sesion>` to receive the session.
#[inline]
async fn session_guard_internal(
    state: SessionState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };
    let sesion = match get_session_from_cookies(&jar) {
        Ok(sesion) => sesion,
        Err(_) => return get_redirect(endpoints::LOG_IN_VIEW),
    };

    parts.extensions.insert(sesion.clone());
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();

    let jar = if parts.headers.remove(SESSION_EXPIRED_HEADER).is_some() {
        invalidate_session_cookie(jar)
    } else {
        match set_session_cookie(jar.clone(), &sesion, state.cookie_duration) {
            Ok(updated_jar) => updated_jar,
            Err(err) => {
                tracing::error!("Error refreshing session cookie: {err}. Rolling back.");
                jar
            }
        }
    };

    for (key, value) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, value.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Session guard for page routes: missing or invalid sessions get a plain
/// redirect to the log-in page.
pub async fn session_guard(
    State(state): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Session guard for HTMX-driven routes: missing or invalid sessions get an
/// `HX-Redirect` to the log-in page so the client performs a full navigation.
pub async fn session_guard_hx(
    State(state): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    session_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::Error;

    use super::{
        COOKIE_SESION, DEFAULT_COOKIE_DURATION, Sesion, get_session_from_cookies,
        invalidate_session_cookie, set_session_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    fn test_session() -> Sesion {
        Sesion {
            token: "abc123".to_owned(),
            username: "ana".to_owned(),
        }
    }

    #[test]
    fn session_round_trips_through_cookie() {
        let jar =
            set_session_cookie(get_jar(), &test_session(), DEFAULT_COOKIE_DURATION).unwrap();

        let sesion = get_session_from_cookies(&jar).unwrap();

        assert_eq!(sesion, test_session());
    }

    #[test]
    fn cookie_expires_after_the_given_duration() {
        let jar = set_session_cookie(get_jar(), &test_session(), Duration::minutes(5)).unwrap();

        let cookie = jar.get(COOKIE_SESION).unwrap();
        let expiry = cookie.expires_datetime().unwrap();
        let want = OffsetDateTime::now_utc() + Duration::minutes(5);

        assert!((expiry - want).abs() < Duration::seconds(1));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        assert_eq!(
            get_session_from_cookies(&get_jar()),
            Err(Error::SessionMissing)
        );
    }

    #[test]
    fn invalidated_cookie_no_longer_parses() {
        let jar =
            set_session_cookie(get_jar(), &test_session(), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_session_cookie(jar);
        let cookie = jar.get(COOKIE_SESION).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_session_from_cookies(&jar), Err(Error::SessionMissing));
    }
}
