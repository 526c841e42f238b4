//! The log-in page and the handler that exchanges credentials for a session.

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    api::ApiClient,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base},
    session::{Sesion, set_session_cookie},
};

/// The state needed for logging in a user.
#[derive(Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which session cookies are valid.
    pub cookie_duration: Duration,
    /// The client for the expense backend.
    pub api: ApiClient,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            api: state.api.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials a user logs in with.
#[derive(Debug, Deserialize)]
pub struct LogInForm {
    pub username: String,
    pub password: String,
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Markup {
    log_in_view(None)
}

/// Handler for log-in requests: exchanges the credentials for a backend token
/// and stores it in the session cookie.
///
/// Wrong credentials re-render the form with an error message. Backend
/// connectivity errors render the internal error page.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    match state.api.authenticate(&form.username, &form.password).await {
        Ok(token) => {
            let sesion = Sesion {
                token,
                username: form.username,
            };

            match set_session_cookie(jar, &sesion, state.cookie_duration) {
                Ok(jar) => (jar, Redirect::to(endpoints::GASTOS_VIEW)).into_response(),
                Err(error) => error.into_response(),
            }
        }
        Err(Error::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            log_in_view(Some("Usuario o contraseña incorrectos.")),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

fn log_in_view(error_message: Option<&str>) -> Markup {
    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            div
                class="w-full bg-white rounded-lg shadow dark:border sm:max-w-md
                    dark:bg-gray-800 dark:border-gray-700"
            {
                div class="p-6 space-y-4 sm:p-8"
                {
                    h1
                        class="text-xl font-bold leading-tight tracking-tight
                            text-gray-900 md:text-2xl dark:text-white"
                    {
                        "Inicia sesión"
                    }

                    form
                        class="space-y-4"
                        method="post"
                        action=(endpoints::LOG_IN_API)
                    {
                        div
                        {
                            label for="username" class=(FORM_LABEL_STYLE) { "Usuario" }
                            input
                                type="text"
                                name="username"
                                id="username"
                                class=(FORM_TEXT_INPUT_STYLE)
                                required;
                        }

                        div
                        {
                            label for="password" class=(FORM_LABEL_STYLE) { "Contraseña" }
                            input
                                type="password"
                                name="password"
                                id="password"
                                class=(FORM_TEXT_INPUT_STYLE)
                                placeholder="••••••••"
                                required;
                        }

                        @if let Some(message) = error_message {
                            p id="error-message" class="text-red-600 dark:text-red-500 text-sm"
                            {
                                (message)
                            }
                        }

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Entrar" }
                    }
                }
            }
        }
    );

    base("Iniciar sesión", &[], &content)
}
