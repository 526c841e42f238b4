//! GesThor Web is a server-rendered client for the GesThor expense backend.
//!
//! It fetches expense records over the backend's JSON API, normalizes and
//! aggregates them in memory, and serves HTML dashboards directly.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod api;
mod app_state;
mod dashboard;
mod endpoints;
mod filter;
mod filtro;
mod html;
mod log_in;
mod log_out;
mod logging;
mod model;
mod navigation;
mod not_found;
mod routing;
mod session;

pub use app_state::AppState;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use session::Sesion;

use crate::{
    alert::{Alert, friendly_backend_message},
    html::error_view,
    not_found::get_404_not_found_response,
    session::SESSION_EXPIRED_HEADER,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The backend rejected the username and password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session cookie is missing from the request or cannot be parsed.
    #[error("no valid session cookie in the request")]
    SessionMissing,

    /// A date string from the backend could not be parsed, or a date could
    /// not be formatted for the backend.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not parse date string \"{1}\": {0}")]
    InvalidDate(String, String),

    /// The backend could not be reached or did not answer.
    ///
    /// Views translate this into an error state; prior data stays visible and
    /// nothing is retried automatically.
    #[error("could not reach the backend: {0}")]
    FetchFailed(String),

    /// The backend answered with a non-success status.
    ///
    /// Carries the raw response body. Mutation handlers map recognized
    /// validation messages to friendlier text before showing them.
    #[error("the backend rejected the request: {0}")]
    BackendRejected(String),

    /// The backend answered 401: the bearer token has expired or been
    /// revoked. The session cookie must be invalidated and the user sent back
    /// to the log-in page.
    #[error("the session has expired")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An error occurred while serializing or deserializing JSON.
    #[error("could not process JSON: {0}")]
    JsonError(String),

    /// The multipart form could not be parsed as an image upload.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::Unauthorized => {
                // The session guard owns the cookie key; the marker header
                // tells it to append the invalidation cookie.
                let mut response = Redirect::to(endpoints::LOG_IN_VIEW).into_response();
                response
                    .headers_mut()
                    .insert(SESSION_EXPIRED_HEADER, HeaderValue::from_static("1"));

                response
            }
            Error::FetchFailed(detail) => {
                tracing::error!("Could not reach the backend: {detail}");
                render_internal_error(
                    "Sin conexión con el servidor",
                    "No se pudo contactar con el servidor de gastos. Inténtalo de nuevo en unos minutos.",
                )
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_error(
                    "Algo ha ido mal.",
                    "Inténtalo más tarde o revisa los registros del servidor.",
                )
            }
        }
    }
}

impl Error {
    pub(crate) fn into_alert_response(self) -> Response {
        match self {
            Error::Unauthorized => self.into_response(),
            Error::BackendRejected(body) => Alert::error(
                "No se pudo completar la operación",
                &friendly_backend_message(&body),
            )
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::FetchFailed(detail) => {
                tracing::error!("Could not reach the backend: {detail}");
                Alert::error(
                    "Sin conexión con el servidor",
                    "No se pudo contactar con el servidor de gastos. Inténtalo de nuevo.",
                )
                .into_response_with_status(StatusCode::BAD_GATEWAY)
            }
            Error::NotFound => Alert::error(
                "No encontrado",
                "El registro no existe. Actualiza la página por si ya se había borrado.",
            )
            .into_response_with_status(StatusCode::NOT_FOUND),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                Alert::error(
                    "Algo ha ido mal",
                    "Se produjo un error inesperado, revisa los registros del servidor.",
                )
                .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

pub(crate) fn render_internal_error(description: &str, fix: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_view("Error", "500", description, fix),
    )
        .into_response()
}
