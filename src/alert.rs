//! Alert partials for transient success and error messages.
//!
//! Mutation handlers answer HTMX requests with these partials; the
//! response-targets extension swaps them into the fixed alert container of the
//! base layout.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

/// A transient alert with a title and a detail line.
pub struct Alert {
    kind: AlertKind,
    title: String,
    detail: String,
}

impl Alert {
    pub fn success(title: &str, detail: &str) -> Self {
        Self {
            kind: AlertKind::Success,
            title: title.to_owned(),
            detail: detail.to_owned(),
        }
    }

    pub fn error(title: &str, detail: &str) -> Self {
        Self {
            kind: AlertKind::Error,
            title: title.to_owned(),
            detail: detail.to_owned(),
        }
    }

    pub fn into_markup(self) -> Markup {
        let color_style = match self.kind {
            AlertKind::Success => {
                "text-green-800 border-green-300 bg-green-50 \
                dark:text-green-400 dark:border-green-800"
            }
            AlertKind::Error => {
                "text-red-800 border-red-300 bg-red-50 \
                dark:text-red-400 dark:border-red-800"
            }
        };

        html!(
            div
                id="alert"
                class={ "flex items-center p-4 mb-4 border rounded-lg dark:bg-gray-800 " (color_style) }
                role="alert"
            {
                div class="ms-3 text-sm font-medium"
                {
                    p class="font-semibold" { (self.title) }

                    @if !self.detail.is_empty() {
                        p { (self.detail) }
                    }
                }

                button
                    type="button"
                    class="ms-auto -mx-1.5 -my-1.5 rounded-lg p-1.5 inline-flex items-center justify-center h-8 w-8"
                    onclick="this.closest('#alert').remove()"
                    aria-label="Cerrar"
                {
                    "✕"
                }
            }
        )
    }

    /// Render as an HTTP response with the given status.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, self.into_markup()).into_response()
    }
}

/// The backend's validation message for a ticket without products.
const EMPTY_PRODUCTS_MESSAGE: &str = "productos no puede estar vacío";

/// Map a raw backend rejection body to a message fit for the alert box.
///
/// Recognized validation messages get specific, friendlier text; anything else
/// falls back to a generic message so internals never leak into the UI.
pub fn friendly_backend_message(raw: &str) -> String {
    if raw.contains(EMPTY_PRODUCTS_MESSAGE) {
        return "La lista de productos no puede estar vacía. Añade al menos un producto."
            .to_owned();
    }

    "No se pudo completar la operación. Inténtalo de nuevo más tarde.".to_owned()
}

#[cfg(test)]
mod alert_tests {
    use super::{Alert, friendly_backend_message};

    #[test]
    fn recognized_backend_message_gets_specific_text() {
        let friendly =
            friendly_backend_message("El campo de productos no puede estar vacío.");

        assert!(friendly.contains("lista de productos"));
    }

    #[test]
    fn unrecognized_backend_message_gets_generic_text() {
        let friendly = friendly_backend_message("NullPointerException at line 42");

        assert!(!friendly.contains("NullPointerException"));
        assert!(friendly.contains("No se pudo completar"));
    }

    #[test]
    fn alert_markup_contains_title_and_detail() {
        let markup = Alert::error("Error al borrar", "El registro no existe.").into_markup();
        let rendered = markup.into_string();

        assert!(rendered.contains("Error al borrar"));
        assert!(rendered.contains("El registro no existe."));
    }
}
