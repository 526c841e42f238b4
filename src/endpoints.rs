//! The application's route URIs.
//!
//! For routes that take a parameter, e.g. '/filtros/{tipo}', use
//! [format_endpoint].

/// The root route which redirects to the expense dashboard.
pub const ROOT: &str = "/";
/// The expense dashboard, the landing page for logged in users.
pub const GASTOS_VIEW: &str = "/gastos";
/// The filter tool for one record type ('ticket', 'subscripcion' or 'gasto').
pub const FILTRO_VIEW: &str = "/filtros/{tipo}";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/login";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/logout";
/// The route to delete a record; the record type travels in the form body.
pub const DELETE_RECORD: &str = "/api/registros/{spent_id}/eliminar";
/// The route to upload a receipt image for a record.
pub const UPLOAD_IMAGE: &str = "/api/gastos/{spent_id}/imagen";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/filtros/{tipo}', '{tipo}' is the
/// parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: impl std::fmt::Display) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        value,
        &endpoint_path[param_end..]
    )
}
