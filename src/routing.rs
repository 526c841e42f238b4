//! Defines the app's routes and request handlers.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    response::{Redirect, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState, endpoints,
    dashboard::{get_gastos_page, post_upload_image},
    filtro::{delete_record, get_filtro_page},
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    logging::logging_middleware,
    not_found::get_404_not_found,
    render_internal_error,
    session::{SessionState, session_guard, session_guard_hx},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let session_state = SessionState::from_ref(&state);

    let protected_pages = Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::GASTOS_VIEW, get(get_gastos_page))
        .route(endpoints::FILTRO_VIEW, get(get_filtro_page))
        .route_layer(middleware::from_fn_with_state(
            session_state.clone(),
            session_guard,
        ));

    // Fragment routes answer HTMX requests, so an invalid session gets an
    // HX-Redirect instead of a plain 303.
    let protected_fragments = Router::new()
        .route(endpoints::DELETE_RECORD, post(delete_record))
        .route(endpoints::UPLOAD_IMAGE, post(post_upload_image))
        .route_layer(middleware::from_fn_with_state(
            session_state,
            session_guard_hx,
        ));

    let log_in = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route_layer(middleware::from_fn(logging_middleware));

    Router::new()
        .merge(protected_pages)
        .merge(protected_fragments)
        .merge(log_in)
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::INTERNAL_ERROR_VIEW, get(get_internal_error_page))
        .nest_service(endpoints::STATIC, ServeDir::new("static"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root of the app redirects to the expense dashboard.
async fn get_root() -> Redirect {
    Redirect::to(endpoints::GASTOS_VIEW)
}

async fn get_internal_error_page() -> Response {
    render_internal_error(
        "Algo ha ido mal.",
        "Inténtalo más tarde o revisa los registros del servidor.",
    )
}
