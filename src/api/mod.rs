//! The HTTP client for the expense backend.
//!
//! All data lives in the backend; this module wraps its JSON API with typed
//! methods, attaches the bearer token to every authenticated request, and maps
//! HTTP failures onto the crate [Error](crate::Error) taxonomy.

mod auth;
mod categorias;
mod client;
mod gastos;
mod subscripciones;
mod tickets;

pub use categorias::nombres_por_id;
pub use client::ApiClient;

// These tests run the client against a throwaway in-process backend bound to
// a random local port, so the bearer header, paths, query parameters and
// bodies are asserted over real HTTP.
#[cfg(test)]
mod stub_backend_tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::{Multipart, Path, Query},
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::{get, post, put},
    };
    use serde_json::{Value, json};

    use crate::{Error, model::TipoGasto};

    use super::ApiClient;

    const TOKEN: &str = "abc123";

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("could not bind the stub backend");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}")
    }

    async fn stub_client() -> ApiClient {
        ApiClient::new(&spawn_stub(stub_backend()).await)
    }

    fn stub_backend() -> Router {
        Router::new()
            .route("/auth/authenticate", post(authenticate_route))
            .route("/api/categorias", get(categorias_route))
            .route("/api/gastos/fullspents", get(full_spents_route))
            .route("/api/gastos/", get(gastos_route).post(echo_record))
            .route(
                "/api/gastos/{id}",
                get(gasto_by_id).put(echo_record_by_id).delete(delete_route),
            )
            .route("/api/gastos/me/uploadSpenseImage", put(upload_route))
            .route("/api/tickets/", get(tickets_route).post(echo_record))
            .route(
                "/api/tickets/{id}",
                get(ticket_by_id).put(echo_record_by_id).delete(delete_route),
            )
            .route(
                "/api/subscripciones/",
                get(subscripciones_route).post(echo_record),
            )
            .route(
                "/api/subscripciones/{id}",
                get(subscripcion_by_id)
                    .put(echo_record_by_id)
                    .delete(delete_route),
            )
    }

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {TOKEN}");

        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some(expected.as_str())
    }

    fn raw_generico(spent_id: i64) -> Value {
        json!({
            "spentId": spent_id,
            "userId": 1,
            "categoriaId": 2,
            "name": "Compra semanal",
            "fechaCompra": "2024-05-11",
            "total": 52.3,
            "iva": 21.0,
            "typeExpense": "GASTO_GENERICO",
        })
    }

    fn raw_ticket(spent_id: i64) -> Value {
        json!({
            "spentId": spent_id,
            "userId": 1,
            "categoriaId": 2,
            "name": "Compra Mercadona",
            "fechaCompra": "2024-02-10T00:00:00",
            "total": 9.0,
            "iva": 10.0,
            "typeExpense": "TICKET",
            "store": "Mercadona",
            "productsJSON": "[{\"nombre\":\"Leche\",\"categorias\":[],\"cantidad\":6.0,\"precio\":1.5}]",
        })
    }

    fn raw_subscripcion(spent_id: i64) -> Value {
        json!({
            "spentId": spent_id,
            "userId": 1,
            "categoriaId": 3,
            "name": "Netflix",
            "fechaCompra": "2024-01-05",
            "total": 12.99,
            "iva": 21.0,
            "typeExpense": "SUBSCRIPCION",
            "start": "2024-01-05",
            "accumulate": 0.0,
            "restartDay": 5,
            "intervalTime": 30,
            "activa": true,
        })
    }

    async fn authenticate_route(Json(body): Json<Value>) -> Response {
        if body["user"] == "ana" && body["password"] == "secreta" {
            Json(json!({ "token": TOKEN })).into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    async fn categorias_route(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!([
            { "categoriaId": 2, "name": "Comida", "iva": 10.0 },
            { "categoriaId": 3, "name": "Ocio", "iva": 21.0 },
        ]))
        .into_response()
    }

    async fn full_spents_route(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!([raw_generico(1), raw_ticket(2), raw_subscripcion(3)])).into_response()
    }

    async fn gastos_route(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        if params.get("clienteId").map(String::as_str) != Some("7") {
            return StatusCode::BAD_REQUEST.into_response();
        }

        Json(json!([raw_generico(1)])).into_response()
    }

    async fn tickets_route(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!([raw_ticket(9)])).into_response()
    }

    async fn subscripciones_route(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!([raw_subscripcion(3)])).into_response()
    }

    async fn gasto_by_id(headers: HeaderMap, Path(id): Path<i64>) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(raw_generico(id)).into_response()
    }

    async fn ticket_by_id(headers: HeaderMap, Path(id): Path<i64>) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(raw_ticket(id)).into_response()
    }

    async fn subscripcion_by_id(headers: HeaderMap, Path(id): Path<i64>) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(raw_subscripcion(id)).into_response()
    }

    async fn echo_record(headers: HeaderMap, Json(body): Json<Value>) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(body).into_response()
    }

    async fn echo_record_by_id(
        headers: HeaderMap,
        Path(_id): Path<i64>,
        Json(body): Json<Value>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(body).into_response()
    }

    async fn delete_route(headers: HeaderMap, Path(_id): Path<i64>) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        StatusCode::OK.into_response()
    }

    async fn upload_route(headers: HeaderMap, mut multipart: Multipart) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let mut file_name = None;
        let mut spent_id = None;

        while let Some(field) = multipart.next_field().await.unwrap() {
            match field.name() {
                Some("image") => {
                    file_name = field.file_name().map(str::to_owned);
                    assert_eq!(field.bytes().await.unwrap().as_ref(), b"fake image bytes");
                }
                Some("spentId") => spent_id = Some(field.text().await.unwrap()),
                _ => {}
            }
        }

        if file_name.as_deref() == Some("ticket.jpg") && spent_id.as_deref() == Some("42") {
            StatusCode::OK.into_response()
        } else {
            StatusCode::BAD_REQUEST.into_response()
        }
    }

    #[tokio::test]
    async fn authenticate_exchanges_credentials_for_the_token() {
        let client = stub_client().await;

        assert_eq!(client.authenticate("ana", "secreta").await.unwrap(), TOKEN);
        assert_eq!(
            client.authenticate("ana", "mal").await,
            Err(Error::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn full_spents_sends_the_bearer_token_and_normalizes_every_type() {
        let client = stub_client().await;

        let gastos = client.get_full_spents(TOKEN).await.unwrap();

        assert_eq!(gastos.len(), 3);
        let ticket = gastos
            .iter()
            .find(|gasto| gasto.tipo() == TipoGasto::Ticket)
            .unwrap();
        assert_eq!(ticket.productos().unwrap()[0].nombre, "Leche");

        assert_eq!(
            client.get_full_spents("caducado").await,
            Err(Error::Unauthorized)
        );
    }

    #[tokio::test]
    async fn categorias_are_fetched_with_the_bearer_token() {
        let client = stub_client().await;

        let categorias = client.get_categorias(TOKEN).await.unwrap();

        assert_eq!(categorias.len(), 2);
        assert_eq!(categorias[0].name, "Comida");
    }

    #[tokio::test]
    async fn gasto_crud_round_trips_through_the_wire_format() {
        let client = stub_client().await;

        let listado = client.get_gastos(TOKEN, Some(7)).await.unwrap();
        assert_eq!(listado.len(), 1);

        let gasto = client.get_gasto(TOKEN, 5).await.unwrap();
        assert_eq!(gasto.spent_id, 5);

        assert_eq!(client.create_gasto(TOKEN, &gasto).await.unwrap(), gasto);
        assert_eq!(client.update_gasto(TOKEN, &gasto).await.unwrap(), gasto);
        client.delete_gasto(TOKEN, 5).await.unwrap();
    }

    #[tokio::test]
    async fn ticket_crud_preserves_the_embedded_product_list() {
        let client = stub_client().await;

        let tickets = client.get_tickets(TOKEN).await.unwrap();
        assert_eq!(tickets.len(), 1);

        let ticket = client.get_ticket(TOKEN, 9).await.unwrap();
        assert_eq!(ticket.productos().unwrap()[0].nombre, "Leche");

        // The echo goes out double-encoded and comes back equal.
        assert_eq!(client.create_ticket(TOKEN, &ticket).await.unwrap(), ticket);
        assert_eq!(client.update_ticket(TOKEN, &ticket).await.unwrap(), ticket);
        client.delete_ticket(TOKEN, 9).await.unwrap();
    }

    #[tokio::test]
    async fn subscripcion_crud_round_trips_through_the_wire_format() {
        let client = stub_client().await;

        let subscripciones = client.get_subscripciones(TOKEN).await.unwrap();
        assert_eq!(subscripciones.len(), 1);

        let subscripcion = client.get_subscripcion(TOKEN, 3).await.unwrap();
        assert!(subscripcion.subscripcion().unwrap().activa);

        assert_eq!(
            client.create_subscripcion(TOKEN, &subscripcion).await.unwrap(),
            subscripcion
        );
        assert_eq!(
            client.update_subscripcion(TOKEN, &subscripcion).await.unwrap(),
            subscripcion
        );
        client.delete_subscripcion(TOKEN, 3).await.unwrap();
    }

    #[tokio::test]
    async fn image_upload_sends_the_multipart_parts_the_backend_expects() {
        let client = stub_client().await;

        client
            .upload_spent_image(TOKEN, 42, "ticket.jpg".to_owned(), b"fake image bytes".to_vec())
            .await
            .unwrap();
    }
}
