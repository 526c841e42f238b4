//! The dashboard page: fetches the user's records, applies the view state
//! carried in the query string and renders the tables and charts.

use std::collections::HashMap;

use axum::{
    Extension,
    extract::{FromRef, Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    alert::Alert,
    api::{ApiClient, nombres_por_id},
    dashboard::{
        aggregation::{coste_acumulado, proyeccion_renovacion},
        charts::{
            DashboardChart, categorias_chart, charts_script, charts_view, datos_gasto_mensual,
            datos_productos, datos_top_categorias, gasto_mensual_chart, productos_chart,
        },
        controller::{DashboardController, LoadState},
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CHIP_ACTIVE_STYLE, CHIP_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, link,
    },
    model::{Detalle, Gasto, Producto, Subscripcion, TipoGasto},
    navigation::NavBar,
    session::Sesion,
};

/// The state needed to render the dashboard.
#[derive(Clone)]
pub struct DashboardState {
    /// The client for the expense backend.
    pub api: ApiClient,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
        }
    }
}

/// The dashboard view state, round-tripped through the query string so the
/// page stays stateless between requests.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// The active type chip as the backend's wire string, e.g. `TICKET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    /// The search text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Comma-separated indexes of the open detail panels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abiertos: Option<String>,
}

impl DashboardQuery {
    fn from_controller(controller: &DashboardController) -> Self {
        let abiertos = controller.detalles_abiertos();

        Self {
            year: Some(controller.año_activo()),
            tipo: controller.tipo_activo().map(|tipo| tipo.as_str().to_owned()),
            q: match controller.texto() {
                "" => None,
                texto => Some(texto.to_owned()),
            },
            abiertos: if abiertos.is_empty() {
                None
            } else {
                Some(
                    abiertos
                        .iter()
                        .map(usize::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                )
            },
        }
    }

    fn apply_to(&self, controller: &mut DashboardController) {
        if let Some(year) = self.year {
            controller.set_año(year);
        }

        if let Some(ref q) = self.q {
            controller.set_texto(q.clone());
        }

        controller.set_tipo(self.tipo.as_deref().and_then(TipoGasto::parse));

        if let Some(ref abiertos) = self.abiertos {
            for index in abiertos.split(',').filter_map(|text| text.parse().ok()) {
                controller.toggle_detalle(index);
            }
        }
    }
}

/// The dashboard URL carrying the given view state.
fn dashboard_url(query: &DashboardQuery) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(query_string) if !query_string.is_empty() => {
            format!("{}?{query_string}", endpoints::GASTOS_VIEW)
        }
        _ => endpoints::GASTOS_VIEW.to_owned(),
    }
}

fn url_from_controller(controller: &DashboardController) -> String {
    dashboard_url(&DashboardQuery::from_controller(controller))
}

/// Display the expense dashboard.
///
/// All records of the session user are fetched on every request; filtering and
/// aggregation happen here, not in the backend. When the fetch fails the page
/// renders an error banner with a retry link instead of the charts.
pub async fn get_gastos_page(
    State(state): State<DashboardState>,
    Extension(sesion): Extension<Sesion>,
    Query(query): Query<DashboardQuery>,
) -> Result<Markup, Error> {
    let hoy = OffsetDateTime::now_utc().date();
    let mut controller = DashboardController::new(hoy);
    controller.begin_load();

    // Categories come first so chart labels can resolve names.
    let nombres = match state.api.get_categorias(&sesion.token).await {
        Ok(categorias) => nombres_por_id(&categorias),
        Err(Error::Unauthorized) => return Err(Error::Unauthorized),
        Err(error) => {
            controller.load_failed(mensaje_de_error(&error));
            HashMap::new()
        }
    };

    if controller.error_message().is_none() {
        match state.api.get_full_spents(&sesion.token).await {
            Ok(gastos) => controller.load_succeeded(gastos),
            Err(Error::Unauthorized) => return Err(Error::Unauthorized),
            Err(error) => controller.load_failed(mensaje_de_error(&error)),
        }
    }

    query.apply_to(&mut controller);

    Ok(dashboard_view(&controller, &nombres, hoy))
}

fn mensaje_de_error(error: &Error) -> String {
    match error {
        Error::FetchFailed(detail) => {
            tracing::error!("Could not reach the backend: {detail}");
            "No se pudo contactar con el servidor de gastos.".to_owned()
        }
        error => {
            tracing::error!("Could not load the dashboard records: {error}");
            "No se pudieron cargar los gastos.".to_owned()
        }
    }
}

/// Handler for receipt image uploads, forwarded to the backend's OCR pipeline.
///
/// Answers with an alert partial that HTMX swaps into the alert container.
pub async fn post_upload_image(
    State(state): State<DashboardState>,
    Extension(sesion): Extension<Sesion>,
    Path(spent_id): Path<i64>,
    multipart: Multipart,
) -> Response {
    let (file_name, image) = match read_image_field(multipart).await {
        Ok(parts) => parts,
        Err(error) => return error.into_alert_response(),
    };

    match state
        .api
        .upload_spent_image(&sesion.token, spent_id, file_name, image)
        .await
    {
        Ok(()) => Alert::success(
            "Imagen subida",
            "El ticket se procesará en unos instantes.",
        )
        .into_response_with_status(StatusCode::OK),
        Err(error) => error.into_alert_response(),
    }
}

async fn read_image_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("ticket").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| Error::MultipartError(error.to_string()))?;

        return Ok((file_name, bytes.to_vec()));
    }

    Err(Error::MultipartError(
        "missing \"image\" field".to_owned(),
    ))
}

fn dashboard_view(
    controller: &DashboardController,
    nombres: &HashMap<i64, String>,
    hoy: Date,
) -> Markup {
    let filtrados = controller.filtrados();
    let ready = controller.state() == &LoadState::Ready;

    let dashboard_charts = if ready {
        build_dashboard_charts(controller, &filtrados, nombres)
    } else {
        Vec::new()
    };
    let product_charts = if ready {
        build_product_charts(controller, &filtrados)
    } else {
        Vec::new()
    };

    let mut head_elements = Vec::new();
    if ready {
        let all_charts: Vec<&DashboardChart> =
            dashboard_charts.iter().chain(product_charts.iter()).collect();
        head_elements.push(HeadElement::ScriptLink(
            "/static/echarts-5.6.0-min.js".to_owned(),
        ));
        head_elements.push(charts_script(&all_charts));
    }

    let content = html!(
        (NavBar::new(endpoints::GASTOS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl"
            {
                @if let Some(message) = controller.error_message() {
                    (error_banner(message, controller))
                }

                (filter_bar(controller))

                @if ready {
                    (charts_view(&dashboard_charts))
                }

                (gastos_table(controller, &filtrados, hoy))

                (subscripciones_panel(controller, hoy))
            }
        }
    );

    base("Gastos", &head_elements, &content)
}

fn build_dashboard_charts(
    controller: &DashboardController,
    filtrados: &[&Gasto],
    nombres: &HashMap<i64, String>,
) -> Vec<DashboardChart> {
    vec![
        DashboardChart {
            id: "gasto-mensual-chart".to_owned(),
            options: gasto_mensual_chart(&datos_gasto_mensual(filtrados), controller.año_activo())
                .to_string(),
        },
        DashboardChart {
            id: "categorias-chart".to_owned(),
            options: categorias_chart(&datos_top_categorias(filtrados, nombres)).to_string(),
        },
    ]
}

/// One chart per open ticket detail with at least one product.
fn build_product_charts(
    controller: &DashboardController,
    filtrados: &[&Gasto],
) -> Vec<DashboardChart> {
    filtrados
        .iter()
        .enumerate()
        .filter(|(index, _)| controller.detalle_abierto(*index))
        .filter_map(|(index, gasto)| {
            let productos = gasto.productos()?;

            if productos.is_empty() {
                return None;
            }

            Some(DashboardChart {
                id: format!("productos-{index}"),
                options: productos_chart(&datos_productos(productos)).to_string(),
            })
        })
        .collect()
}

fn error_banner(message: &str, controller: &DashboardController) -> Markup {
    let retry_url = url_from_controller(controller);

    html!(
        div
            id="error-banner"
            class="flex items-center justify-between p-4 mb-4 border rounded-lg
                text-red-800 border-red-300 bg-red-50 dark:bg-gray-800
                dark:text-red-400 dark:border-red-800"
            role="alert"
        {
            p class="text-sm font-medium" { (message) }

            (link(&retry_url, "Reintentar"))
        }
    )
}

fn filter_bar(controller: &DashboardController) -> Markup {
    html!(
        section id="filtros" class="w-full mb-4"
        {
            div class="flex flex-wrap items-center gap-4 mb-4"
            {
                (year_nav(controller))
                (search_form(controller))
            }

            (type_chips(controller))
        }
    )
}

fn year_nav(controller: &DashboardController) -> Markup {
    let year_link = |delta: i32, label: &str, id: &str| {
        let mut target = controller.clone();

        if target.change_year(delta) {
            let url = url_from_controller(&target);
            html!( a id=(id) href=(url) class=(LINK_STYLE) { (label) } )
        } else {
            html!( span id=(id) class="text-gray-400 dark:text-gray-600" { (label) } )
        }
    };

    html!(
        div id="year-nav" class="flex items-center gap-2 text-lg"
        {
            (year_link(-1, "\u{2039}", "year-prev"))

            span id="year-activo" class="font-semibold" { (controller.año_activo()) }

            (year_link(1, "\u{203A}", "year-next"))
        }
    )
}

fn search_form(controller: &DashboardController) -> Markup {
    let query = DashboardQuery::from_controller(controller);

    html!(
        form
            id="search-form"
            class="flex items-center gap-2 grow max-w-md"
            method="get"
            action=(endpoints::GASTOS_VIEW)
        {
            @if let Some(year) = query.year {
                input type="hidden" name="year" value=(year);
            }
            @if let Some(ref tipo) = query.tipo {
                input type="hidden" name="tipo" value=(tipo);
            }
            @if let Some(ref abiertos) = query.abiertos {
                input type="hidden" name="abiertos" value=(abiertos);
            }

            input
                type="search"
                name="q"
                value=(controller.texto())
                placeholder="Buscar gastos..."
                class=(FORM_TEXT_INPUT_STYLE);

            button type="submit" class=(BUTTON_PRIMARY_STYLE) style="width: auto" { "Buscar" }
        }
    )
}

/// One chip per record type. Clicking the active chip clears the selection.
fn type_chips(controller: &DashboardController) -> Markup {
    html!(
        div id="type-chips" class="flex flex-wrap gap-2"
        {
            @for tipo in TipoGasto::ALL {
                @let is_active = controller.tipo_activo() == Some(tipo);
                @let style = if is_active { CHIP_ACTIVE_STYLE } else { CHIP_STYLE };
                @let url = {
                    let mut target = controller.clone();
                    target.toggle_tipo(tipo);
                    url_from_controller(&target)
                };

                a href=(url) class=(style) { (tipo.label()) }
            }
        }
    )
}

fn gastos_table(controller: &DashboardController, filtrados: &[&Gasto], hoy: Date) -> Markup {
    html!(
        section id="gastos" class="w-full mb-4 relative overflow-x-auto shadow-md sm:rounded-lg"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Fecha" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Nombre" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Tipo" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Detalles" } }
                    }
                }

                tbody
                {
                    @if filtrados.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) colspan="5"
                            {
                                "No hay gastos que coincidan con los filtros."
                            }
                        }
                    }

                    @for (index, gasto) in filtrados.iter().enumerate() {
                        (gasto_row(controller, index, gasto))

                        @if controller.detalle_abierto(index) {
                            (detalle_row(index, gasto, hoy))
                        }
                    }
                }
            }
        }
    )
}

fn gasto_row(controller: &DashboardController, index: usize, gasto: &Gasto) -> Markup {
    let toggle_url = {
        let mut target = controller.clone();
        target.toggle_detalle(index);
        url_from_controller(&target)
    };
    let toggle_label = if controller.detalle_abierto(index) {
        "Ocultar"
    } else {
        "Detalles"
    };

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (gasto.fecha_compra) }
            td class=(TABLE_CELL_STYLE)
            {
                p class="font-medium text-gray-900 dark:text-white" { (gasto.name) }

                @if let Some(ref description) = gasto.description {
                    p class="text-xs" { (description) }
                }
            }
            td class=(TABLE_CELL_STYLE) { (gasto.tipo().label()) }
            td class=(TABLE_CELL_STYLE) { (format_currency(gasto.total)) }
            td class=(TABLE_CELL_STYLE)
            {
                a href=(toggle_url) class=(LINK_STYLE) { (toggle_label) }
            }
        }
    )
}

fn detalle_row(index: usize, gasto: &Gasto, hoy: Date) -> Markup {
    html!(
        tr id={ "detalle-" (index) } class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) colspan="5"
            {
                @match &gasto.detalle {
                    Detalle::Ticket { store, productos } => {
                        (ticket_detalle(index, gasto, store, productos))
                    }
                    Detalle::Subscripcion(subscripcion) => {
                        (subscripcion_detalle(gasto, subscripcion, hoy))
                    }
                    _ => {
                        p { "Este tipo de gasto no tiene detalles adicionales." }
                    }
                }
            }
        }
    )
}

fn ticket_detalle(index: usize, gasto: &Gasto, store: &str, productos: &[Producto]) -> Markup {
    html!(
        div class="space-y-4"
        {
            @if !store.is_empty() {
                p { "Tienda: " span class="font-medium" { (store) } }
            }

            @if productos.is_empty() {
                p { "Este ticket no tiene productos registrados." }
            } @else {
                table class="w-full text-xs"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th class=(TABLE_CELL_STYLE) { "Producto" }
                            th class=(TABLE_CELL_STYLE) { "Cantidad" }
                            th class=(TABLE_CELL_STYLE) { "Precio" }
                            th class=(TABLE_CELL_STYLE) { "Importe" }
                        }
                    }

                    tbody
                    {
                        @for producto in productos {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (producto.nombre) }
                                td class=(TABLE_CELL_STYLE) { (producto.cantidad) }
                                td class=(TABLE_CELL_STYLE) { (format_currency(producto.precio)) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (format_currency(producto.precio * producto.cantidad))
                                }
                            }
                        }
                    }
                }

                div
                    id={ "productos-" (index) }
                    class="min-h-[320px] rounded dark:bg-gray-100"
                {}
            }

            form
                hx-post=(format_endpoint(endpoints::UPLOAD_IMAGE, gasto.spent_id))
                hx-encoding="multipart/form-data"
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                hx-swap="innerHTML"
                class="flex items-center gap-2"
            {
                input type="file" name="image" accept="image/*" required;

                button type="submit" class=(BUTTON_PRIMARY_STYLE) style="width: auto"
                {
                    "Subir imagen del ticket"
                }
            }
        }
    )
}

fn subscripcion_detalle(gasto: &Gasto, subscripcion: &Subscripcion, hoy: Date) -> Markup {
    let proyeccion = proyeccion_renovacion(gasto.fecha_compra, hoy);
    let acumulado = coste_acumulado(
        gasto.total,
        subscripcion.start,
        subscripcion.end,
        subscripcion.interval_time,
        hoy,
    );
    let estado = if subscripcion.activa {
        "Activa"
    } else {
        "Cancelada"
    };

    html!(
        dl class="grid grid-cols-2 md:grid-cols-4 gap-4"
        {
            div
            {
                dt class="text-xs uppercase" { "Estado" }
                dd class="font-medium" { (estado) }
            }

            div
            {
                dt class="text-xs uppercase" { "Próxima renovación" }
                dd class="font-medium"
                {
                    (proyeccion.renovacion)
                    " (quedan " (proyeccion.dias_restantes) " de "
                    (proyeccion.dias_totales) " días)"
                }
            }

            div
            {
                dt class="text-xs uppercase" { "Intervalo" }
                dd class="font-medium" { (subscripcion.interval_time) " días" }
            }

            div
            {
                dt class="text-xs uppercase" { "Coste acumulado" }
                dd class="font-medium" { (format_currency(acumulado)) }
            }
        }
    )
}

fn subscripciones_panel(controller: &DashboardController, hoy: Date) -> Markup {
    let activas = controller.subscripciones_activas(hoy);

    html!(
        section id="subscripciones-activas" class="w-full mb-4"
        {
            h2 class="text-lg font-semibold mb-2" { "Suscripciones activas" }

            @if activas.is_empty() {
                p { "No hay suscripciones activas en la selección actual." }
            } @else {
                ul class="space-y-1"
                {
                    @for gasto in activas {
                        @let proyeccion = proyeccion_renovacion(gasto.fecha_compra, hoy);

                        li class="flex justify-between gap-4"
                        {
                            span { (gasto.name) }
                            span
                            {
                                (format_currency(gasto.total))
                                ", renueva el " (proyeccion.renovacion)
                            }
                        }
                    }
                }
            }
        }
    )
}


// Runs the full page flow against a throwaway in-process backend on a random
// local port: log in, carry the session cookie, fetch and render the records
// the backend serves.
#[cfg(test)]
mod dashboard_page_tests {
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints, session::COOKIE_SESION};

    const TOKEN: &str = "abc123";

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {TOKEN}");

        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some(expected.as_str())
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

        Json(json!([{ "categoriaId": 2, "name": "Comida", "iva": 10.0 }])).into_response()
    }

    async fn full_spents_route(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!([
            {
                "spentId": 1,
                "userId": 1,
                "categoriaId": 2,
                "name": "Compra Mercadona",
                "fechaCompra": "2024-02-10",
                "total": 9.0,
                "iva": 10.0,
                "typeExpense": "TICKET",
                "store": "Mercadona",
                "productsJSON": "[{\"nombre\":\"Leche\",\"categorias\":[],\"cantidad\":6.0,\"precio\":1.5}]",
            },
            {
                "spentId": 2,
                "userId": 1,
                "categoriaId": 3,
                "name": "Netflix",
                "fechaCompra": "2024-05-05",
                "total": 12.99,
                "iva": 21.0,
                "typeExpense": "SUBSCRIPCION",
                "start": "2024-01-05",
                "accumulate": 0.0,
                "restartDay": 5,
                "intervalTime": 30,
                "activa": true,
            },
        ]))
        .into_response()
    }

    async fn spawn_stub_backend() -> String {
        let router = Router::new()
            .route("/auth/authenticate", post(authenticate_route))
            .route("/api/categorias", get(categorias_route))
            .route("/api/gastos/fullspents", get(full_spents_route));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("could not bind the stub backend");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn dashboard_renders_the_records_the_backend_serves() {
        let backend_url = spawn_stub_backend().await;
        let state = AppState::new(&backend_url, "clave de prueba");
        let server =
            TestServer::new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", "ana"), ("password", "secreta")])
            .await;
        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::GASTOS_VIEW);
        let session_cookie = response.cookie(COOKIE_SESION);

        let response = server
            .get(endpoints::GASTOS_VIEW)
            .add_query_param("year", 2024)
            .add_cookie(session_cookie)
            .await;

        response.assert_status_ok();
        response.assert_text_contains("Compra Mercadona");
        response.assert_text_contains("Netflix");
        // The charts section and its ECharts options made it into the page.
        response.assert_text_contains("Gasto mensual");
        response.assert_text_contains("Comida");
    }

    #[tokio::test]
    async fn dashboard_with_wrong_credentials_never_reaches_the_records() {
        let backend_url = spawn_stub_backend().await;
        let state = AppState::new(&backend_url, "clave de prueba");
        let server =
            TestServer::new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", "ana"), ("password", "mal")])
            .await;

        response.assert_status_unauthorized();
        response.assert_text_contains("Usuario o contraseña incorrectos.");
    }
}
