//! The filter tool: one page per record type with type-specific criteria and
//! row deletion.

use axum::{
    Extension, Form,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    api::ApiClient,
    endpoints::{self, format_endpoint},
    filter::{EstadoSubscripcion, FiltroGastos},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    model::{Gasto, TipoGasto, parse_fecha},
    navigation::NavBar,
    session::Sesion,
};

/// The state needed by the filter tool.
#[derive(Clone)]
pub struct FiltroState {
    /// The client for the expense backend.
    pub api: ApiClient,
}

impl FromRef<AppState> for FiltroState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api: state.api.clone(),
        }
    }
}

/// The record types the filter tool has a page for, keyed by URL segment.
fn tipo_from_segment(segment: &str) -> Result<TipoGasto, Error> {
    match segment {
        "ticket" => Ok(TipoGasto::Ticket),
        "subscripcion" => Ok(TipoGasto::Subscripcion),
        "gasto" => Ok(TipoGasto::GastoGenerico),
        _ => Err(Error::NotFound),
    }
}

/// The raw filter form as it arrives in the query string.
///
/// Parsing is lenient: a field that cannot be parsed behaves as if it were
/// left empty, so a typo never breaks the page.
#[derive(Debug, Default, Deserialize)]
pub struct FiltroForm {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub desde: Option<String>,
    #[serde(default)]
    pub hasta: Option<String>,
    #[serde(default)]
    pub precio_min: Option<String>,
    #[serde(default)]
    pub precio_max: Option<String>,
    #[serde(default)]
    pub fecha_fin: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub producto: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
}

impl FiltroForm {
    fn criterios(&self, tipo: TipoGasto) -> FiltroGastos {
        FiltroGastos {
            texto: self.q.clone().unwrap_or_default(),
            fecha_desde: parse_fecha_lenient(self.desde.as_deref()),
            fecha_hasta: parse_fecha_lenient(self.hasta.as_deref()),
            tipo: Some(tipo),
            precio_min: parse_precio_lenient(self.precio_min.as_deref()),
            precio_max: parse_precio_lenient(self.precio_max.as_deref()),
            fecha_fin: parse_fecha_lenient(self.fecha_fin.as_deref()),
            estado: self
                .estado
                .as_deref()
                .and_then(EstadoSubscripcion::parse),
            producto_nombre: self.producto.clone().unwrap_or_default(),
            categoria_interna: self.categoria.clone().unwrap_or_default(),
        }
    }
}

fn parse_fecha_lenient(text: Option<&str>) -> Option<Date> {
    let text = text?.trim();

    if text.is_empty() {
        return None;
    }

    parse_fecha(text).ok()
}

fn parse_precio_lenient(text: Option<&str>) -> Option<f64> {
    text?.trim().parse().ok()
}

/// Display the filter tool for one record type.
pub async fn get_filtro_page(
    State(state): State<FiltroState>,
    Extension(sesion): Extension<Sesion>,
    Path(tipo): Path<String>,
    Query(form): Query<FiltroForm>,
) -> Result<Markup, Error> {
    let tipo = tipo_from_segment(&tipo)?;

    let (gastos, error_message) = match state.api.get_full_spents(&sesion.token).await {
        Ok(gastos) => (gastos, None),
        Err(Error::Unauthorized) => return Err(Error::Unauthorized),
        Err(Error::FetchFailed(detail)) => {
            tracing::error!("Could not reach the backend: {detail}");
            (
                Vec::new(),
                Some("No se pudo contactar con el servidor de gastos."),
            )
        }
        Err(error) => {
            tracing::error!("Could not load the records to filter: {error}");
            (Vec::new(), Some("No se pudieron cargar los gastos."))
        }
    };

    let criterios = form.criterios(tipo);
    let resultados: Vec<&Gasto> = gastos
        .iter()
        .filter(|gasto| criterios.matches(gasto))
        .collect();

    Ok(filtro_view(tipo, &form, &resultados, error_message))
}

fn filtro_view(
    tipo: TipoGasto,
    form: &FiltroForm,
    resultados: &[&Gasto],
    error_message: Option<&str>,
) -> Markup {
    let endpoint = format_endpoint(endpoints::FILTRO_VIEW, segment_for(tipo));

    let content = html!(
        (NavBar::new(&endpoint).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl"
            {
                h1 class="text-2xl font-bold mb-4" { "Filtrar " (tipo.label().to_lowercase()) "s" }

                @if let Some(message) = error_message {
                    div
                        id="error-banner"
                        class="p-4 mb-4 border rounded-lg text-red-800 border-red-300
                            bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
                        role="alert"
                    {
                        p class="text-sm font-medium" { (message) }
                    }
                }

                (criterios_form(tipo, form, &endpoint))

                (resultados_table(tipo, resultados))
            }
        }
    );

    base(&format!("Filtrar {}s", tipo.label().to_lowercase()), &[], &content)
}

fn segment_for(tipo: TipoGasto) -> &'static str {
    match tipo {
        TipoGasto::Ticket => "ticket",
        TipoGasto::Subscripcion => "subscripcion",
        _ => "gasto",
    }
}

fn criterios_form(tipo: TipoGasto, form: &FiltroForm, endpoint: &str) -> Markup {
    let text_input = |name: &str, label: &str, value: &Option<String>, input_type: &str| {
        html!(
            div
            {
                label for=(name) class=(FORM_LABEL_STYLE) { (label) }
                input
                    type=(input_type)
                    name=(name)
                    id=(name)
                    value=(value.as_deref().unwrap_or(""))
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        )
    };

    html!(
        form
            id="criterios"
            class="grid grid-cols-2 md:grid-cols-4 gap-4 mb-4"
            method="get"
            action=(endpoint)
        {
            (text_input("q", "Nombre", &form.q, "search"))
            (text_input("desde", "Desde", &form.desde, "date"))
            (text_input("hasta", "Hasta", &form.hasta, "date"))
            (text_input("precio_min", "Precio mínimo", &form.precio_min, "number"))
            (text_input("precio_max", "Precio máximo", &form.precio_max, "number"))

            @if tipo == TipoGasto::Subscripcion {
                (text_input("fecha_fin", "Finaliza antes de", &form.fecha_fin, "date"))

                div
                {
                    label for="estado" class=(FORM_LABEL_STYLE) { "Estado" }
                    select name="estado" id="estado" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value="" selected[form.estado.as_deref().unwrap_or("").is_empty()]
                        {
                            "Cualquiera"
                        }
                        option value="ACTIVA" selected[form.estado.as_deref() == Some("ACTIVA")]
                        {
                            "Activa"
                        }
                        option
                            value="CANCELADA"
                            selected[form.estado.as_deref() == Some("CANCELADA")]
                        {
                            "Cancelada"
                        }
                    }
                }
            }

            @if tipo == TipoGasto::Ticket {
                (text_input("producto", "Producto", &form.producto, "search"))
                (text_input("categoria", "Categoría interna", &form.categoria, "search"))
            }

            div class="flex items-end"
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filtrar" }
            }
        }
    )
}

fn resultados_table(tipo: TipoGasto, resultados: &[&Gasto]) -> Markup {
    html!(
        section
            id="resultados"
            class="w-full relative overflow-x-auto shadow-md sm:rounded-lg"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Fecha" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Nombre" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Total" }
                        th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Borrar" } }
                    }
                }

                tbody
                {
                    @if resultados.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) colspan="4"
                            {
                                "Ningún registro coincide con los criterios."
                            }
                        }
                    }

                    @for gasto in resultados {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (gasto.fecha_compra) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                p class="font-medium text-gray-900 dark:text-white"
                                {
                                    (gasto.name)
                                }
                            }
                            td class=(TABLE_CELL_STYLE) { (format_currency(gasto.total)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                button
                                    class=(BUTTON_DELETE_STYLE)
                                    hx-post=(format_endpoint(endpoints::DELETE_RECORD, gasto.spent_id))
                                    hx-vals=(format!(r#"{{"tipo":"{}"}}"#, tipo.as_str()))
                                    hx-target="closest tr"
                                    hx-swap="outerHTML"
                                    hx-target-error="#alert-container"
                                    hx-confirm="¿Borrar este registro?"
                                {
                                    "Borrar"
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

/// The form body of a delete request; the record type decides which backend
/// endpoint receives the deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub tipo: TipoGasto,
}

/// Handler for deleting a record.
///
/// Responds with an empty fragment so HTMX removes the row, or with an alert
/// partial when the backend rejects the deletion.
pub async fn delete_record(
    State(state): State<FiltroState>,
    Extension(sesion): Extension<Sesion>,
    Path(spent_id): Path<i64>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let result = match form.tipo {
        TipoGasto::Ticket => state.api.delete_ticket(&sesion.token, spent_id).await,
        TipoGasto::Subscripcion => state.api.delete_subscripcion(&sesion.token, spent_id).await,
        _ => state.api.delete_gasto(&sesion.token, spent_id).await,
    };

    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod filtro_view_tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::model::{Detalle, Gasto, Subscripcion, TipoGasto};

    use super::{FiltroForm, filtro_view, tipo_from_segment};

    fn gasto(spent_id: i64, name: &str, detalle: Detalle) -> Gasto {
        Gasto {
            spent_id,
            user_id: 1,
            categoria_id: 1,
            name: name.to_owned(),
            description: None,
            icon: None,
            fecha_compra: date!(2024 - 02 - 10),
            total: 9.99,
            iva: 21.0,
            detalle,
        }
    }

    fn render(tipo: TipoGasto, resultados: &[&Gasto]) -> Html {
        let markup = filtro_view(tipo, &FiltroForm::default(), resultados, None);

        Html::parse_document(&markup.into_string())
    }

    #[test]
    fn recognizes_the_three_filter_pages() {
        assert_eq!(tipo_from_segment("ticket").unwrap(), TipoGasto::Ticket);
        assert_eq!(
            tipo_from_segment("subscripcion").unwrap(),
            TipoGasto::Subscripcion
        );
        assert_eq!(tipo_from_segment("gasto").unwrap(), TipoGasto::GastoGenerico);
        assert!(tipo_from_segment("factura").is_err());
    }

    #[test]
    fn subscription_page_has_type_specific_criteria() {
        let document = render(TipoGasto::Subscripcion, &[]);

        for field in ["fecha_fin", "estado"] {
            let selector = Selector::parse(&format!("[name={field}]")).unwrap();
            assert!(
                document.select(&selector).next().is_some(),
                "subscription page should have the {field} criterion"
            );
        }

        let producto = Selector::parse("[name=producto]").unwrap();
        assert!(document.select(&producto).next().is_none());
    }

    #[test]
    fn ticket_page_has_product_criteria() {
        let document = render(TipoGasto::Ticket, &[]);

        for field in ["producto", "categoria"] {
            let selector = Selector::parse(&format!("[name={field}]")).unwrap();
            assert!(
                document.select(&selector).next().is_some(),
                "ticket page should have the {field} criterion"
            );
        }
    }

    #[test]
    fn delete_button_targets_its_own_row() {
        let record = gasto(
            42,
            "Netflix",
            Detalle::Subscripcion(Subscripcion {
                start: date!(2024 - 01 - 05),
                end: None,
                accumulate: 0.0,
                restart_day: 5,
                interval_time: 30,
                activa: true,
            }),
        );

        let document = render(TipoGasto::Subscripcion, &[&record]);

        let selector = Selector::parse("#resultados button[hx-post]").unwrap();
        let button = document
            .select(&selector)
            .next()
            .expect("result rows should have a delete button");

        assert_eq!(
            button.value().attr("hx-post"),
            Some("/api/registros/42/eliminar")
        );
        assert_eq!(button.value().attr("hx-target"), Some("closest tr"));
        assert_eq!(
            button.value().attr("hx-vals"),
            Some(r#"{"tipo":"SUBSCRIPCION"}"#)
        );
    }

    #[test]
    fn empty_results_show_a_placeholder_row() {
        let document = render(TipoGasto::GastoGenerico, &[]);

        let selector = Selector::parse("#resultados tbody td").unwrap();
        let cell = document.select(&selector).next().unwrap();

        assert!(
            cell.text()
                .collect::<String>()
                .contains("Ningún registro coincide")
        );
    }
}
