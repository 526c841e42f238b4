//! Chart generation and rendering for the expense dashboard.
//!
//! Aggregated data is first shaped into the chart-library-agnostic
//! [ChartData], then mapped into ECharts configurations with `charming` and
//! rendered as JSON plus the JavaScript needed to initialize each chart
//! client-side.

use std::collections::HashMap;

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger,
    },
    series::bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::aggregation::{top_categorias, totales_mensuales, totales_por_categoria},
    html::HeadElement,
    model::{Gasto, Producto},
};

/// Spanish month abbreviations, calendar order.
pub const MESES: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// One named series of values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// Chart-ready data: ordered labels plus one or more series aligned with them.
///
/// This type carries no chart-library concepts so the aggregation layer can be
/// tested without touching ECharts configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// Monthly totals of the given records, one slot per calendar month.
pub fn datos_gasto_mensual(gastos: &[&Gasto]) -> ChartData {
    let totales = totales_mensuales(gastos);

    ChartData {
        labels: MESES.iter().map(|mes| mes.to_string()).collect(),
        series: vec![ChartSeries {
            label: "Gastos".to_owned(),
            values: totales.to_vec(),
        }],
    }
}

/// Top category totals of the given records, descending, tail folded into
/// "Otros".
pub fn datos_top_categorias(gastos: &[&Gasto], nombres: &HashMap<i64, String>) -> ChartData {
    let totales = totales_por_categoria(gastos);
    let top = top_categorias(&totales, nombres);

    let (labels, values) = top.into_iter().unzip();

    ChartData {
        labels,
        series: vec![ChartSeries {
            label: "Gasto por categoría".to_owned(),
            values,
        }],
    }
}

/// Per-product spend of a single ticket (price times quantity per line item).
pub fn datos_productos(productos: &[Producto]) -> ChartData {
    let labels = productos
        .iter()
        .map(|producto| producto.nombre.clone())
        .collect();
    let values = productos
        .iter()
        .map(|producto| producto.precio * producto.cantidad)
        .collect();

    ChartData {
        labels,
        series: vec![ChartSeries {
            label: "Importe".to_owned(),
            values,
        }],
    }
}

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: String,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[&DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// Bar chart of monthly spend over the active year.
pub(super) fn gasto_mensual_chart(datos: &ChartData, año: i32) -> Chart {
    bar_chart(
        datos,
        Title::new()
            .text("Gasto mensual")
            .subtext(format!("Año {año}")),
    )
}

/// Bar chart of the top spending categories.
pub(super) fn categorias_chart(datos: &ChartData) -> Chart {
    bar_chart(
        datos,
        Title::new()
            .text("Gasto por categoría")
            .subtext("Principales categorías y resto"),
    )
}

/// Bar chart of a single ticket's product breakdown.
pub(super) fn productos_chart(datos: &ChartData) -> Chart {
    bar_chart(datos, Title::new().text("Productos del ticket"))
}

fn bar_chart(datos: &ChartData, title: Title) -> Chart {
    let mut chart = Chart::new()
        .title(title)
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(datos.labels.clone()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for series in &datos.series {
        chart = chart.series(
            bar::Bar::new()
                .name(series.label.clone())
                .data(series.values.clone()),
        );
    }

    chart
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('es-ES', {
              style: 'currency',
              currency: 'EUR'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_data_tests {
    use std::collections::HashMap;

    use time::macros::date;

    use crate::model::{Detalle, Gasto, Producto};

    use super::*;

    fn gasto(categoria_id: i64, total: f64, fecha: time::Date) -> Gasto {
        Gasto {
            spent_id: 1,
            user_id: 1,
            categoria_id,
            name: "test".to_owned(),
            description: None,
            icon: None,
            fecha_compra: fecha,
            total,
            iva: 21.0,
            detalle: Detalle::GastoGenerico,
        }
    }

    #[test]
    fn monthly_chart_data_uses_spanish_labels_in_calendar_order() {
        let records = vec![gasto(1, 10.0, date!(2024 - 02 - 01))];
        let refs: Vec<&Gasto> = records.iter().collect();

        let datos = datos_gasto_mensual(&refs);

        assert_eq!(datos.labels.len(), 12);
        assert_eq!(datos.labels[0], "Ene");
        assert_eq!(datos.labels[11], "Dic");
        assert_eq!(datos.series.len(), 1);
        assert_eq!(datos.series[0].values[1], 10.0);
        assert_eq!(datos.series[0].values.iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn category_chart_data_is_descending() {
        let records = vec![
            gasto(1, 10.0, date!(2024 - 01 - 01)),
            gasto(2, 30.0, date!(2024 - 01 - 02)),
        ];
        let refs: Vec<&Gasto> = records.iter().collect();
        let mut nombres = HashMap::new();
        nombres.insert(1, "Casa".to_owned());
        nombres.insert(2, "Comida".to_owned());

        let datos = datos_top_categorias(&refs, &nombres);

        assert_eq!(datos.labels, vec!["Comida".to_owned(), "Casa".to_owned()]);
        assert_eq!(datos.series[0].values, vec![30.0, 10.0]);
    }

    #[test]
    fn product_chart_data_multiplies_price_by_quantity() {
        let productos = vec![Producto {
            nombre: "Leche".to_owned(),
            categorias: vec![],
            cantidad: 6.0,
            precio: 1.5,
        }];

        let datos = datos_productos(&productos);

        assert_eq!(datos.labels, vec!["Leche".to_owned()]);
        assert_eq!(datos.series[0].values, vec![9.0]);
    }

    #[test]
    fn chart_options_serialize_to_json() {
        let records = vec![gasto(1, 10.0, date!(2024 - 02 - 01))];
        let refs: Vec<&Gasto> = records.iter().collect();

        let chart = gasto_mensual_chart(&datos_gasto_mensual(&refs), 2024);
        let options = chart.to_string();

        assert!(options.contains("Gasto mensual"));
        assert!(options.contains("Ene"));
    }
}
