//! Expense aggregation and subscription projections for the dashboard.
//!
//! Provides pure functions to sum expenses into fixed monthly slots, total
//! them by category, fold the long tail of categories into an "Otros" bucket,
//! and project subscription renewals and accumulated cost.

use std::collections::HashMap;

use time::{Date, Month};

use crate::model::Gasto;

/// How many categories keep their own slot before the rest are folded into
/// [OTROS_LABEL].
pub const TOP_CATEGORIAS: usize = 6;

/// The bucket label for categories outside the top slots.
pub const OTROS_LABEL: &str = "Otros";

/// Sums record totals into twelve calendar-ordered monthly slots.
///
/// Months without records stay at 0.0; the output always has exactly twelve
/// entries, January first.
pub fn totales_mensuales(gastos: &[&Gasto]) -> [f64; 12] {
    let mut totales = [0.0; 12];

    for gasto in gastos {
        let slot = gasto.fecha_compra.month() as usize - 1;
        totales[slot] += gasto.total;
    }

    totales
}

/// Sums record totals keyed by category ID. Categories with no records are
/// omitted.
pub fn totales_por_categoria(gastos: &[&Gasto]) -> HashMap<i64, f64> {
    let mut totales = HashMap::new();

    for gasto in gastos {
        *totales.entry(gasto.categoria_id).or_insert(0.0) += gasto.total;
    }

    totales
}

/// Sorts category totals descending, keeps the top [TOP_CATEGORIAS] and folds
/// the remainder into a final [OTROS_LABEL] entry.
///
/// Category IDs without a name in `nombres` get a placeholder label. The sum
/// over the result always equals the sum of `totales`.
pub fn top_categorias(
    totales: &HashMap<i64, f64>,
    nombres: &HashMap<i64, String>,
) -> Vec<(String, f64)> {
    let nombre = |id: i64| {
        nombres
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Categoría {id}"))
    };

    let mut entradas: Vec<(String, f64)> = totales
        .iter()
        .map(|(&id, &total)| (nombre(id), total))
        .collect();

    // Ties are broken by name so the output is deterministic.
    entradas.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    if entradas.len() <= TOP_CATEGORIAS {
        return entradas;
    }

    let resto: f64 = entradas[TOP_CATEGORIAS..].iter().map(|(_, total)| total).sum();
    entradas.truncate(TOP_CATEGORIAS);
    entradas.push((OTROS_LABEL.to_owned(), resto));

    entradas
}

/// The renewal projection of a subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProyeccionRenovacion {
    pub renovacion: Date,
    /// Whole days between the purchase date and the renewal date.
    pub dias_totales: i64,
    /// Whole days left until renewal, never negative.
    pub dias_restantes: i64,
}

/// One calendar month after `fecha`, with the day-of-month clamped to the
/// target month's length (2024-01-31 renews on 2024-02-29).
pub fn fecha_renovacion(fecha: Date) -> Date {
    let (year, month) = match fecha.month() {
        Month::December => (fecha.year() + 1, Month::January),
        month => (fecha.year(), month.next()),
    };
    let day = fecha.day().min(month.length(year));

    Date::from_calendar_date(year, month, day)
        .expect("clamped day is always valid for the target month")
}

/// Projects a subscription's renewal date and day counts relative to `hoy`.
pub fn proyeccion_renovacion(fecha_compra: Date, hoy: Date) -> ProyeccionRenovacion {
    let renovacion = fecha_renovacion(fecha_compra);
    let dias_totales = (renovacion - fecha_compra).whole_days();
    let dias_restantes = (renovacion - hoy).whole_days().max(0);

    ProyeccionRenovacion {
        renovacion,
        dias_totales,
        dias_restantes,
    }
}

/// The total amount a subscription has charged since it started.
///
/// A subscription bills at least one interval: a charge that started today
/// still counts once. `end` caps the elapsed period for cancelled
/// subscriptions.
pub fn coste_acumulado(
    total: f64,
    start: Date,
    end: Option<Date>,
    interval_time: i64,
    hoy: Date,
) -> f64 {
    if interval_time <= 0 {
        return total;
    }

    let hasta = match end {
        Some(end) if end < hoy => end,
        _ => hoy,
    };
    let dias_transcurridos = (hasta - start).whole_days().max(0);
    let intervalos = (dias_transcurridos / interval_time).max(1);

    redondear_centimos(total * intervalos as f64)
}

/// Rounds to cents, the display convention for euro amounts.
pub fn redondear_centimos(valor: f64) -> f64 {
    (valor * 100.0).round() / 100.0
}

/// Extracts the subscriptions that are currently running: active and with no
/// end date in the past.
pub fn subscripciones_activas<'a>(gastos: &[&'a Gasto], hoy: Date) -> Vec<&'a Gasto> {
    gastos
        .iter()
        .filter(|gasto| match gasto.subscripcion() {
            Some(subscripcion) => {
                subscripcion.activa
                    && match subscripcion.end {
                        Some(end) => end > hoy,
                        None => true,
                    }
            }
            None => false,
        })
        .copied()
        .collect()
}

/// The distinct years present in the records, ascending.
pub fn años_disponibles(gastos: &[Gasto]) -> Vec<i32> {
    let mut años: Vec<i32> = gastos.iter().map(|gasto| gasto.fecha_compra.year()).collect();
    años.sort_unstable();
    años.dedup();
    años
}
