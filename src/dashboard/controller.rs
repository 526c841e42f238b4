//! The dashboard's view-state machine.
//!
//! [DashboardController] is a pure, synchronous type: HTTP handlers construct
//! one per request, feed it the fetch outcome and the view state from the
//! query string, and render from its snapshot. Loading goes
//! `Idle -> Loading -> Ready | Error`; filter changes are synchronous over the
//! records already in memory.

use std::collections::HashSet;

use time::Date;

use crate::{
    dashboard::aggregation::{años_disponibles, subscripciones_activas},
    filter::FiltroGastos,
    model::{Gasto, TipoGasto},
};

/// Where the dashboard is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// A fetch failed. Previously loaded records stay visible.
    Error(String),
}

/// Drives the expense dashboard: loading, year navigation, filter criteria,
/// and per-item detail visibility.
#[derive(Debug, Clone)]
pub struct DashboardController {
    state: LoadState,
    gastos: Vec<Gasto>,
    años: Vec<i32>,
    año_activo: i32,
    tipo_activo: Option<TipoGasto>,
    texto: String,
    detalles_abiertos: HashSet<usize>,
}

impl DashboardController {
    /// A controller in the `Idle` state, defaulting to the current year.
    pub fn new(hoy: Date) -> Self {
        Self {
            state: LoadState::Idle,
            gastos: Vec::new(),
            años: Vec::new(),
            año_activo: hoy.year(),
            tipo_activo: None,
            texto: String::new(),
            detalles_abiertos: HashSet::new(),
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Enter the `Loading` state. Also used to retry after an error.
    pub fn begin_load(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Store the fetched records and recompute the set of navigable years.
    pub fn load_succeeded(&mut self, gastos: Vec<Gasto>) {
        self.años = años_disponibles(&gastos);
        self.gastos = gastos;
        self.state = LoadState::Ready;
    }

    /// Record the error message. Records from a previous load stay untouched.
    pub fn load_failed(&mut self, message: String) {
        self.state = LoadState::Error(message);
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn año_activo(&self) -> i32 {
        self.año_activo
    }

    pub fn años_disponibles(&self) -> &[i32] {
        &self.años
    }

    /// Jump straight to a year. Used to restore view state from the query
    /// string.
    pub fn set_año(&mut self, año: i32) {
        self.año_activo = año;
    }

    /// Move `delta` steps through the years present in the data.
    ///
    /// Returns whether the year changed. Navigation beyond either end of the
    /// sorted year list is a no-op.
    pub fn change_year(&mut self, delta: i32) -> bool {
        // An active year absent from the data behaves as position -1, matching
        // an index lookup that finds nothing.
        let index = self
            .años
            .iter()
            .position(|&año| año == self.año_activo)
            .map(|i| i as i64)
            .unwrap_or(-1);
        let new_index = index + delta as i64;

        if new_index < 0 || new_index as usize >= self.años.len() {
            return false;
        }

        self.año_activo = self.años[new_index as usize];
        true
    }

    pub fn texto(&self) -> &str {
        &self.texto
    }

    pub fn set_texto(&mut self, texto: String) {
        self.texto = texto;
    }

    pub fn tipo_activo(&self) -> Option<TipoGasto> {
        self.tipo_activo
    }

    /// Selecting the already-active type clears the selection, mirroring the
    /// toggle behavior of the filter chips.
    pub fn toggle_tipo(&mut self, tipo: TipoGasto) {
        if self.tipo_activo == Some(tipo) {
            self.tipo_activo = None;
        } else {
            self.tipo_activo = Some(tipo);
        }
    }

    pub fn set_tipo(&mut self, tipo: Option<TipoGasto>) {
        self.tipo_activo = tipo;
    }

    /// The current criteria: active year bounds, type and search text.
    pub fn criterios(&self) -> FiltroGastos {
        FiltroGastos {
            texto: self.texto.clone(),
            fecha_desde: Date::from_ordinal_date(self.año_activo, 1).ok(),
            fecha_hasta: Date::from_calendar_date(self.año_activo, time::Month::December, 31).ok(),
            tipo: self.tipo_activo,
            ..Default::default()
        }
    }

    /// The records passing the current criteria, in load order.
    pub fn filtrados(&self) -> Vec<&Gasto> {
        let criterios = self.criterios();

        self.gastos
            .iter()
            .filter(|gasto| criterios.matches(gasto))
            .collect()
    }

    /// The currently running subscriptions among the filtered records.
    pub fn subscripciones_activas(&self, hoy: Date) -> Vec<&Gasto> {
        subscripciones_activas(&self.filtrados(), hoy)
    }

    /// Toggle the detail panel of the record at `index` in the filtered list.
    pub fn toggle_detalle(&mut self, index: usize) {
        if !self.detalles_abiertos.remove(&index) {
            self.detalles_abiertos.insert(index);
        }
    }

    pub fn detalle_abierto(&self, index: usize) -> bool {
        self.detalles_abiertos.contains(&index)
    }

    /// Indexes of the open detail panels, ascending. Used to round-trip the
    /// view state through the query string.
    pub fn detalles_abiertos(&self) -> Vec<usize> {
        let mut abiertos: Vec<usize> = self.detalles_abiertos.iter().copied().collect();
        abiertos.sort_unstable();
        abiertos
    }
}
