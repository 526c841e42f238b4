//! Filtering of expense records against user-entered criteria.
//!
//! All criteria are conjunctive: a record matches only if it passes every
//! predicate group, and an unset criterion always passes. Relaxing a
//! criterion can therefore only grow the matched set.

use time::Date;

use crate::model::{Detalle, Gasto, TipoGasto};

/// Whether a subscription is currently running or has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstadoSubscripcion {
    Activa,
    Cancelada,
}

impl EstadoSubscripcion {
    /// Parse the form value used by the filter tool.
    pub fn parse(text: &str) -> Option<EstadoSubscripcion> {
        match text {
            "ACTIVA" => Some(EstadoSubscripcion::Activa),
            "CANCELADA" => Some(EstadoSubscripcion::Cancelada),
            _ => None,
        }
    }
}

/// The filter criteria a user can combine.
///
/// Empty strings and `None` mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltroGastos {
    /// Case-insensitive substring match over the record name.
    pub texto: String,
    pub fecha_desde: Option<Date>,
    pub fecha_hasta: Option<Date>,
    pub tipo: Option<TipoGasto>,
    pub precio_min: Option<f64>,
    pub precio_max: Option<f64>,
    /// Subscriptions only: require an end date on or before this date.
    pub fecha_fin: Option<Date>,
    /// Subscriptions only: require this active/cancelled state.
    pub estado: Option<EstadoSubscripcion>,
    /// Tickets only: case-insensitive substring match over product names.
    pub producto_nombre: String,
    /// Tickets only: exact match against a product's internal category tags.
    pub categoria_interna: String,
}

impl FiltroGastos {
    /// Whether `gasto` passes every criterion.
    pub fn matches(&self, gasto: &Gasto) -> bool {
        self.matches_texto(gasto)
            && self.matches_tipo(gasto)
            && self.matches_precio(gasto)
            && self.matches_fecha(gasto)
            && self.matches_detalle(gasto)
    }

    fn matches_texto(&self, gasto: &Gasto) -> bool {
        if self.texto.is_empty() {
            return true;
        }

        gasto
            .name
            .to_lowercase()
            .contains(&self.texto.to_lowercase())
    }

    fn matches_tipo(&self, gasto: &Gasto) -> bool {
        match self.tipo {
            Some(tipo) => gasto.tipo() == tipo,
            None => true,
        }
    }

    fn matches_precio(&self, gasto: &Gasto) -> bool {
        if let Some(min) = self.precio_min
            && gasto.total < min
        {
            return false;
        }

        if let Some(max) = self.precio_max
            && gasto.total > max
        {
            return false;
        }

        true
    }

    fn matches_fecha(&self, gasto: &Gasto) -> bool {
        if let Some(desde) = self.fecha_desde
            && gasto.fecha_compra < desde
        {
            return false;
        }

        if let Some(hasta) = self.fecha_hasta
            && gasto.fecha_compra > hasta
        {
            return false;
        }

        true
    }

    /// Type-specific predicates. Records of other types pass trivially, even
    /// when a type-specific criterion is set.
    fn matches_detalle(&self, gasto: &Gasto) -> bool {
        match &gasto.detalle {
            Detalle::Subscripcion(subscripcion) => {
                if let Some(fecha_fin) = self.fecha_fin {
                    match subscripcion.end {
                        Some(end) if end <= fecha_fin => {}
                        _ => return false,
                    }
                }

                match self.estado {
                    Some(EstadoSubscripcion::Activa) => subscripcion.activa,
                    Some(EstadoSubscripcion::Cancelada) => !subscripcion.activa,
                    None => true,
                }
            }
            Detalle::Ticket { productos, .. } => {
                if !self.producto_nombre.is_empty() {
                    let needle = self.producto_nombre.to_lowercase();
                    let found = productos
                        .iter()
                        .any(|producto| producto.nombre.to_lowercase().contains(&needle));

                    if !found {
                        return false;
                    }
                }

                if !self.categoria_interna.is_empty() {
                    return productos.iter().any(|producto| {
                        producto
                            .categorias
                            .iter()
                            .any(|categoria| categoria == &self.categoria_interna)
                    });
                }

                true
            }
            Detalle::Factura | Detalle::GastoGenerico | Detalle::Transferencia => true,
        }
    }
}
