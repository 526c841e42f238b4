//! The expense record model and its normalization from the backend wire format.

use serde::{Deserialize, Serialize};
use time::{
    Date,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::Error;

/// The discriminant of an expense record.
///
/// The wire form is the backend's literal enum strings, e.g. `GASTO_GENERICO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoGasto {
    Ticket,
    Factura,
    Subscripcion,
    GastoGenerico,
    Transferencia,
}

impl TipoGasto {
    /// All record types, in the order they appear in the dashboard filter chips.
    pub const ALL: [TipoGasto; 5] = [
        TipoGasto::Ticket,
        TipoGasto::Factura,
        TipoGasto::Subscripcion,
        TipoGasto::GastoGenerico,
        TipoGasto::Transferencia,
    ];

    /// The backend's wire string for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            TipoGasto::Ticket => "TICKET",
            TipoGasto::Factura => "FACTURA",
            TipoGasto::Subscripcion => "SUBSCRIPCION",
            TipoGasto::GastoGenerico => "GASTO_GENERICO",
            TipoGasto::Transferencia => "TRANSFERENCIA",
        }
    }

    /// The human-readable label shown in the UI.
    pub fn label(self) -> &'static str {
        match self {
            TipoGasto::Ticket => "Ticket",
            TipoGasto::Factura => "Factura",
            TipoGasto::Subscripcion => "Suscripción",
            TipoGasto::GastoGenerico => "Gasto genérico",
            TipoGasto::Transferencia => "Transferencia",
        }
    }

    /// Parse the backend's wire string, e.g. `GASTO_GENERICO`.
    pub fn parse(text: &str) -> Option<TipoGasto> {
        TipoGasto::ALL.into_iter().find(|tipo| tipo.as_str() == text)
    }
}

impl std::fmt::Display for TipoGasto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense record as the backend serves it: flattened, with string dates
/// and the ticket product list embedded as a JSON-encoded string.
///
/// This type exists only at the API boundary. Use [Gasto::from_raw] to get the
/// normalized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGasto {
    pub spent_id: i64,
    pub user_id: i64,
    pub categoria_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// ISO date or date-time string, e.g. "2024-05-11" or "2024-05-11T00:00:00".
    pub fecha_compra: String,
    pub total: f64,
    pub iva: f64,
    pub type_expense: TipoGasto,

    // Ticket fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// The ticket line items as a JSON array, double-encoded as a string.
    #[serde(
        default,
        rename = "productsJSON",
        skip_serializing_if = "Option::is_none"
    )]
    pub products_json: Option<String>,

    // Subscription fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activa: Option<bool>,
}

/// A single line item of a ticket's product breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producto {
    pub nombre: String,
    /// The backend's internal category tags for this product.
    #[serde(default)]
    pub categorias: Vec<String>,
    pub cantidad: f64,
    pub precio: f64,
}

/// The subscription-specific fields of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscripcion {
    pub start: Date,
    /// Set when the subscription has been cancelled.
    pub end: Option<Date>,
    pub accumulate: f64,
    pub restart_day: u8,
    /// The billing interval in days.
    pub interval_time: i64,
    pub activa: bool,
}

/// The type-specific portion of a normalized expense record.
#[derive(Debug, Clone, PartialEq)]
pub enum Detalle {
    Ticket {
        store: String,
        productos: Vec<Producto>,
    },
    Subscripcion(Subscripcion),
    Factura,
    GastoGenerico,
    Transferencia,
}

/// A normalized expense record: typed dates and the type-specific fields
/// gathered into [Detalle].
#[derive(Debug, Clone, PartialEq)]
pub struct Gasto {
    pub spent_id: i64,
    pub user_id: i64,
    pub categoria_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub fecha_compra: Date,
    pub total: f64,
    pub iva: f64,
    pub detalle: Detalle,
}

impl Gasto {
    /// Normalize a wire record.
    ///
    /// A malformed `productsJSON` yields an empty product list rather than an
    /// error, so a single bad ticket never blocks rendering. A malformed
    /// purchase date is an error.
    pub fn from_raw(raw: RawGasto) -> Result<Gasto, Error> {
        let fecha_compra = parse_fecha(&raw.fecha_compra)?;

        let detalle = match raw.type_expense {
            TipoGasto::Ticket => Detalle::Ticket {
                store: raw.store.unwrap_or_default(),
                productos: parse_productos(raw.products_json.as_deref()),
            },
            TipoGasto::Subscripcion => {
                let start = match raw.start {
                    Some(ref text) => parse_fecha(text)?,
                    // Older records predate the start field.
                    None => fecha_compra,
                };
                let end = match raw.end {
                    Some(ref text) => Some(parse_fecha(text)?),
                    None => None,
                };

                Detalle::Subscripcion(Subscripcion {
                    start,
                    end,
                    accumulate: raw.accumulate.unwrap_or(0.0),
                    restart_day: raw.restart_day.unwrap_or(1),
                    interval_time: raw.interval_time.unwrap_or(30),
                    activa: raw.activa.unwrap_or(true),
                })
            }
            TipoGasto::Factura => Detalle::Factura,
            TipoGasto::GastoGenerico => Detalle::GastoGenerico,
            TipoGasto::Transferencia => Detalle::Transferencia,
        };

        Ok(Gasto {
            spent_id: raw.spent_id,
            user_id: raw.user_id,
            categoria_id: raw.categoria_id,
            name: raw.name,
            description: raw.description,
            icon: raw.icon,
            fecha_compra,
            total: raw.total,
            iva: raw.iva,
            detalle,
        })
    }

    /// Serialize back to the wire shape, preserving the double encoding of
    /// `productsJSON`.
    ///
    /// # Errors
    ///
    /// Returns [Error::JsonError] if the product list cannot be serialized.
    pub fn to_raw(&self) -> Result<RawGasto, Error> {
        let mut raw = RawGasto {
            spent_id: self.spent_id,
            user_id: self.user_id,
            categoria_id: self.categoria_id,
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            fecha_compra: format_fecha(self.fecha_compra)?,
            total: self.total,
            iva: self.iva,
            type_expense: self.tipo(),
            store: None,
            products_json: None,
            start: None,
            end: None,
            accumulate: None,
            restart_day: None,
            interval_time: None,
            activa: None,
        };

        match &self.detalle {
            Detalle::Ticket { store, productos } => {
                raw.store = Some(store.clone());
                raw.products_json = Some(
                    serde_json::to_string(productos)
                        .map_err(|error| Error::JsonError(error.to_string()))?,
                );
            }
            Detalle::Subscripcion(subscripcion) => {
                raw.start = Some(format_fecha(subscripcion.start)?);
                raw.end = match subscripcion.end {
                    Some(end) => Some(format_fecha(end)?),
                    None => None,
                };
                raw.accumulate = Some(subscripcion.accumulate);
                raw.restart_day = Some(subscripcion.restart_day);
                raw.interval_time = Some(subscripcion.interval_time);
                raw.activa = Some(subscripcion.activa);
            }
            Detalle::Factura | Detalle::GastoGenerico | Detalle::Transferencia => {}
        }

        Ok(raw)
    }

    /// The record's type discriminant.
    pub fn tipo(&self) -> TipoGasto {
        match self.detalle {
            Detalle::Ticket { .. } => TipoGasto::Ticket,
            Detalle::Subscripcion(_) => TipoGasto::Subscripcion,
            Detalle::Factura => TipoGasto::Factura,
            Detalle::GastoGenerico => TipoGasto::GastoGenerico,
            Detalle::Transferencia => TipoGasto::Transferencia,
        }
    }

    /// The subscription fields, if this record is a subscription.
    pub fn subscripcion(&self) -> Option<&Subscripcion> {
        match &self.detalle {
            Detalle::Subscripcion(subscripcion) => Some(subscripcion),
            _ => None,
        }
    }

    /// The ticket product breakdown, if this record is a ticket.
    pub fn productos(&self) -> Option<&[Producto]> {
        match &self.detalle {
            Detalle::Ticket { productos, .. } => Some(productos),
            _ => None,
        }
    }
}

const FECHA_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse an ISO date or date-time string, taking only the date part.
///
/// The backend is inconsistent about whether it includes a time component, so
/// everything after the first 'T' is ignored.
pub fn parse_fecha(text: &str) -> Result<Date, Error> {
    let date_part = text.split('T').next().unwrap_or(text);

    Date::parse(date_part, FECHA_FORMAT)
        .map_err(|error| Error::InvalidDate(error.to_string(), text.to_owned()))
}

fn format_fecha(date: Date) -> Result<String, Error> {
    date.format(FECHA_FORMAT)
        .map_err(|error| Error::InvalidDate(error.to_string(), date.to_string()))
}

/// Parse a ticket's embedded `productsJSON` string.
///
/// Malformed or missing JSON yields an empty list. The backend's OCR pipeline
/// occasionally produces garbage here and a bad product list should not take
/// down the whole record.
pub fn parse_productos(json: Option<&str>) -> Vec<Producto> {
    let Some(text) = json else {
        return Vec::new();
    };

    serde_json::from_str(text).unwrap_or_else(|error| {
        tracing::debug!("Ignoring malformed productsJSON: {error}");
        Vec::new()
    })
}
