//! Domain models for expense records and reference data.
//!
//! The backend serves flattened, loosely-typed JSON records ([RawGasto]);
//! everything past the API boundary works with the normalized [Gasto] and its
//! [Detalle] tagged union so that consumers can match exhaustively on the
//! record type.

mod categoria;
mod gasto;

pub use categoria::Categoria;
pub use gasto::{
    Detalle, Gasto, Producto, RawGasto, Subscripcion, TipoGasto, parse_fecha, parse_productos,
};
