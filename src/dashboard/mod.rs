//! The expense dashboard: aggregation, charts and the pages that render them.

pub mod aggregation;
pub mod charts;
pub mod controller;
mod handlers;

pub use handlers::{get_gastos_page, post_upload_image};
