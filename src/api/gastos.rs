//! Endpoints for generic expense records and the receipt image upload.

use reqwest::multipart::{Form, Part};

use crate::{
    Error,
    model::{Gasto, RawGasto},
};

use super::ApiClient;

const GASTOS: &str = "/api/gastos/";
const FULL_SPENTS: &str = "/api/gastos/fullspents";
const UPLOAD_IMAGE: &str = "/api/gastos/me/uploadSpenseImage";

/// Normalize a batch of wire records.
///
/// Records that fail normalization are skipped with a warning rather than
/// failing the whole fetch; one corrupt date should not blank the dashboard.
pub(super) fn normalize_batch(raw: Vec<RawGasto>) -> Vec<Gasto> {
    raw.into_iter()
        .filter_map(|record| {
            let spent_id = record.spent_id;

            match Gasto::from_raw(record) {
                Ok(gasto) => Some(gasto),
                Err(error) => {
                    tracing::warn!("Descartando el registro {spent_id}: {error}");
                    None
                }
            }
        })
        .collect()
}

impl ApiClient {
    /// All records of the session user, every type in one call.
    pub async fn get_full_spents(&self, token: &str) -> Result<Vec<Gasto>, Error> {
        let raw: Vec<RawGasto> = self.send_json(self.get(FULL_SPENTS, token)).await?;

        Ok(normalize_batch(raw))
    }

    /// The generic expense records, optionally scoped to a client.
    pub async fn get_gastos(
        &self,
        token: &str,
        cliente_id: Option<i64>,
    ) -> Result<Vec<Gasto>, Error> {
        let mut request = self.get(GASTOS, token);

        if let Some(cliente_id) = cliente_id {
            request = request.query(&[("clienteId", cliente_id)]);
        }

        let raw: Vec<RawGasto> = self.send_json(request).await?;

        Ok(normalize_batch(raw))
    }

    pub async fn get_gasto(&self, token: &str, spent_id: i64) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.get(&format!("{GASTOS}{spent_id}"), token))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn create_gasto(&self, token: &str, gasto: &Gasto) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.post(GASTOS, token).json(&gasto.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn update_gasto(&self, token: &str, gasto: &Gasto) -> Result<Gasto, Error> {
        let path = format!("{GASTOS}{}", gasto.spent_id);
        let raw: RawGasto = self
            .send_json(self.put(&path, token).json(&gasto.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn delete_gasto(&self, token: &str, spent_id: i64) -> Result<(), Error> {
        self.send(self.delete(&format!("{GASTOS}{spent_id}"), token))
            .await?;

        Ok(())
    }

    /// Forward a receipt image to the backend's OCR pipeline.
    pub async fn upload_spent_image(
        &self,
        token: &str,
        spent_id: i64,
        file_name: String,
        image: Vec<u8>,
    ) -> Result<(), Error> {
        let form = Form::new()
            .part("image", Part::bytes(image).file_name(file_name))
            .text("spentId", spent_id.to_string());

        self.send(self.put(UPLOAD_IMAGE, token).multipart(form))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod gastos_tests {
    use crate::model::{RawGasto, TipoGasto};

    use super::normalize_batch;

    fn raw(spent_id: i64, fecha: &str) -> RawGasto {
        RawGasto {
            spent_id,
            user_id: 1,
            categoria_id: 1,
            name: "test".to_owned(),
            description: None,
            icon: None,
            fecha_compra: fecha.to_owned(),
            total: 1.0,
            iva: 21.0,
            type_expense: TipoGasto::GastoGenerico,
            store: None,
            products_json: None,
            start: None,
            end: None,
            accumulate: None,
            restart_day: None,
            interval_time: None,
            activa: None,
        }
    }

    #[test]
    fn normalize_batch_skips_corrupt_records() {
        let batch = vec![
            raw(1, "2024-01-01"),
            raw(2, "no es una fecha"),
            raw(3, "2024-02-01"),
        ];

        let gastos = normalize_batch(batch);

        let ids: Vec<i64> = gastos.iter().map(|gasto| gasto.spent_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
