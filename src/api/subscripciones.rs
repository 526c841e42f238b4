//! Endpoints for subscription records.

use crate::{
    Error,
    model::{Gasto, RawGasto},
};

use super::{ApiClient, gastos::normalize_batch};

const SUBSCRIPCIONES: &str = "/api/subscripciones/";

impl ApiClient {
    pub async fn get_subscripciones(&self, token: &str) -> Result<Vec<Gasto>, Error> {
        let raw: Vec<RawGasto> = self.send_json(self.get(SUBSCRIPCIONES, token)).await?;

        Ok(normalize_batch(raw))
    }

    pub async fn get_subscripcion(&self, token: &str, spent_id: i64) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.get(&format!("{SUBSCRIPCIONES}{spent_id}"), token))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn create_subscripcion(
        &self,
        token: &str,
        subscripcion: &Gasto,
    ) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.post(SUBSCRIPCIONES, token).json(&subscripcion.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn update_subscripcion(
        &self,
        token: &str,
        subscripcion: &Gasto,
    ) -> Result<Gasto, Error> {
        let path = format!("{SUBSCRIPCIONES}{}", subscripcion.spent_id);
        let raw: RawGasto = self
            .send_json(self.put(&path, token).json(&subscripcion.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn delete_subscripcion(&self, token: &str, spent_id: i64) -> Result<(), Error> {
        self.send(self.delete(&format!("{SUBSCRIPCIONES}{spent_id}"), token))
            .await?;

        Ok(())
    }
}
