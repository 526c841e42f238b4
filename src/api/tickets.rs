//! Endpoints for ticket records.

use crate::{
    Error,
    model::{Gasto, RawGasto},
};

use super::{ApiClient, gastos::normalize_batch};

const TICKETS: &str = "/api/tickets/";

impl ApiClient {
    pub async fn get_tickets(&self, token: &str) -> Result<Vec<Gasto>, Error> {
        let raw: Vec<RawGasto> = self.send_json(self.get(TICKETS, token)).await?;

        Ok(normalize_batch(raw))
    }

    pub async fn get_ticket(&self, token: &str, spent_id: i64) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.get(&format!("{TICKETS}{spent_id}"), token))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn create_ticket(&self, token: &str, ticket: &Gasto) -> Result<Gasto, Error> {
        let raw: RawGasto = self
            .send_json(self.post(TICKETS, token).json(&ticket.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn update_ticket(&self, token: &str, ticket: &Gasto) -> Result<Gasto, Error> {
        let path = format!("{TICKETS}{}", ticket.spent_id);
        let raw: RawGasto = self
            .send_json(self.put(&path, token).json(&ticket.to_raw()?))
            .await?;

        Gasto::from_raw(raw)
    }

    pub async fn delete_ticket(&self, token: &str, spent_id: i64) -> Result<(), Error> {
        self.send(self.delete(&format!("{TICKETS}{spent_id}"), token))
            .await?;

        Ok(())
    }
}
