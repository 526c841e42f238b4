//! Endpoint for the category reference data.

use std::collections::HashMap;

use crate::{Error, model::Categoria};

use super::ApiClient;

const CATEGORIAS: &str = "/api/categorias";

impl ApiClient {
    /// The session user's categories.
    ///
    /// Callers fetch these before any category-keyed aggregation so that
    /// chart labels can resolve names.
    pub async fn get_categorias(&self, token: &str) -> Result<Vec<Categoria>, Error> {
        self.send_json(self.get(CATEGORIAS, token)).await
    }
}

/// Index categories by ID for name lookups.
pub fn nombres_por_id(categorias: &[Categoria]) -> HashMap<i64, String> {
    categorias
        .iter()
        .map(|categoria| (categoria.categoria_id, categoria.name.clone()))
        .collect()
}

#[cfg(test)]
mod categorias_tests {
    use crate::model::Categoria;

    use super::nombres_por_id;

    #[test]
    fn indexes_names_by_id() {
        let categorias = vec![
            Categoria {
                categoria_id: 1,
                name: "Casa".to_owned(),
                description: None,
                iva: 21.0,
            },
            Categoria {
                categoria_id: 2,
                name: "Comida".to_owned(),
                description: None,
                iva: 10.0,
            },
        ];

        let nombres = nombres_por_id(&categorias);

        assert_eq!(nombres[&1], "Casa");
        assert_eq!(nombres[&2], "Comida");
    }
}
