// src/api/ingredients.rs

use super::error::ApiResult;
use super::{ApiClient, query_pairs};
use crate::types::{Ingredient, IngredientInput};

impl ApiClient {
    pub async fn fetch_ingredients(&self, search: Option<&str>) -> ApiResult<Vec<Ingredient>> {
        let query = query_pairs(&[("search", search)]);
        self.get("/api/ingredients", &query).await
    }

    pub async fn create_ingredient(&self, input: &IngredientInput) -> ApiResult<Ingredient> {
        self.post("/api/ingredients", input).await
    }

    /// Category names known to the server, in its order
    pub async fn fetch_categories(&self) -> ApiResult<Vec<String>> {
        self.get("/api/ingredients/categories", &[]).await
    }
}
