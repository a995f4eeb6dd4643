// src/api/recipes.rs

use tracing::info;

use super::error::ApiResult;
use super::{ApiClient, query_pairs};
use crate::types::{Recipe, RecipeInput, RecipeSummary};

impl ApiClient {
    /// List recipes, optionally filtered by name search and tag
    pub async fn fetch_recipes(
        &self,
        search: Option<&str>,
        tag: Option<&str>,
    ) -> ApiResult<Vec<RecipeSummary>> {
        let query = query_pairs(&[("search", search), ("tag", tag)]);
        self.get("/api/recipes", &query).await
    }

    pub async fn fetch_recipe(&self, id: i64) -> ApiResult<Recipe> {
        self.get(&format!("/api/recipes/{}", id), &[]).await
    }

    pub async fn create_recipe(&self, input: &RecipeInput) -> ApiResult<Recipe> {
        let recipe: Recipe = self.post("/api/recipes", input).await?;
        info!("Recipe {} created: {}", recipe.id, recipe.name);
        Ok(recipe)
    }

    pub async fn update_recipe(&self, id: i64, input: &RecipeInput) -> ApiResult<Recipe> {
        self.put(&format!("/api/recipes/{}", id), input).await
    }

    pub async fn delete_recipe(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/api/recipes/{}", id)).await
    }
}
