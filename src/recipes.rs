// src/recipes.rs
// Recipe catalog: cached listing and detail queries with invalidation

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiResult, RecipeApi};
use crate::cache::{Invalidation, QueryCache, QueryKey};
use crate::types::{Recipe, RecipeInput, RecipeSummary};

/// Listing filter; empty values mean "no filter"
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecipeFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
}

/// Reads go through the shared `QueryCache`; a stale key is refetched on
/// next access. Writes invalidate the whole recipe scope.
pub struct RecipeCatalog<A: RecipeApi> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    lists: HashMap<RecipeFilter, Vec<RecipeSummary>>,
    details: HashMap<i64, Recipe>,
}

impl<A: RecipeApi> RecipeCatalog<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            cache,
            lists: HashMap::new(),
            details: HashMap::new(),
        }
    }

    pub async fn list(&mut self, filter: &RecipeFilter) -> ApiResult<&[RecipeSummary]> {
        if !self.cache.is_fresh(&QueryKey::Recipes) {
            self.lists.clear();
        }
        if !self.lists.contains_key(filter) {
            debug!(?filter, "Fetching recipe list");
            let recipes = self
                .api
                .fetch_recipes(filter.search.as_deref(), filter.tag.as_deref())
                .await?;
            self.lists.insert(filter.clone(), recipes);
            self.cache.mark_fresh(QueryKey::Recipes);
        }
        Ok(self.lists.get(filter).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub async fn get(&mut self, id: i64) -> ApiResult<&Recipe> {
        let key = QueryKey::Recipe(id);
        if !self.cache.is_fresh(&key) {
            self.details.remove(&id);
        }

        match self.details.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let recipe = self.api.fetch_recipe(id).await?;
                self.cache.mark_fresh(key);
                Ok(entry.insert(recipe))
            }
        }
    }

    pub async fn create(&mut self, input: &RecipeInput) -> ApiResult<Recipe> {
        let recipe = self.api.create_recipe(input).await?;
        self.cache.invalidate(Invalidation::Recipes);
        Ok(recipe)
    }

    pub async fn update(&mut self, id: i64, input: &RecipeInput) -> ApiResult<Recipe> {
        let recipe = self.api.update_recipe(id, input).await?;
        self.cache.invalidate(Invalidation::Recipes);
        Ok(recipe)
    }

    pub async fn delete(&mut self, id: i64) -> ApiResult<()> {
        self.api.delete_recipe(id).await?;
        self.details.remove(&id);
        self.cache.invalidate(Invalidation::Recipes);
        Ok(())
    }

    /// Details for every id, fetching the ones not cached
    pub async fn get_many(&mut self, ids: &[i64]) -> ApiResult<HashMap<i64, Recipe>> {
        let mut found = HashMap::with_capacity(ids.len());
        for &id in ids {
            if !found.contains_key(&id) {
                let recipe = self.get(id).await?.clone();
                found.insert(id, recipe);
            }
        }
        Ok(found)
    }
}
