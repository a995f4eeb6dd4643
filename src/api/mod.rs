// src/api/mod.rs
// HTTP client for the Mealz REST API

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::types::{
    ChatMessage, ChatSession, ChatSessionInput, MealSlot, MealSlotInput, MealSlotUpdate, Recipe,
    RecipeInput, RecipeSummary, WeekPlan, WeekPlanInput,
};

pub mod chat;
pub mod error;
pub mod ingredients;
pub mod meal_plans;
pub mod recipes;
pub mod stream;

pub use error::{ApiError, ApiResult};
pub use stream::{ChatEventStream, LineBuffer, chat_event_stream};

/// Thin JSON wrapper over reqwest.
///
/// Regular requests get the configured timeout. The chat stream does not,
/// it runs until the server ends it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.api_url)?;
        // A path prefix such as `/mealz` must survive `join`
        if !base_url.path().ends_with('/') {
            let prefixed = format!("{}/", base_url.path());
            base_url.set_path(&prefixed);
        }

        info!(
            "Initializing Mealz API client: base_url={}, timeout={}s",
            base_url,
            config.request_timeout.as_secs()
        );

        let http = ReqwestClient::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url,
            timeout: config.request_timeout,
        })
    }

    /// Client against `base_url` with default settings
    pub fn with_base_url(base_url: &str) -> ApiResult<Self> {
        Self::new(&Config::default().with_api_url(base_url))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub(crate) fn http(&self) -> &ReqwestClient {
        &self.http
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let req = self.http.get(self.url(path)?).query(query);
        self.request(req).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let req = self.http.post(self.url(path)?).json(body);
        self.request(req).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let req = self.http.put(self.url(path)?).json(body);
        self.request(req).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let req = self.http.delete(self.url(path)?);
        self.request(req).await
    }

    /// Send a request and decode the JSON answer.
    ///
    /// Non-2xx fails with status and body text. 204 and empty bodies decode
    /// as JSON `null`, so `()` and `Option<T>` come back empty.
    async fn request<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let response = req.timeout(self.timeout).send().await?;
        let status = response.status();
        let url = response.url().clone();

        if !status.is_success() {
            return Err(ApiError::from_response(response).await);
        }

        if status == StatusCode::NO_CONTENT {
            debug!(%url, "204 No Content");
            return Ok(serde_json::from_value(Value::Null)?);
        }

        let bytes = response.bytes().await?;
        debug!(%url, status = status.as_u16(), bytes = bytes.len(), "API response");

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ═══════════════════════════════════════
// SEAMS
// ═══════════════════════════════════════

/// Week plan and slot calls used by the calendar
#[async_trait]
pub trait PlannerApi: Send + Sync {
    async fn fetch_week_plan(&self, week_start: NaiveDate) -> ApiResult<Option<WeekPlan>>;
    async fn create_week_plan(&self, input: &WeekPlanInput) -> ApiResult<WeekPlan>;
    async fn add_meal_slot(&self, plan_id: i64, input: &MealSlotInput) -> ApiResult<MealSlot>;
    async fn update_meal_slot(
        &self,
        plan_id: i64,
        slot_id: i64,
        update: &MealSlotUpdate,
    ) -> ApiResult<MealSlot>;
    async fn delete_meal_slot(&self, plan_id: i64, slot_id: i64) -> ApiResult<()>;
}

/// Session, history and reply-stream calls used by the chat controller
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn create_chat_session(&self, input: &ChatSessionInput) -> ApiResult<ChatSession>;
    async fn fetch_chat_messages(&self, session_id: i64) -> ApiResult<Vec<ChatMessage>>;
    async fn stream_chat_message(&self, session_id: i64, content: &str)
    -> ApiResult<ChatEventStream>;
}

/// Recipe calls used by the recipe catalog
#[async_trait]
pub trait RecipeApi: Send + Sync {
    async fn fetch_recipes(
        &self,
        search: Option<&str>,
        tag: Option<&str>,
    ) -> ApiResult<Vec<RecipeSummary>>;
    async fn fetch_recipe(&self, id: i64) -> ApiResult<Recipe>;
    async fn create_recipe(&self, input: &RecipeInput) -> ApiResult<Recipe>;
    async fn update_recipe(&self, id: i64, input: &RecipeInput) -> ApiResult<Recipe>;
    async fn delete_recipe(&self, id: i64) -> ApiResult<()>;
}

#[async_trait]
impl PlannerApi for ApiClient {
    async fn fetch_week_plan(&self, week_start: NaiveDate) -> ApiResult<Option<WeekPlan>> {
        ApiClient::fetch_week_plan(self, week_start).await
    }

    async fn create_week_plan(&self, input: &WeekPlanInput) -> ApiResult<WeekPlan> {
        ApiClient::create_week_plan(self, input).await
    }

    async fn add_meal_slot(&self, plan_id: i64, input: &MealSlotInput) -> ApiResult<MealSlot> {
        ApiClient::add_meal_slot(self, plan_id, input).await
    }

    async fn update_meal_slot(
        &self,
        plan_id: i64,
        slot_id: i64,
        update: &MealSlotUpdate,
    ) -> ApiResult<MealSlot> {
        ApiClient::update_meal_slot(self, plan_id, slot_id, update).await
    }

    async fn delete_meal_slot(&self, plan_id: i64, slot_id: i64) -> ApiResult<()> {
        ApiClient::delete_meal_slot(self, plan_id, slot_id).await
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn create_chat_session(&self, input: &ChatSessionInput) -> ApiResult<ChatSession> {
        ApiClient::create_chat_session(self, input).await
    }

    async fn fetch_chat_messages(&self, session_id: i64) -> ApiResult<Vec<ChatMessage>> {
        ApiClient::fetch_chat_messages(self, session_id).await
    }

    async fn stream_chat_message(
        &self,
        session_id: i64,
        content: &str,
    ) -> ApiResult<ChatEventStream> {
        ApiClient::stream_chat_message(self, session_id, content).await
    }
}

#[async_trait]
impl RecipeApi for ApiClient {
    async fn fetch_recipes(
        &self,
        search: Option<&str>,
        tag: Option<&str>,
    ) -> ApiResult<Vec<RecipeSummary>> {
        ApiClient::fetch_recipes(self, search, tag).await
    }

    async fn fetch_recipe(&self, id: i64) -> ApiResult<Recipe> {
        ApiClient::fetch_recipe(self, id).await
    }

    async fn create_recipe(&self, input: &RecipeInput) -> ApiResult<Recipe> {
        ApiClient::create_recipe(self, input).await
    }

    async fn update_recipe(&self, id: i64, input: &RecipeInput) -> ApiResult<Recipe> {
        ApiClient::update_recipe(self, id, input).await
    }

    async fn delete_recipe(&self, id: i64) -> ApiResult<()> {
        ApiClient::delete_recipe(self, id).await
    }
}

/// Query pairs for the non-empty values only
pub(crate) fn query_pairs<'a>(pairs: &[(&'a str, Option<&str>)]) -> Vec<(&'a str, String)> {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v.to_string()))
        })
        .collect()
}
