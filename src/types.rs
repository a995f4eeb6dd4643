// src/types.rs
// Data model for the Mealz REST API (request and response bodies)

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Meal type used when the caller does not pick one
pub const DEFAULT_MEAL_TYPE: &str = "dinner";

// ═══════════════════════════════════════
// INGREDIENTS
// ═══════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub default_unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientInput {
    pub name: String,
    pub category: String,
    pub default_unit: String,
}

// ═══════════════════════════════════════
// RECIPES
// ═══════════════════════════════════════

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub ingredient_id: i64,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub preparation: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub ingredient_name: Option<String>,
    #[serde(default)]
    pub ingredient_category: Option<String>,
}

/// Full recipe with instructions and ingredient lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub servings: u32,
    #[serde(default)]
    pub prep_time_min: Option<u32>,
    #[serde(default)]
    pub cook_time_min: Option<u32>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Listing projection of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub servings: u32,
    #[serde(default)]
    pub prep_time_min: Option<u32>,
    #[serde(default)]
    pub cook_time_min: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredientInput {
    pub ingredient_id: i64,
    pub quantity: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Body for creating a recipe or patching one; unset fields are left out
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<RecipeIngredientInput>>,
}

impl RecipeInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// ═══════════════════════════════════════
// MEAL PLANS
// ═══════════════════════════════════════

/// A single scheduled meal. `date` may sit outside the owning plan's week
/// after a cross-week move; the slot keeps its original `week_plan_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
    pub id: i64,
    pub week_plan_id: i64,
    pub date: NaiveDate,
    #[serde(default = "default_meal_type")]
    pub meal_type: String,
    #[serde(default)]
    pub recipe_id: Option<i64>,
    #[serde(default)]
    pub is_leftover: bool,
    #[serde(default)]
    pub leftover_source_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub recipe_name: Option<String>,
}

fn default_meal_type() -> String {
    DEFAULT_MEAL_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealSlotInput {
    pub date: NaiveDate,
    pub meal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    pub is_leftover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leftover_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sort_order: i32,
}

impl MealSlotInput {
    /// Dinner slot for a recipe, appended at `sort_order`
    pub fn dinner(date: NaiveDate, recipe_id: i64, sort_order: i32) -> Self {
        Self {
            date,
            meal_type: DEFAULT_MEAL_TYPE.to_string(),
            recipe_id: Some(recipe_id),
            is_leftover: false,
            leftover_source_id: None,
            notes: None,
            sort_order,
        }
    }
}

/// Partial slot update; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MealSlotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_leftover: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leftover_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl MealSlotUpdate {
    pub fn move_to(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn leftover(is_leftover: bool) -> Self {
        Self {
            is_leftover: Some(is_leftover),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub id: i64,
    pub week_start: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub slots: Vec<MealSlot>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPlanInput {
    pub week_start: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeekPlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ═══════════════════════════════════════
// GROCERY
// ═══════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub category: String,
    pub total_quantity: f64,
    pub unit: String,
    /// Names of the recipes that need this item
    pub recipes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub week_plan_id: i64,
    pub categories: BTreeMap<String, Vec<GroceryItem>>,
}

impl GroceryList {
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Vec::is_empty)
    }
}

// ═══════════════════════════════════════
// CHAT
// ═══════════════════════════════════════

/// What the assistant reasons over for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatContext {
    General,
    WeekPlan(i64),
    Recipe(i64),
}

impl ChatContext {
    pub fn context_type(&self) -> &'static str {
        match self {
            ChatContext::General => "general",
            ChatContext::WeekPlan(_) => "week_plan",
            ChatContext::Recipe(_) => "recipe",
        }
    }
}

/// Body for `POST /api/chat/sessions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSessionInput {
    pub context_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_plan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
}

impl From<ChatContext> for ChatSessionInput {
    fn from(context: ChatContext) -> Self {
        let (week_plan_id, recipe_id) = match context {
            ChatContext::General => (None, None),
            ChatContext::WeekPlan(id) => (Some(id), None),
            ChatContext::Recipe(id) => (None, Some(id)),
        };
        Self {
            context_type: context.context_type().to_string(),
            week_plan_id,
            recipe_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub context_type: String,
    #[serde(default)]
    pub week_plan_id: Option<i64>,
    #[serde(default)]
    pub recipe_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: ChatRole,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl ChatMessage {
    /// Client-only messages carry negative ids and are never persisted
    pub fn is_ephemeral(&self) -> bool {
        self.id < 0
    }
}

/// One record of the chat reply stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    Text {
        content: String,
    },
    ToolStart {
        tool: String,
        label: String,
    },
    ToolDone {
        tool: String,
        #[serde(default)]
        result: Value,
    },
    ToolError {
        tool: String,
        error: String,
    },
    Done,
}

impl ChatStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatStreamEvent::Done)
    }
}
