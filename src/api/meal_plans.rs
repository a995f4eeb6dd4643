// src/api/meal_plans.rs
// Week plans, their meal slots and the per-plan grocery list

use chrono::NaiveDate;
use tracing::info;

use super::error::ApiResult;
use super::ApiClient;
use crate::types::{
    GroceryList, MealSlot, MealSlotInput, MealSlotUpdate, WeekPlan, WeekPlanInput, WeekPlanUpdate,
};

impl ApiClient {
    /// Plan for the week starting at `week_start`; `None` when there is none yet
    pub async fn fetch_week_plan(&self, week_start: NaiveDate) -> ApiResult<Option<WeekPlan>> {
        let query = [("week_start", week_start.format("%Y-%m-%d").to_string())];
        self.get("/api/meal-plans", &query).await
    }

    /// Fails with a 400 `Http` error when a plan already exists for that week
    pub async fn create_week_plan(&self, input: &WeekPlanInput) -> ApiResult<WeekPlan> {
        let plan: WeekPlan = self.post("/api/meal-plans", input).await?;
        info!("Week plan {} created for {}", plan.id, plan.week_start);
        Ok(plan)
    }

    pub async fn update_week_plan(&self, id: i64, update: &WeekPlanUpdate) -> ApiResult<WeekPlan> {
        self.put(&format!("/api/meal-plans/{}", id), update).await
    }

    pub async fn add_meal_slot(&self, plan_id: i64, input: &MealSlotInput) -> ApiResult<MealSlot> {
        self.post(&format!("/api/meal-plans/{}/slots", plan_id), input)
            .await
    }

    pub async fn update_meal_slot(
        &self,
        plan_id: i64,
        slot_id: i64,
        update: &MealSlotUpdate,
    ) -> ApiResult<MealSlot> {
        self.put(
            &format!("/api/meal-plans/{}/slots/{}", plan_id, slot_id),
            update,
        )
        .await
    }

    pub async fn delete_meal_slot(&self, plan_id: i64, slot_id: i64) -> ApiResult<()> {
        self.delete(&format!("/api/meal-plans/{}/slots/{}", plan_id, slot_id))
            .await
    }

    pub async fn fetch_grocery_list(&self, plan_id: i64) -> ApiResult<GroceryList> {
        self.get(&format!("/api/meal-plans/{}/grocery-list", plan_id), &[])
            .await
    }
}
