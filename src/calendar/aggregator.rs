// src/calendar/aggregator.rs
// Week Plan Aggregator: one query per visible week, merged into a slot index,
// plus the add / move / leftover / delete mutations behind the calendar

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::index::SlotIndex;
use super::{MonthGrid, week_start_for};
use crate::api::{ApiResult, PlannerApi};
use crate::cache::{Invalidation, QueryCache, QueryKey};
use crate::types::{MealSlot, MealSlotInput, MealSlotUpdate, WeekPlan, WeekPlanInput};

/// Drag state machine: `Idle -> Dragging(slot) -> Idle`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(MealSlot),
}

/// What a drop did
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Moved(MealSlot),
    /// Dropped outside any day cell
    NoTarget,
    /// Dropped back onto its own day
    SameDate,
    /// The slot is no longer in the index
    SlotMissing,
}

pub struct WeekPlanAggregator<A: PlannerApi> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    grid: MonthGrid,
    /// Last result per week query; `None` means the week has no plan
    plans: BTreeMap<NaiveDate, Option<WeekPlan>>,
    index: SlotIndex,
    drag: DragState,
}

impl<A: PlannerApi> WeekPlanAggregator<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>, grid: MonthGrid) -> Self {
        Self {
            api,
            cache,
            grid,
            plans: BTreeMap::new(),
            index: SlotIndex::default(),
            drag: DragState::Idle,
        }
    }

    pub fn grid(&self) -> &MonthGrid {
        &self.grid
    }

    pub fn index(&self) -> &SlotIndex {
        &self.index
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// True until every visible week has a result
    pub fn is_loading(&self) -> bool {
        self.grid
            .week_starts()
            .iter()
            .any(|week_start| !self.plans.contains_key(week_start))
    }

    /// Plan owning the week that contains `date`, if loaded
    pub fn plan_for_date(&self, date: NaiveDate) -> Option<&WeekPlan> {
        let week_start = week_start_for(date, self.grid.first_day());
        self.plans.get(&week_start).and_then(Option::as_ref)
    }

    /// Switch the visible month and load the weeks not yet fresh.
    /// Weeks that scroll out of view are dropped.
    pub async fn set_month(&mut self, month: NaiveDate) -> ApiResult<()> {
        if let Some(grid) = MonthGrid::containing(month, self.grid.first_day()) {
            debug!("Calendar now showing {}", grid.title());
            let visible = grid.week_starts();
            self.plans.retain(|week_start, _| visible.contains(week_start));
            self.grid = grid;
        }
        self.refresh().await
    }

    /// Fetch every stale visible week concurrently, then rebuild the index.
    ///
    /// Successful weeks are kept even when another week fails; the first
    /// failure is returned.
    pub async fn refresh(&mut self) -> ApiResult<()> {
        let stale: Vec<NaiveDate> = self
            .grid
            .week_starts()
            .into_iter()
            .filter(|week_start| {
                !self.cache.is_fresh(&QueryKey::WeekPlan(*week_start))
                    || !self.plans.contains_key(week_start)
            })
            .collect();

        let mut first_error = None;

        if !stale.is_empty() {
            debug!(weeks = stale.len(), "Fetching week plans");
            let api = &self.api;
            let results = join_all(stale.iter().map(|week_start| async move {
                (*week_start, api.fetch_week_plan(*week_start).await)
            }))
            .await;

            for (week_start, result) in results {
                match result {
                    Ok(plan) => {
                        self.cache.mark_fresh(QueryKey::WeekPlan(week_start));
                        self.plans.insert(week_start, plan);
                    }
                    Err(e) => {
                        warn!("Failed to load week plan for {}: {}", week_start, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        self.rebuild_index();
        first_error.map_or(Ok(()), Err)
    }

    fn rebuild_index(&mut self) {
        let week_starts = self.grid.week_starts();
        let plans = &self.plans;
        self.index = SlotIndex::build(week_starts.into_iter().filter_map(|week_start| {
            plans.get(&week_start).map(|plan| (week_start, plan.as_ref()))
        }));
    }

    /// Reload weeks invalidated elsewhere (e.g. by the assistant) before a
    /// mutation reads the index. A failed week keeps its last result.
    async fn catch_up(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!("Calendar may be out of date: {}", e);
        }
    }

    /// Mark every visible week stale and reload. The mutation already
    /// succeeded, so a failed reload is only logged; the failed weeks stay
    /// stale and are retried by the next `refresh`.
    async fn invalidate_and_refresh(&mut self) {
        for week_start in self.grid.week_starts() {
            self.cache.invalidate(Invalidation::WeekPlan(week_start));
        }
        if let Err(e) = self.refresh().await {
            warn!("Reload after calendar change failed: {}", e);
        }
    }

    /// Plan for the canonical week of `date`, created if the week has none
    pub async fn ensure_plan(&mut self, date: NaiveDate) -> ApiResult<WeekPlan> {
        let week_start = week_start_for(date, self.grid.first_day());
        let key = QueryKey::WeekPlan(week_start);

        let cached = if self.cache.is_fresh(&key) {
            self.plans.get(&week_start).cloned()
        } else {
            None
        };
        let known = match cached {
            Some(plan) => plan,
            None => {
                let plan = self.api.fetch_week_plan(week_start).await?;
                self.cache.mark_fresh(key);
                self.plans.insert(week_start, plan.clone());
                plan
            }
        };
        if let Some(plan) = known {
            return Ok(plan);
        }

        let plan = self
            .api
            .create_week_plan(&WeekPlanInput {
                week_start,
                notes: None,
            })
            .await?;
        info!("Created week plan {} for week of {}", plan.id, week_start);
        self.plans.insert(week_start, Some(plan.clone()));
        Ok(plan)
    }

    /// Schedule `recipe_id` as dinner on `date`, after the day's existing slots
    pub async fn add_slot(&mut self, date: NaiveDate, recipe_id: i64) -> ApiResult<MealSlot> {
        self.catch_up().await;
        let plan = self.ensure_plan(date).await?;
        let sort_order = i32::try_from(self.day_slot_count(&plan, date)).unwrap_or(i32::MAX);

        let slot = self
            .api
            .add_meal_slot(plan.id, &MealSlotInput::dinner(date, recipe_id, sort_order))
            .await?;
        debug!(slot_id = slot.id, plan_id = plan.id, %date, "Added meal slot");

        self.invalidate_and_refresh().await;
        Ok(slot)
    }

    /// Slots already on `date`; falls back to the plan itself when the
    /// day is outside the visible grid
    fn day_slot_count(&self, plan: &WeekPlan, date: NaiveDate) -> usize {
        if self.grid.contains(date) {
            self.index.slot_count(date)
        } else {
            plan.slots.iter().filter(|slot| slot.date == date).count()
        }
    }

    /// Begin dragging; an unknown id leaves the state `Idle`
    pub fn drag_start(&mut self, slot_id: i64) -> bool {
        match self.index.find_slot(slot_id) {
            Some(slot) => {
                self.drag = DragState::Dragging(slot.clone());
                true
            }
            None => {
                self.drag = DragState::Idle;
                false
            }
        }
    }

    /// Drop `slot_id` on `target`. Always ends the drag.
    ///
    /// The slot stays attached to its original week plan even when the new
    /// date falls in another week.
    pub async fn drag_end(
        &mut self,
        slot_id: i64,
        target: Option<NaiveDate>,
    ) -> ApiResult<DropOutcome> {
        self.drag = DragState::Idle;

        let Some(target) = target else {
            return Ok(DropOutcome::NoTarget);
        };
        self.catch_up().await;
        let Some(slot) = self.index.find_slot(slot_id).cloned() else {
            debug!(slot_id, "Dropped slot not found, ignoring");
            return Ok(DropOutcome::SlotMissing);
        };
        if slot.date == target {
            return Ok(DropOutcome::SameDate);
        }

        let first_day = self.grid.first_day();
        if week_start_for(slot.date, first_day) != week_start_for(target, first_day) {
            warn!(
                "Moving slot {} from {} to {} across weeks; it stays in week plan {}",
                slot.id, slot.date, target, slot.week_plan_id
            );
        }

        let moved = self
            .api
            .update_meal_slot(slot.week_plan_id, slot.id, &MealSlotUpdate::move_to(target))
            .await?;

        self.invalidate_and_refresh().await;
        Ok(DropOutcome::Moved(moved))
    }

    pub async fn toggle_leftover(&mut self, slot: &MealSlot) -> ApiResult<MealSlot> {
        self.catch_up().await;
        let updated = self
            .api
            .update_meal_slot(
                slot.week_plan_id,
                slot.id,
                &MealSlotUpdate::leftover(!slot.is_leftover),
            )
            .await?;
        self.invalidate_and_refresh().await;
        Ok(updated)
    }

    pub async fn delete_slot(&mut self, slot: &MealSlot) -> ApiResult<()> {
        self.catch_up().await;
        self.api.delete_meal_slot(slot.week_plan_id, slot.id).await?;
        self.invalidate_and_refresh().await;
        Ok(())
    }
}
