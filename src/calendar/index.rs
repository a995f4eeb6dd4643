// src/calendar/index.rs
// Derived lookup over the visible week plans

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::{MealSlot, WeekPlan};

/// Date -> slots and week start -> plan, rebuilt from query results.
///
/// Never patched in place; every refresh produces a new index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotIndex {
    by_date: BTreeMap<NaiveDate, Vec<MealSlot>>,
    plans: BTreeMap<NaiveDate, WeekPlan>,
}

impl SlotIndex {
    /// Build from `(week_start, plan)` query results. Slots for a date are
    /// ordered by `sort_order`, ties keep server order.
    pub fn build<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<&'a WeekPlan>)>,
    {
        let mut index = Self::default();

        for (week_start, plan) in results {
            let Some(plan) = plan else { continue };
            for slot in &plan.slots {
                index.by_date.entry(slot.date).or_default().push(slot.clone());
            }
            // Keyed by the queried week, which is what lookups use
            index.plans.insert(week_start, plan.clone());
        }

        for slots in index.by_date.values_mut() {
            slots.sort_by_key(|slot| slot.sort_order);
        }
        index
    }

    pub fn slots_on(&self, date: NaiveDate) -> &[MealSlot] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slot_count(&self, date: NaiveDate) -> usize {
        self.slots_on(date).len()
    }

    pub fn plan_for_week(&self, week_start: NaiveDate) -> Option<&WeekPlan> {
        self.plans.get(&week_start)
    }

    pub fn find_slot(&self, slot_id: i64) -> Option<&MealSlot> {
        self.by_date.values().flatten().find(|slot| slot.id == slot_id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &MealSlot> {
        self.by_date.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
