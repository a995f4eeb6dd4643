// src/lib.rs
//! Mealz client: recipes, the meal calendar, grocery lists and the
//! sous-chef chat, over the Mealz REST API.

pub mod api;
pub mod cache;
pub mod calendar;
pub mod chat;
pub mod config;
pub mod grocery;
pub mod recipes;
pub mod types;

pub use api::{ApiClient, ApiError, ApiResult};
pub use config::Config;
