// src/chat/mod.rs
// Chat with the cooking assistant: session controller and stream reducer

pub mod controller;
pub mod reducer;

pub use controller::{ChatController, ChatError, ChatState, ChatView, QUICK_SUGGESTIONS};
pub use reducer::{StreamReducer, ToolFailure};

/// Tools whose completion changes recipe data
pub const TOOL_CREATE_RECIPE: &str = "create_recipe";
pub const TOOL_UPDATE_RECIPE: &str = "update_recipe";
/// Tool whose completion changes week plans
pub const TOOL_ADD_TO_PLAN: &str = "add_to_plan";

/// Id of the pending user message shown while a reply streams
pub const PENDING_USER_MESSAGE_ID: i64 = -2;
/// Id of the assistant message being streamed
pub const STREAMING_ASSISTANT_MESSAGE_ID: i64 = -1;
