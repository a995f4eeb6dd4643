// src/chat/reducer.rs
// Folds chat stream events into visible state plus cache side effects

use tracing::{debug, warn};

use super::{TOOL_ADD_TO_PLAN, TOOL_CREATE_RECIPE, TOOL_UPDATE_RECIPE};
use crate::cache::Invalidation;
use crate::types::ChatStreamEvent;

/// A tool call that failed during the current reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub tool: String,
    pub error: String,
}

/// State of one streamed assistant reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReducer {
    text: String,
    tool_status: Option<String>,
    last_tool_error: Option<ToolFailure>,
    finished: bool,
}

impl StreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything the assistant has said so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Label of the tool currently running
    pub fn tool_status(&self) -> Option<&str> {
        self.tool_status.as_deref()
    }

    pub fn last_tool_error(&self) -> Option<&ToolFailure> {
        self.last_tool_error.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one event. Returns the cache scope to invalidate, if any.
    ///
    /// Events after `done` are ignored.
    pub fn apply(&mut self, event: &ChatStreamEvent) -> Option<Invalidation> {
        if self.finished {
            debug!(?event, "Ignoring event after done");
            return None;
        }

        match event {
            ChatStreamEvent::Text { content } => {
                self.text.push_str(content);
                None
            }
            ChatStreamEvent::ToolStart { tool, label } => {
                debug!(tool = %tool, "Tool started");
                self.tool_status = Some(label.clone());
                None
            }
            ChatStreamEvent::ToolDone { tool, .. } => {
                self.tool_status = None;
                invalidation_for_tool(tool)
            }
            ChatStreamEvent::ToolError { tool, error } => {
                warn!("Assistant tool {} failed: {}", tool, error);
                self.tool_status = None;
                self.last_tool_error = Some(ToolFailure {
                    tool: tool.clone(),
                    error: error.clone(),
                });
                None
            }
            ChatStreamEvent::Done => {
                self.finished = true;
                self.tool_status = None;
                None
            }
        }
    }
}

/// Caches touched by a completed tool call
pub fn invalidation_for_tool(tool: &str) -> Option<Invalidation> {
    match tool {
        TOOL_CREATE_RECIPE | TOOL_UPDATE_RECIPE => Some(Invalidation::Recipes),
        TOOL_ADD_TO_PLAN => Some(Invalidation::WeekPlans),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> ChatStreamEvent {
        ChatStreamEvent::Text { content: s.into() }
    }

    fn tool_done(tool: &str) -> ChatStreamEvent {
        ChatStreamEvent::ToolDone {
            tool: tool.into(),
            result: json!({"success": true}),
        }
    }

    #[test]
    fn test_text_accumulates_in_order() {
        let mut reducer = StreamReducer::new();
        for part in ["Try ", "a ", "frittata."] {
            assert!(reducer.apply(&text(part)).is_none());
        }
        assert_eq!(reducer.text(), "Try a frittata.");
    }

    #[test]
    fn test_tool_status_lifecycle() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&text("One moment."));
        reducer.apply(&ChatStreamEvent::ToolStart {
            tool: "search_recipes".into(),
            label: "Searching recipes...".into(),
        });
        assert_eq!(reducer.tool_status(), Some("Searching recipes..."));
        assert_eq!(reducer.text(), "One moment.");

        assert!(reducer.apply(&tool_done("search_recipes")).is_none());
        assert!(reducer.tool_status().is_none());
    }

    #[test]
    fn test_tool_done_invalidations() {
        let mut reducer = StreamReducer::new();
        assert_eq!(reducer.apply(&tool_done("add_to_plan")), Some(Invalidation::WeekPlans));
        assert_eq!(reducer.apply(&tool_done("create_recipe")), Some(Invalidation::Recipes));
        assert_eq!(reducer.apply(&tool_done("update_recipe")), Some(Invalidation::Recipes));
        assert_eq!(reducer.apply(&tool_done("get_week_plan")), None);
    }

    #[test]
    fn test_tool_error_clears_status_and_is_kept() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&ChatStreamEvent::ToolStart {
            tool: "add_to_plan".into(),
            label: "Adding to meal plan...".into(),
        });
        let effect = reducer.apply(&ChatStreamEvent::ToolError {
            tool: "add_to_plan".into(),
            error: "Recipe 99 not found".into(),
        });
        assert!(effect.is_none());
        assert!(reducer.tool_status().is_none());
        assert_eq!(reducer.last_tool_error().unwrap().error, "Recipe 99 not found");
        assert_eq!(reducer.text(), "");
    }

    #[test]
    fn test_events_after_done_are_ignored() {
        let mut reducer = StreamReducer::new();
        reducer.apply(&text("Done."));
        reducer.apply(&ChatStreamEvent::Done);
        assert!(reducer.is_finished());

        assert!(reducer.apply(&tool_done("add_to_plan")).is_none());
        reducer.apply(&text(" Extra"));
        assert_eq!(reducer.text(), "Done.");
    }
}
