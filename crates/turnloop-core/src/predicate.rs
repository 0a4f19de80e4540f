//! Continuation Predicate
//!
//! Pure decision function run after every appended message.

use serde::{Deserialize, Serialize};

use crate::message::Conversation;
use crate::tool::ToolStatus;

/// Next control state of the turn loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ContinueToResponder,
    ContinueToTools,
    Halt,
}

/// Decide where the loop goes next.
///
/// - the latest message requests tools: run them
/// - the latest tool batch reports [`ToolStatus::Completed`]: halt
/// - anything else: hand control to the responder
pub fn next_transition(conversation: &Conversation) -> Transition {
    let Some(last) = conversation.last() else {
        return Transition::ContinueToResponder;
    };

    if last.has_tool_calls() {
        return Transition::ContinueToTools;
    }

    let completed = conversation
        .trailing_tool_results()
        .iter()
        .any(|m| m.status == Some(ToolStatus::Completed));

    if completed {
        Transition::Halt
    } else {
        Transition::ContinueToResponder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::tool::ToolCall;
    use std::collections::HashMap;

    fn with_calls(ids: &[&str]) -> Message {
        let calls = ids
            .iter()
            .map(|id| ToolCall::new("save", HashMap::new()).with_id(*id))
            .collect();
        Message::assistant("").with_tool_calls(calls)
    }

    #[test]
    fn test_empty_conversation() {
        assert_eq!(next_transition(&Conversation::new()), Transition::ContinueToResponder);
    }

    #[test]
    fn test_tool_calls_route_to_tools() {
        let mut conv = Conversation::new();
        conv.push(Message::user("save it")).unwrap();
        conv.push(with_calls(&["1"])).unwrap();
        assert_eq!(next_transition(&conv), Transition::ContinueToTools);
    }

    #[test]
    fn test_completed_batch_halts() {
        let mut conv = Conversation::new();
        conv.push(with_calls(&["1", "2"])).unwrap();
        conv.push(Message::tool("saved", "1", ToolStatus::Completed)).unwrap();
        conv.push(Message::tool("updated", "2", ToolStatus::Success)).unwrap();
        assert_eq!(next_transition(&conv), Transition::Halt);
    }

    #[test]
    fn test_failure_continues() {
        let mut conv = Conversation::new();
        conv.push(with_calls(&["1"])).unwrap();
        conv.push(Message::tool("Failed to save document", "1", ToolStatus::Failure))
            .unwrap();
        assert_eq!(next_transition(&conv), Transition::ContinueToResponder);
    }

    #[test]
    fn test_completion_text_alone_does_not_halt() {
        let mut conv = Conversation::new();
        conv.push(with_calls(&["1"])).unwrap();
        conv.push(Message::tool("Document saved successfully", "1", ToolStatus::Success))
            .unwrap();
        assert_eq!(next_transition(&conv), Transition::ContinueToResponder);
    }

    #[test]
    fn test_earlier_completion_is_ignored() {
        let mut conv = Conversation::new();
        conv.push(with_calls(&["1"])).unwrap();
        conv.push(Message::tool("saved", "1", ToolStatus::Completed)).unwrap();
        conv.push(Message::user("one more change")).unwrap();
        assert_eq!(next_transition(&conv), Transition::ContinueToResponder);
    }

    #[test]
    fn test_deterministic() {
        let mut conv = Conversation::new();
        conv.push(Message::user("hi")).unwrap();
        conv.push(Message::assistant("hello")).unwrap();
        let first = next_transition(&conv);
        for _ in 0..10 {
            assert_eq!(next_transition(&conv), first);
        }
    }
}
