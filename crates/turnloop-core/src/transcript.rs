//! Transcript export
//!
//! Renders a conversation as labelled lines and writes it to disk,
//! replacing any existing file.

use std::path::Path;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Role};

const HEADER: &str = "Your conversation log:";
const FOOTER: &str = "End of conversation.";

/// Render the whole conversation, including messages a history window
/// has dropped from the live view
pub fn render(conversation: &Conversation) -> String {
    let mut out = format!("{HEADER}\n");

    for message in conversation.history() {
        match message.role {
            Role::User => out.push_str(&format!("Human: {}\n", message.content)),
            Role::Assistant => out.push_str(&format!("AI: {}\n\n", message.content)),
            Role::Tool => out.push_str(&format!("Tool: {}\n", message.content)),
            Role::System => out.push_str(&format!("System: {}\n", message.content)),
        }
    }

    out.push_str(FOOTER);
    out.push('\n');
    out
}

/// Write the transcript to `path`
pub async fn export(path: impl AsRef<Path>, conversation: &Conversation) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, render(conversation))
        .await
        .map_err(|e| AgentError::Persistence(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), messages = conversation.history().len(), "Transcript written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{HistoryWindow, Message};

    fn sample() -> Conversation {
        let mut conv = Conversation::new();
        conv.push(Message::user("Hi, I'm Ada")).unwrap();
        conv.push(Message::assistant("Hello Ada!")).unwrap();
        conv
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(&sample()),
            "Your conversation log:\nHuman: Hi, I'm Ada\nAI: Hello Ada!\n\nEnd of conversation.\n"
        );
    }

    #[test]
    fn test_render_includes_windowed_messages() {
        let mut conv = sample();
        conv.push(Message::user("What's my name?")).unwrap();
        conv.push(Message::assistant("Ada.")).unwrap();
        conv.apply_window(&HistoryWindow { max_messages: 2, drop_count: 2 });
        assert_eq!(conv.messages()[0].content, "What's my name?");

        let out = render(&conv);
        assert!(out.starts_with("Your conversation log:\nHuman: Hi, I'm Ada\nAI: Hello Ada!\n\n"));
        assert!(out.contains("Human: What's my name?\nAI: Ada.\n\n"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Conversation::new()), "Your conversation log:\nEnd of conversation.\n");
    }

    #[tokio::test]
    async fn test_export_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.txt");
        std::fs::write(&path, "stale content that is longer than the new transcript ....").unwrap();

        export(&path, &sample()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), render(&sample()));
    }

    #[tokio::test]
    async fn test_export_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("logging.txt");

        let err = export(&path, &sample()).await.unwrap_err();
        assert!(matches!(err, AgentError::Persistence(_)));
    }
}
