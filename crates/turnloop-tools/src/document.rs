//! Document Drafting Tools
//!
//! The drafter keeps one piece of text per session. `update` replaces it,
//! `save` writes it to `<filename>.txt` and completes the task.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use turnloop_core::{
    AgentError, ParameterSchema, Result, SessionState, Tool, ToolCall, ToolRegistry, ToolResult,
    ToolSchema,
};

const EXTENSION: &str = ".txt";

/// Session-scoped document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocumentState {
    content: String,

    /// Directory `save` writes into; empty means the working directory
    #[serde(default)]
    root: PathBuf,

    /// Where the document was last saved
    #[serde(default)]
    saved_to: Option<PathBuf>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save documents under `root` instead of the working directory
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }

    /// Overwrite the document
    pub fn update(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Write the document to `filename` (`.txt` appended when missing)
    pub async fn save(&mut self, filename: &str) -> Result<PathBuf> {
        let path = self.root.join(file_name(filename)?);
        tokio::fs::write(&path, &self.content)
            .await
            .map_err(|e| AgentError::Persistence(format!("{}: {e}", path.display())))?;
        self.saved_to = Some(path.clone());
        Ok(path)
    }
}

impl SessionState for DocumentState {
    fn prompt_context(&self) -> Option<String> {
        if self.content.is_empty() {
            Some("The document is currently empty.".into())
        } else {
            Some(format!("The current document content is:\n{}", self.content))
        }
    }
}

/// Normalise a model-supplied file name.
///
/// Only plain relative paths are accepted; absolute paths and `..` are
/// rejected so the model cannot write outside the save directory.
fn file_name(filename: &str) -> Result<String> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(AgentError::ToolValidation("filename must not be empty".into()));
    }
    let escapes = Path::new(filename)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(AgentError::ToolValidation(format!(
            "filename '{filename}' must be a relative path without '..'"
        )));
    }

    if filename.ends_with(EXTENSION) {
        Ok(filename.to_string())
    } else {
        Ok(format!("{filename}{EXTENSION}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DraftTool {
    Update,
    Save,
}

impl DraftTool {
    pub const ALL: [Self; 2] = [Self::Update, Self::Save];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Save => "save",
        }
    }
}

#[async_trait]
impl Tool<DocumentState> for DraftTool {
    fn schema(&self) -> ToolSchema {
        match self {
            Self::Update => ToolSchema {
                name: self.name().into(),
                description: "Updates the document with the provided content.".into(),
                parameters: vec![ParameterSchema::required(
                    "content",
                    "string",
                    "The complete updated document text",
                )],
            },
            Self::Save => ToolSchema {
                name: self.name().into(),
                description: "Saves the current document content to a text file and finishes the process.".into(),
                parameters: vec![ParameterSchema::required(
                    "filename",
                    "string",
                    "The name of the text file",
                )],
            },
        }
    }

    async fn execute(&self, call: &ToolCall, state: &mut DocumentState) -> Result<ToolResult> {
        match self {
            Self::Update => {
                state.update(call.str_arg("content")?);
                Ok(ToolResult::success(
                    self.name(),
                    format!(
                        "Document has been updated successfully! The current content is:\n{}",
                        state.content()
                    ),
                ))
            }
            Self::Save => {
                let filename = call.str_arg("filename")?;
                match state.save(filename).await {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "Document saved");
                        let name = path.file_name().map_or_else(
                            || path.display().to_string(),
                            |n| n.to_string_lossy().into_owned(),
                        );
                        Ok(ToolResult::completed(
                            self.name(),
                            format!("Document saved successfully to '{name}'."),
                        ))
                    }
                    Err(e) => Ok(ToolResult::failure(
                        self.name(),
                        format!("Failed to save document: {e}"),
                    )),
                }
            }
        }
    }
}

/// Registry holding `update` and `save`
pub fn registry() -> Result<ToolRegistry<DocumentState>> {
    let mut tools = ToolRegistry::new();
    for tool in DraftTool::ALL {
        tools.register(tool)?;
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use turnloop_core::ToolStatus;

    fn call(tool: DraftTool, key: &str, value: &str) -> ToolCall {
        let args = HashMap::from([(key.to_string(), json!(value))]);
        ToolCall::new(tool.name(), args).with_id(format!("{}-1", tool.name()))
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("out").unwrap(), "out.txt");
        assert_eq!(file_name("notes.txt").unwrap(), "notes.txt");
        assert_eq!(file_name("drafts/letter").unwrap(), "drafts/letter.txt");
        assert!(file_name("  ").is_err());
        assert!(file_name("../escape").is_err());
        assert!(file_name("/etc/passwd").is_err());
    }

    #[test]
    fn test_prompt_context() {
        let mut doc = DocumentState::new();
        assert_eq!(doc.prompt_context().unwrap(), "The document is currently empty.");
        doc.update("Dear team,");
        assert!(doc.prompt_context().unwrap().ends_with("Dear team,"));
    }

    #[tokio::test]
    async fn test_update_then_save() {
        let dir = tempfile::tempdir().unwrap();
        let tools = registry().unwrap();
        let mut doc = DocumentState::in_dir(dir.path());

        let updated = tools.invoke(&call(DraftTool::Update, "content", "Hello"), &mut doc).await.unwrap();
        assert_eq!(updated.status, Some(ToolStatus::Success));
        assert_eq!(
            updated.content,
            "Document has been updated successfully! The current content is:\nHello"
        );

        let saved = tools.invoke(&call(DraftTool::Save, "filename", "out"), &mut doc).await.unwrap();
        assert_eq!(saved.status, Some(ToolStatus::Completed));
        assert_eq!(saved.content, "Document saved successfully to 'out.txt'.");
        assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "Hello");
        assert_eq!(doc.saved_to(), Some(dir.path().join("out.txt").as_path()));
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = DocumentState::in_dir(dir.path());
        doc.update("Line one\nLine two");

        let path = doc.save("memo").await.unwrap();
        let first = std::fs::read(&path).unwrap();
        doc.save("memo.txt").await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, b"Line one\nLine two");
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tools = registry().unwrap();
        let mut doc = DocumentState::in_dir(dir.path().join("missing"));

        let msg = tools.invoke(&call(DraftTool::Save, "filename", "out"), &mut doc).await.unwrap();
        assert_eq!(msg.status, Some(ToolStatus::Failure));
        assert!(msg.content.starts_with("Failed to save document:"));
        assert!(doc.saved_to().is_none());
    }

    #[tokio::test]
    async fn test_rejected_filename_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tools = registry().unwrap();
        let mut doc = DocumentState::in_dir(dir.path());

        let msg = tools.invoke(&call(DraftTool::Save, "filename", "../x"), &mut doc).await.unwrap();
        assert_eq!(msg.status, Some(ToolStatus::Failure));
    }
}
