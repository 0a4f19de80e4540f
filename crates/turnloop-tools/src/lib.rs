//! # turnloop-tools
//!
//! Tools, session state and ready-made agents built on `turnloop-core`.
//!
//! ```text
//! ┌──────────────┬───────────────────────┬──────────────────────────────┐
//! │ agent        │ tools                 │ ends when                    │
//! ├──────────────┼───────────────────────┼──────────────────────────────┤
//! │ Chatbot      │ (none)                │ the user types "exit"        │
//! │ Drafter      │ update, save          │ save completes               │
//! │ ReactAgent   │ add, subtract,        │ the model answers without    │
//! │              │ multiply              │ requesting a tool            │
//! └──────────────┴───────────────────────┴──────────────────────────────┘
//! ```
//!
//! Tool sets are closed enums ([`ArithmeticTool`], [`DraftTool`]) registered
//! into a validated [`turnloop_core::ToolRegistry`] at startup.

pub mod agents;
pub mod arithmetic;
pub mod document;
pub mod prompts;

pub use agents::{AgentSettings, Chatbot, Drafter, ReactAgent, ReactRun};
pub use arithmetic::ArithmeticTool;
pub use document::{DocumentState, DraftTool};
