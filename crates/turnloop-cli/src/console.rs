//! Console I/O
//!
//! Dialogue goes to stdout; logs go to stderr.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use turnloop_core::{CancellationToken, Message, Role};

pub struct Console<R = Stdin> {
    lines: Lines<BufReader<R>>,
    cancel: CancellationToken,
}

impl Console {
    pub fn stdin(cancel: CancellationToken) -> Self {
        Self::new(tokio::io::stdin(), cancel)
    }
}

impl<R: AsyncRead + Unpin> Console<R> {
    pub fn new(reader: R, cancel: CancellationToken) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            cancel,
        }
    }

    /// Print `label` and read one line.
    ///
    /// `None` on end of input or once the session is cancelled, so Ctrl-C
    /// at a prompt ends the session without waiting for Enter.
    pub async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush().context("flushing stdout")?;

        let line = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                println!();
                return Ok(None);
            }
            line = self.lines.next_line() => line.context("reading stdin")?,
        };
        Ok(line.map(|l| l.trim().to_string()))
    }
}

pub fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit")
}

/// Render one message the way the console shows it, if it is shown at all
pub fn render(message: &Message) -> Option<String> {
    match message.role {
        Role::User => Some(format!("USER: {}", message.content)),
        Role::Assistant => {
            let mut out = Vec::new();
            if !message.content.trim().is_empty() {
                out.push(format!("AI: {}", message.content));
            }
            if message.has_tool_calls() {
                let names: Vec<_> = message.tool_calls.iter().map(|c| c.name.as_str()).collect();
                out.push(format!("USING TOOL: [{}]", names.join(", ")));
            }
            (!out.is_empty()).then(|| out.join("\n"))
        }
        Role::Tool => Some(format!("TOOL RESULTS: {}", message.content)),
        Role::System => None,
    }
}

/// Print model and tool messages, skipping the user's own input
pub fn show(messages: &[Message]) {
    for message in messages.iter().filter(|m| m.role != Role::User) {
        if let Some(text) = render(message) {
            println!("\n{text}");
        }
    }
    println!();
}
