//! Arithmetic Tools
//!
//! Integer `add`, `subtract` and `multiply` for the ReAct agent. They touch
//! no session state, so they work with any `S`.

use async_trait::async_trait;

use turnloop_core::{
    AgentError, ParameterSchema, Result, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticTool {
    Add,
    Subtract,
    Multiply,
}

impl ArithmeticTool {
    pub const ALL: [Self; 3] = [Self::Add, Self::Subtract, Self::Multiply];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Add => "This is an addition function that adds 2 numbers together",
            Self::Subtract => "This is a subtraction function that subtracts b from a",
            Self::Multiply => "This is a multiplication function that multiplies 2 numbers",
        }
    }

    /// Apply the operation; `None` on overflow
    pub const fn apply(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Self::Add => a.checked_add(b),
            Self::Subtract => a.checked_sub(b),
            Self::Multiply => a.checked_mul(b),
        }
    }
}

#[async_trait]
impl<S: Send> Tool<S> for ArithmeticTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            parameters: vec![
                ParameterSchema::required("a", "integer", "First operand"),
                ParameterSchema::required("b", "integer", "Second operand"),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, _state: &mut S) -> Result<ToolResult> {
        let a = call.int_arg("a")?;
        let b = call.int_arg("b")?;

        let value = self.apply(a, b).ok_or_else(|| {
            AgentError::ToolExecution(format!("{}({a}, {b}) overflows a 64-bit integer", self.name()))
        })?;

        Ok(ToolResult::success(self.name(), value.to_string()))
    }
}

/// Registry holding every arithmetic tool
pub fn registry<S: Send>() -> Result<ToolRegistry<S>> {
    let mut tools = ToolRegistry::new();
    for tool in ArithmeticTool::ALL {
        tools.register(tool)?;
    }
    Ok(tools)
}
