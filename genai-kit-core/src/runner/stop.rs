use genai_kit_provider::response::Step;
use genai_kit_provider::stop_condition::StopCondition;
use std::sync::Arc;

/// Stops once the given number of steps have completed.
#[derive(Debug, Clone)]
pub struct MaxSteps {
    step_count: usize,
}

impl StopCondition for MaxSteps {
    fn should_stop(&self, step_number: usize, _step: &Step) -> bool {
        step_number >= self.step_count
    }
}

/// Creates a condition that stops after `step_count` steps.
///
/// # Example
///
/// ```
/// use genai_kit_core::runner::stop::max_steps;
///
/// // Stop after at most 3 inference steps.
/// let condition = max_steps(3);
/// ```
pub fn max_steps(step_count: usize) -> MaxSteps {
    MaxSteps { step_count }
}

/// Stops when the latest step emitted no tool calls.
#[derive(Debug, Clone)]
pub struct NoMoreTools;

impl StopCondition for NoMoreTools {
    fn should_stop(&self, _step_number: usize, step: &Step) -> bool {
        !step.has_tool_calls()
    }
}

/// Creates a condition that stops when the model stops calling tools.
pub fn no_more_tools() -> NoMoreTools {
    NoMoreTools
}

/// Stops when a call to the named tool has been emitted.
///
/// Evaluated after every step, so a call in any step ends the run.
#[derive(Debug, Clone)]
pub struct UntilToolSeen {
    tool_name: String,
}

impl StopCondition for UntilToolSeen {
    fn should_stop(&self, _step_number: usize, step: &Step) -> bool {
        step.tool_calls.iter().any(|tc| tc.name == self.tool_name)
    }
}

/// Creates a condition that stops once the named tool has been called.
///
/// # Example
///
/// ```
/// use genai_kit_core::runner::stop::until_tool_seen;
///
/// // Stop when the model calls the "final_answer" tool.
/// let condition = until_tool_seen("final_answer");
/// ```
pub fn until_tool_seen(tool_name: impl Into<String>) -> UntilToolSeen {
    UntilToolSeen {
        tool_name: tool_name.into(),
    }
}

/// How a [`Combine`] condition folds its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Stop when any child condition is met.
    Any,
    /// Stop only when all child conditions are met.
    All,
}

/// Short-circuit boolean composition of stop conditions.
pub struct Combine {
    mode: CombineMode,
    conditions: Vec<Arc<dyn StopCondition>>,
}

impl StopCondition for Combine {
    fn should_stop(&self, step_number: usize, step: &Step) -> bool {
        match self.mode {
            CombineMode::Any => self
                .conditions
                .iter()
                .any(|c| c.should_stop(step_number, step)),
            CombineMode::All => self
                .conditions
                .iter()
                .all(|c| c.should_stop(step_number, step)),
        }
    }
}

/// Stops when any of the given conditions is met.
pub fn combine_any(conditions: Vec<Arc<dyn StopCondition>>) -> Combine {
    Combine {
        mode: CombineMode::Any,
        conditions,
    }
}

/// Stops only when all of the given conditions are met.
pub fn combine_all(conditions: Vec<Arc<dyn StopCondition>>) -> Combine {
    Combine {
        mode: CombineMode::All,
        conditions,
    }
}
