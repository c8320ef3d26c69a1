//! The stop-condition contract for multi-step runs.

use crate::response::step::Step;

/// A predicate deciding whether a multi-step run should end.
///
/// Evaluated after every step with the 1-based step number and the step that
/// just completed. Built-in conditions and combinators live in the core
/// crate; closures of the matching shape implement the trait directly.
///
/// # Example
///
/// ```
/// use genai_kit_provider::stop_condition::StopCondition;
/// use genai_kit_provider::response::Step;
///
/// let stop_after_three = |step_number: usize, _step: &Step| step_number >= 3;
/// assert!(stop_after_three.should_stop(3, &Step::new(3, "done")));
/// ```
pub trait StopCondition: Send + Sync {
    /// Returns `true` when the run should end after this step.
    fn should_stop(&self, step_number: usize, step: &Step) -> bool;
}

impl<F> StopCondition for F
where
    F: Fn(usize, &Step) -> bool + Send + Sync,
{
    fn should_stop(&self, step_number: usize, step: &Step) -> bool {
        self(step_number, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_implements_stop_condition() {
        let condition = |n: usize, _: &Step| n >= 2;
        assert!(!condition.should_stop(1, &Step::new(1, "a")));
        assert!(condition.should_stop(2, &Step::new(2, "b")));
    }
}
