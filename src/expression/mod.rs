//! Gating predicate seam.
//!
//! Evaluating `when` expressions is delegated to an external
//! [`ExpressionEvaluator`]; the engine only decides what happens to an event
//! once the evaluator has answered.


use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::Error;
use crate::Event;
use crate::ExpressionError;
use crate::Result;

#[cfg_attr(test, automock)]
pub trait ExpressionEvaluator: Send + Sync + 'static {
    /// Evaluates `expression` against `event`.
    fn evaluate(
        &self,
        expression: &str,
        event: &Event,
    ) -> std::result::Result<bool, ExpressionError>;

    /// Syntax check run once at construction time.
    fn is_valid_expression(
        &self,
        _expression: &str,
    ) -> bool {
        true
    }
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &Event) -> std::result::Result<bool, ExpressionError> + Send + Sync + 'static,
{
    fn evaluate(
        &self,
        expression: &str,
        event: &Event,
    ) -> std::result::Result<bool, ExpressionError> {
        self(expression, event)
    }
}

/// A validated `when` expression bound to its evaluator.
#[derive(Clone)]
pub struct Gate {
    expression: String,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl Gate {
    /// Checks `expression` with the evaluator's syntax check.
    pub fn new(
        expression: impl Into<String>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Result<Self> {
        let expression = expression.into();
        if !evaluator.is_valid_expression(&expression) {
            return Err(Error::config(format!("invalid when expression: {expression}")));
        }
        Ok(Self { expression, evaluator })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether `event` enters aggregation. Evaluation failures propagate.
    pub fn admits(
        &self,
        event: &Event,
    ) -> Result<bool> {
        Ok(self.evaluator.evaluate(&self.expression, event)?)
    }
}

impl fmt::Debug for Gate {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Gate").field("expression", &self.expression).finish()
    }
}
