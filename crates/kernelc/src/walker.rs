//! The Generic Walker (§4.7): a table-driven AST dispatcher plus the
//! traversal-state stack and internal variable name counter it threads
//! through recursion.
//!
//! The dispatch table itself lives as the `match` in
//! [`crate::function_unit::FunctionUnit::walk_expr`] /
//! `walk_stmt`; this module defines the `Backend` trait whose default
//! method bodies are the fixed-behavior handlers §4.7 contracts, and
//! whose remaining methods are no-op seams for a backend to override.

use ahash::AHashMap;

use crate::errors::{StateError, TranspileError};
use crate::expressions::{AssignOp, BinaryOp, ExprLoc, FunctionNode, Literal, NodeLoc};
use crate::function_unit::FunctionUnit;
use crate::intern::StringId;
use crate::types::Type;

/// The one traversal-state label the core recognizes.
pub const IN_FOR_LOOP_INIT: &str = "in-for-loop-init";

/// An ordered sequence of labels pushed/popped by the walker to record
/// lexical context (Data Model "Traversal State Stack").
#[derive(Debug, Default)]
pub struct TraversalStateStack {
    stack: Vec<&'static str>,
}

impl TraversalStateStack {
    pub fn push(&mut self, label: &'static str) {
        self.stack.push(label);
    }

    /// Pops the top label, failing (stack left unchanged) if it does not
    /// match `label` (invariant v).
    pub fn pop(&mut self, label: &'static str) -> Result<(), StateError> {
        match self.stack.last() {
            None => Err(StateError::StackUnderflow),
            Some(top) if *top == label => {
                self.stack.pop();
                Ok(())
            }
            Some(top) => Err(StateError::PopMismatch { expected: label, found: top }),
        }
    }

    pub fn top(&self) -> Option<&'static str> {
        self.stack.last().copied()
    }

    pub fn is_in_for_loop_init(&self) -> bool {
        self.top() == Some(IN_FOR_LOOP_INIT)
    }
}

/// A mapping from a requested short name to the number of times it has
/// been issued (Data Model "Internal Variable Name Counter"). The first
/// issuance returns the name unchanged; later ones append the count.
#[derive(Debug, Default)]
pub struct VariableNameCounter {
    counts: AHashMap<String, u32>,
}

impl VariableNameCounter {
    pub fn issue(&mut self, requested: &str) -> String {
        let count = self.counts.entry(requested.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 { requested.to_string() } else { format!("{requested}{count}") }
    }
}

/// Extension seams required from a backend (§6), plus the fixed-behavior
/// handlers from §4.7 as overridable defaults.
///
/// A default method's body is the literal §4.7 contract for kinds the
/// core fixes; methods with an empty-string default are no-op seams a
/// backend is expected to override to emit target-dialect text.
pub trait Backend: Clone {
    /// Lowered type name used in emitted declarations. A missing mapping
    /// for a type that is actually needed is a fatal `ShapeError`.
    fn type_map(&self, ty: Type) -> Option<String>;

    /// Resolves a user-defined call's return type. Consulted only after
    /// the math-intrinsic rules in §4.3 have been checked.
    fn lookup_return_type(&self, name: &str) -> Option<Type>;

    fn on_function_declaration(
        &self,
        unit: &mut FunctionUnit<Self>,
        func: &FunctionNode,
        is_nested: bool,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, func, is_nested);
        Ok(String::new())
    }

    fn on_return(
        &self,
        unit: &mut FunctionUnit<Self>,
        value: Option<&ExprLoc>,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, value);
        Ok(String::new())
    }

    fn on_literal(&self, unit: &mut FunctionUnit<Self>, literal: &Literal) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, literal);
        Ok(String::new())
    }

    fn on_identifier(&self, unit: &mut FunctionUnit<Self>, name: StringId) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, name);
        Ok(String::new())
    }

    fn on_binary(
        &self,
        unit: &mut FunctionUnit<Self>,
        op: BinaryOp,
        left: &ExprLoc,
        right: &ExprLoc,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, op, left, right);
        Ok(String::new())
    }

    fn on_assignment(
        &self,
        unit: &mut FunctionUnit<Self>,
        op: AssignOp,
        target: &ExprLoc,
        value: &ExprLoc,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, op, target, value);
        Ok(String::new())
    }

    fn on_empty(&self, unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = unit;
        Ok(String::new())
    }

    fn on_block(&self, unit: &mut FunctionUnit<Self>, body: &[NodeLoc]) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, body);
        Ok(String::new())
    }

    fn on_if(
        &self,
        unit: &mut FunctionUnit<Self>,
        test: &ExprLoc,
        consequent: &NodeLoc,
        alternate: Option<&NodeLoc>,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, test, consequent, alternate);
        Ok(String::new())
    }

    fn on_for(
        &self,
        unit: &mut FunctionUnit<Self>,
        init: Option<&NodeLoc>,
        test: Option<&ExprLoc>,
        update: Option<&ExprLoc>,
        body: &NodeLoc,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, init, test, update, body);
        Ok(String::new())
    }

    fn on_while(
        &self,
        unit: &mut FunctionUnit<Self>,
        test: &ExprLoc,
        body: &NodeLoc,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, test, body);
        Ok(String::new())
    }

    fn on_do_while(
        &self,
        unit: &mut FunctionUnit<Self>,
        body: &NodeLoc,
        test: &ExprLoc,
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, body, test);
        Ok(String::new())
    }

    fn on_this(&self, unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = unit;
        Ok(String::new())
    }

    fn on_member(&self, unit: &mut FunctionUnit<Self>, expr: &ExprLoc) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, expr);
        Ok(String::new())
    }

    fn on_call(
        &self,
        unit: &mut FunctionUnit<Self>,
        callee: &ExprLoc,
        arguments: &[ExprLoc],
    ) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, callee, arguments);
        Ok(String::new())
    }

    fn on_array(&self, unit: &mut FunctionUnit<Self>, elements: &[ExprLoc]) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = (unit, elements);
        Ok(String::new())
    }

    fn on_debugger(&self, unit: &mut FunctionUnit<Self>) -> Result<String, TranspileError>
    where
        Self: Sized,
    {
        let _ = unit;
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_issues_suffixed_names_in_order() {
        let mut counter = VariableNameCounter::default();
        assert_eq!(counter.issue("n"), "n");
        assert_eq!(counter.issue("n"), "n2");
        assert_eq!(counter.issue("n"), "n3");
        assert_eq!(counter.issue("other"), "other");
    }

    #[test]
    fn stack_rejects_mismatched_pop_and_leaves_state_unchanged() {
        let mut stack = TraversalStateStack::default();
        stack.push(IN_FOR_LOOP_INIT);
        let err = stack.pop("something-else").unwrap_err();
        assert!(matches!(err, StateError::PopMismatch { .. }));
        assert_eq!(stack.top(), Some(IN_FOR_LOOP_INIT));
    }

    #[test]
    fn empty_stack_pop_is_underflow() {
        let mut stack = TraversalStateStack::default();
        assert_eq!(stack.pop(IN_FOR_LOOP_INIT), Err(StateError::StackUnderflow));
    }
}
