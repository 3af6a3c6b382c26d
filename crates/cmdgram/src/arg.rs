use std::collections::HashSet;

use crate::context::{Action, Flow, ParseContext};
use crate::error::GrammarError;
use crate::value::{Value, value_constructors};

pub(crate) struct ArgDecl {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) required: bool,
    pub(crate) default: Option<String>,
    pub(crate) value: Option<Box<dyn Value>>,
    pub(crate) action: Option<Action>,
}

impl ArgDecl {
    pub(crate) fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            required: false,
            default: None,
            value: None,
            action: None,
        }
    }

    /// A cumulative sink swallows every remaining positional.
    pub(crate) fn consumes_remainder(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_cumulative())
    }
}

/// Check one scope's ordered argument list.
pub(crate) fn validate_args(args: &[ArgDecl]) -> Result<(), GrammarError> {
    let mut seen = HashSet::new();
    let mut seen_optional = false;
    let mut previous_was_remainder = false;

    for arg in args {
        if previous_was_remainder {
            return Err(GrammarError::ArgumentAfterRemainder(arg.name.clone()));
        }
        if !seen.insert(arg.name.as_str()) {
            return Err(GrammarError::DuplicateArgument(arg.name.clone()));
        }
        if arg.required && seen_optional {
            return Err(GrammarError::RequiredAfterOptional(arg.name.clone()));
        }
        if arg.required && arg.default.is_some() {
            return Err(GrammarError::RequiredArgumentWithDefault(arg.name.clone()));
        }
        if arg.value.is_none() {
            return Err(GrammarError::ArgumentWithoutValue(arg.name.clone()));
        }
        seen_optional |= !arg.required;
        previous_was_remainder = arg.consumes_remainder();
    }
    Ok(())
}

/// Builder for a positional argument.
pub struct ArgClause<'a> {
    decl: &'a mut ArgDecl,
}

impl<'a> ArgClause<'a> {
    pub(crate) fn new(decl: &'a mut ArgDecl) -> Self {
        Self { decl }
    }

    /// Must be given. No optional argument may precede a required one.
    pub fn required(self) -> Self {
        self.decl.required = true;
        self
    }

    pub fn default(self, value: impl Into<String>) -> Self {
        self.decl.default = Some(value.into());
        self
    }

    /// Called during dispatch once per matched value.
    pub fn action<F>(self, action: F) -> Self
    where
        F: FnMut(&ParseContext) -> Result<Flow, String> + 'static,
    {
        self.decl.action = Some(Box::new(action));
        self
    }

    pub fn value<V: Value + 'static>(self, value: V) {
        self.decl.value = Some(Box::new(value));
    }

    value_constructors!();
}
