use std::collections::HashMap;

use indexmap::IndexMap;

use crate::command::CommandId;
use crate::token::{Token, TokenStream};

/// Where a declaration lives: the application root or a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Root,
    Command(CommandId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagRef {
    pub(crate) scope: ScopeId,
    pub(crate) index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgRef {
    pub(crate) scope: ScopeId,
    pub(crate) index: usize,
}

/// One matched piece of the command line, in consumption order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Flag {
        flag: FlagRef,
        name: String,
        value: String,
    },
    Arg {
        arg: ArgRef,
        name: String,
        value: String,
    },
    Command {
        command: CommandId,
        name: String,
    },
}

/// What an action asks the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop dispatching and hand `code` back to the host for termination.
    Exit(i32),
}

pub type Action = Box<dyn FnMut(&ParseContext) -> Result<Flow, String>>;
pub type Validator = Box<dyn FnMut(&ParseContext) -> Result<(), String>>;

/// Per-call accumulator: the token stream, what is visible at the current
/// depth of descent, and everything matched so far.
#[derive(Debug)]
pub struct ParseContext {
    tokens: TokenStream,
    flags: IndexMap<String, FlagRef>,
    shorts: HashMap<char, FlagRef>,
    args: Vec<ArgRef>,
    elements: Vec<Element>,
}

impl ParseContext {
    pub(crate) fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            flags: IndexMap::new(),
            shorts: HashMap::new(),
            args: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn peek(&self) -> &Token {
        self.tokens.peek()
    }

    pub fn is_eol(&self) -> bool {
        self.tokens.is_eol()
    }

    /// The deepest selected command, if any.
    pub fn selected_command(&self) -> Option<CommandId> {
        self.elements.iter().rev().find_map(|e| match e {
            Element::Command { command, .. } => Some(*command),
            _ => None,
        })
    }

    /// Selected command names joined by spaces, in descent order.
    pub fn selected_path(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Command { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether a flag with this long name was given on the command line.
    pub fn is_set(&self, flag: &str) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, Element::Flag { name, .. } if name == flag))
    }

    /// Literal values matched for a flag or argument, in order.
    pub fn values_of(&self, name: &str) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Flag { name: n, value, .. } | Element::Arg { name: n, value, .. }
                    if n == name =>
                {
                    Some(value.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn tokens_mut(&mut self) -> &mut TokenStream {
        &mut self.tokens
    }

    /// Make a scope's flags visible for the rest of the line. A later entry
    /// with the same long name (only possible for engine-injected flags)
    /// replaces the earlier one.
    pub(crate) fn merge_flags<'a>(
        &mut self,
        scope: ScopeId,
        flags: impl Iterator<Item = (&'a str, Option<char>)>,
    ) {
        for (index, (name, short)) in flags.enumerate() {
            let flag = FlagRef { scope, index };
            self.flags.insert(name.to_string(), flag);
            if let Some(c) = short {
                self.shorts.insert(c, flag);
            }
        }
    }

    pub(crate) fn merge_args(&mut self, scope: ScopeId, count: usize) {
        self.args = (0..count).map(|index| ArgRef { scope, index }).collect();
    }

    pub(crate) fn lookup_long(&self, name: &str) -> Option<FlagRef> {
        self.flags.get(name).copied()
    }

    pub(crate) fn lookup_short(&self, short: char) -> Option<FlagRef> {
        self.shorts.get(&short).copied()
    }

    pub(crate) fn visible_flags(&self) -> impl Iterator<Item = FlagRef> + '_ {
        self.flags.values().copied()
    }

    pub(crate) fn visible_args(&self) -> &[ArgRef] {
        &self.args
    }

    pub(crate) fn push(&mut self, element: Element) {
        self.elements.push(element);
    }
}
