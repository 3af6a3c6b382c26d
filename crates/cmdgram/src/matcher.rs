//! Recursive-descent matching of a token stream against the grammar.
//!
//! Each scope absorbs flags, then hands positionals either to exactly one
//! child command (recursing into it) or to its own argument list, then absorbs
//! trailing flags. Nothing here touches a sink; the output is the ordered
//! element list on the [`ParseContext`].

use crate::app::Application;
use crate::command::{CommandId, Scope};
use crate::context::{ArgRef, Element, FlagRef, ParseContext, ScopeId};
use crate::error::{ParseError, ParseResult};
use crate::token::{Token, TokenKind};

pub(crate) struct Matcher<'g, 'c> {
    app: &'g Application,
    context: &'c mut ParseContext,
}

impl<'g, 'c> Matcher<'g, 'c> {
    pub(crate) fn new(app: &'g Application, context: &'c mut ParseContext) -> Self {
        Self { app, context }
    }

    pub(crate) fn run(mut self) -> ParseResult<()> {
        self.scope(ScopeId::Root)
    }

    fn scope(&mut self, id: ScopeId) -> ParseResult<()> {
        let app = self.app;
        let scope = app.scope(id);

        self.context.merge_flags(id, scope.flag_names());
        if !scope.args.is_empty() {
            self.context.merge_args(id, scope.args.len());
        }

        self.flags()?;
        if self.context.peek().kind() == TokenKind::Positional {
            if !scope.commands.is_empty() {
                self.command(scope)?;
            } else if !scope.args.is_empty() {
                self.args(id, scope)?;
            }
        }
        self.flags()
    }

    fn flags(&mut self) -> ParseResult<()> {
        while self.context.peek().is_flag() {
            self.flag()?;
        }
        Ok(())
    }

    fn flag(&mut self) -> ParseResult<()> {
        let token = self.context.tokens_mut().advance();
        let (flag, invert) = self.resolve(&token)?;
        let decl = self.app.flag_decl(flag);

        let value = if decl.is_bool() {
            if token.kind() == TokenKind::Long && token.inline().is_some() {
                return Err(ParseError::UnexpectedValue(token.to_string()));
            }
            if invert { "false" } else { "true" }.to_string()
        } else if let Some(inline) = token.inline() {
            if token.kind() == TokenKind::Short {
                self.context.tokens_mut().skip_continuations();
            }
            inline.to_string()
        } else {
            let next = self.context.peek();
            if next.kind() != TokenKind::Positional {
                return Err(ParseError::MissingValue(token.to_string()));
            }
            self.context.tokens_mut().advance().value().to_string()
        };

        tracing::trace!(flag = %decl.name, %value, "matched flag");
        self.context.push(Element::Flag {
            flag,
            name: decl.name.clone(),
            value,
        });
        Ok(())
    }

    /// Exact long names win; `--no-x` only falls back to inverting a boolean
    /// `x` when no flag is literally named `no-x`.
    fn resolve(&self, token: &Token) -> ParseResult<(FlagRef, bool)> {
        match token.kind() {
            TokenKind::Long => {
                if let Some(flag) = self.context.lookup_long(token.value()) {
                    return Ok((flag, false));
                }
                if let Some(stripped) = token.value().strip_prefix("no-") {
                    if let Some(flag) = self.context.lookup_long(stripped) {
                        if !self.app.flag_decl(flag).is_bool() {
                            return Err(ParseError::InvalidInversion(token.to_string()));
                        }
                        if token.inline().is_some() {
                            return Err(ParseError::UnexpectedValue(token.to_string()));
                        }
                        return Ok((flag, true));
                    }
                }
                Err(ParseError::UnknownLongFlag(token.to_string()))
            }
            _ => token
                .value()
                .chars()
                .next()
                .and_then(|c| self.context.lookup_short(c))
                .map(|flag| (flag, false))
                .ok_or_else(|| ParseError::UnknownShortFlag(token.to_string())),
        }
    }

    fn command(&mut self, scope: &'g Scope) -> ParseResult<()> {
        let token = self.context.tokens_mut().advance();
        let id = self
            .find_command(scope, token.value())
            .ok_or_else(|| ParseError::UnknownCommand(token.value().to_string()))?;

        let name = self.app.node(id).name.clone();
        tracing::debug!(command = %self.app.full_command(id), "selected command");
        self.context.push(Element::Command { command: id, name });
        self.scope(ScopeId::Command(id))
    }

    fn find_command(&self, scope: &Scope, name: &str) -> Option<CommandId> {
        scope
            .commands
            .iter()
            .copied()
            .find(|&c| self.app.node(c).name == name)
    }

    /// Fill the argument list in declaration order. A remainder argument
    /// keeps taking positionals until a flag or the end of the line; the
    /// caller absorbs those flags, and any positional after them is left over.
    fn args(&mut self, id: ScopeId, scope: &'g Scope) -> ParseResult<()> {
        let mut index = 0;
        while self.context.peek().kind() == TokenKind::Positional {
            let Some(decl) = scope.args.get(index) else {
                break;
            };
            let before = self.context.tokens_mut().position();
            let token = self.context.tokens_mut().advance();
            tracing::trace!(arg = %decl.name, value = %token.value(), "matched argument");
            self.context.push(Element::Arg {
                arg: ArgRef { scope: id, index },
                name: decl.name.clone(),
                value: token.value().to_string(),
            });
            if !decl.consumes_remainder() {
                index += 1;
            }
            if self.context.tokens_mut().position() == before {
                return Err(ParseError::UnexpectedToken(format!(
                    "'{}'",
                    self.context.peek()
                )));
            }
        }
        Ok(())
    }
}
