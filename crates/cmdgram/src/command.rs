use crate::app::Application;
use crate::arg::{ArgClause, ArgDecl};
use crate::context::{Action, Flow, ParseContext, ScopeId, Validator};
use crate::flag::{FlagClause, FlagDecl};

/// Stable index of a command in the application's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

/// Flags plus either positional arguments or child commands.
#[derive(Default)]
pub(crate) struct Scope {
    pub(crate) flags: Vec<FlagDecl>,
    pub(crate) args: Vec<ArgDecl>,
    pub(crate) commands: Vec<CommandId>,
}

impl Scope {
    pub(crate) fn add_flag(&mut self, name: &str, help: &str) -> &mut FlagDecl {
        self.flags.push(FlagDecl::new(name, help));
        let last = self.flags.len() - 1;
        &mut self.flags[last]
    }

    pub(crate) fn add_arg(&mut self, name: &str, help: &str) -> &mut ArgDecl {
        self.args.push(ArgDecl::new(name, help));
        let last = self.args.len() - 1;
        &mut self.args[last]
    }

    pub(crate) fn flag_names(&self) -> impl Iterator<Item = (&str, Option<char>)> {
        self.flags.iter().map(|f| (f.name.as_str(), f.short))
    }
}

pub(crate) struct CommandNode {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) hidden: bool,
    pub(crate) parent: Option<CommandId>,
    pub(crate) scope: Scope,
    pub(crate) action: Option<Action>,
    pub(crate) validator: Option<Validator>,
}

impl CommandNode {
    pub(crate) fn new(name: &str, help: &str, parent: Option<CommandId>) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            hidden: false,
            parent,
            scope: Scope::default(),
            action: None,
            validator: None,
        }
    }
}

/// Builder for a command. Borrows the application, so finish configuring one
/// command before starting the next sibling.
pub struct CommandClause<'a> {
    app: &'a mut Application,
    id: CommandId,
}

impl<'a> CommandClause<'a> {
    pub(crate) fn new(app: &'a mut Application, id: CommandId) -> Self {
        Self { app, id }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Space-separated names from the top-level command down to this one.
    pub fn full_command(&self) -> String {
        self.app.full_command(self.id)
    }

    pub fn flag(&mut self, name: &str, help: &str) -> FlagClause<'_> {
        let decl = self.app.scope_mut(ScopeId::Command(self.id)).add_flag(name, help);
        FlagClause::new(decl)
    }

    pub fn arg(&mut self, name: &str, help: &str) -> ArgClause<'_> {
        let decl = self.app.scope_mut(ScopeId::Command(self.id)).add_arg(name, help);
        ArgClause::new(decl)
    }

    /// Add a child command.
    pub fn command(&mut self, name: &str, help: &str) -> CommandClause<'_> {
        let id = self.app.add_command(Some(self.id), name, help);
        CommandClause::new(self.app, id)
    }

    /// Hide from usage listings; the command can still be selected.
    pub fn hidden(self) -> Self {
        self.app.node_mut(self.id).hidden = true;
        self
    }

    /// Called during dispatch when this command was selected.
    pub fn action<F>(self, action: F) -> Self
    where
        F: FnMut(&ParseContext) -> Result<Flow, String> + 'static,
    {
        self.app.node_mut(self.id).action = Some(Box::new(action));
        self
    }

    /// Run after all values are assigned, before any action.
    pub fn validate<F>(self, validator: F) -> Self
    where
        F: FnMut(&ParseContext) -> Result<(), String> + 'static,
    {
        self.app.node_mut(self.id).validator = Some(Box::new(validator));
        self
    }
}
