use std::collections::HashSet;

use crate::arg::{ArgClause, ArgDecl, validate_args};
use crate::command::{CommandClause, CommandId, CommandNode, Scope};
use crate::context::{
    Action, ArgRef, Element, FlagRef, Flow, ParseContext, ScopeId, Validator,
};
use crate::env::{Environment, ProcessEnv};
use crate::error::{GrammarError, ParseError, ParseResult};
use crate::flag::{Builtin, FlagClause, FlagDecl};
use crate::matcher::Matcher;
use crate::model::ApplicationModel;
use crate::token::tokenize;

/// What a successful parse asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Everything ran. Carries the selection path (`""` when no command was
    /// selected).
    Command(String),
    /// `--help` was given; render usage for this selection path.
    Help { command: String },
    /// `--version` was given.
    Version(String),
    /// An action asked to terminate with this status.
    Exit(i32),
}

/// A command-line grammar: root flags, and either root arguments or a tree
/// of commands.
///
/// Sinks are shared `Rc` slots, so an application stays on one thread and
/// parses one argument vector at a time.
pub struct Application {
    name: String,
    help: String,
    version: Option<String>,
    pub(crate) root: Scope,
    pub(crate) commands: Vec<CommandNode>,
    pub(crate) action: Option<Action>,
    pub(crate) validator: Option<Validator>,
    initialized: bool,
}

impl Application {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            version: None,
            root: Scope::default(),
            commands: Vec::new(),
            action: None,
            validator: None,
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn version_string(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Add a `--version` flag reporting `version`.
    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = Some(version.into());
        self.initialized = false;
        self
    }

    /// Runs first during dispatch, before any flag, argument or command
    /// action.
    pub fn action<F>(&mut self, action: F) -> &mut Self
    where
        F: FnMut(&ParseContext) -> Result<Flow, String> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Runs after every selected command's validator.
    pub fn validate<F>(&mut self, validator: F) -> &mut Self
    where
        F: FnMut(&ParseContext) -> Result<(), String> + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn flag(&mut self, name: &str, help: &str) -> FlagClause<'_> {
        FlagClause::new(self.scope_mut(ScopeId::Root).add_flag(name, help))
    }

    pub fn arg(&mut self, name: &str, help: &str) -> ArgClause<'_> {
        ArgClause::new(self.scope_mut(ScopeId::Root).add_arg(name, help))
    }

    /// Add a top-level command.
    pub fn command(&mut self, name: &str, help: &str) -> CommandClause<'_> {
        let id = self.add_command(None, name, help);
        CommandClause::new(self, id)
    }

    /// Space-separated path of command names from the top down to `id`.
    pub fn full_command(&self, id: CommandId) -> String {
        let mut names = vec![self.node(id).name.as_str()];
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            names.push(self.node(p).name.as_str());
            parent = self.node(p).parent;
        }
        names.reverse();
        names.join(" ")
    }

    /// Validate the grammar, reading environment defaults from the process.
    pub fn init(&mut self) -> Result<(), GrammarError> {
        self.init_with_env(&ProcessEnv)
    }

    /// Validate the grammar and capture environment defaults from `env`.
    ///
    /// Parsing calls [`Application::init`] on its own if this has not run
    /// since the last declaration.
    pub fn init_with_env<E: Environment + ?Sized>(&mut self, env: &E) -> Result<(), GrammarError> {
        self.inject_builtins();

        if !self.root.args.is_empty() && !self.root.commands.is_empty() {
            return Err(GrammarError::MixedArgumentsAndCommands(self.name.clone()));
        }
        init_scope(&mut self.root, &self.commands, env)?;

        for index in 0..self.commands.len() {
            let id = CommandId(index);
            let full = self.full_command(id);
            let node = &mut self.commands[index];
            if !node.scope.args.is_empty() && !node.scope.commands.is_empty() {
                return Err(GrammarError::MixedArgumentsAndCommands(full));
            }
            // Sibling names are only reachable through the scope that owns
            // them, so checking each scope's children is enough.
            let mut scope = std::mem::take(&mut node.scope);
            let result = init_scope(&mut scope, &self.commands, env);
            self.commands[index].scope = scope;
            result?;
        }

        let mut names = HashSet::new();
        let mut shorts = HashSet::new();
        self.check_duplicate_flags(ScopeId::Root, &mut names, &mut shorts)?;

        tracing::debug!(
            app = %self.name,
            commands = self.commands.len(),
            "grammar initialized"
        );
        self.initialized = true;
        Ok(())
    }

    /// Tokenize and match `argv` without assigning any values.
    pub fn match_args<S: AsRef<str>>(&mut self, argv: &[S]) -> ParseResult<ParseContext> {
        if !self.initialized {
            self.init()?;
        }
        let mut context = ParseContext::new(tokenize(argv));
        Matcher::new(self, &mut context).run()?;
        Ok(context)
    }

    /// Parse `argv` (without the program name): match it, fill in defaults,
    /// assign values, run validators and dispatch actions.
    pub fn parse<S: AsRef<str>>(&mut self, argv: &[S]) -> ParseResult<ParseOutcome> {
        let context = self.match_args(argv)?;

        if let Some(builtin) = self.requested_builtin(&context) {
            return Ok(match builtin {
                Builtin::Help => ParseOutcome::Help {
                    command: context.selected_path(),
                },
                Builtin::Version => {
                    ParseOutcome::Version(self.version.clone().unwrap_or_default())
                }
            });
        }

        if !context.is_eol() {
            return Err(ParseError::UnexpectedArgument(context.peek().to_string()));
        }

        crate::pipeline::execute(self, &context)
    }

    /// Read-only snapshot of the grammar for renderers.
    pub fn model(&self) -> ApplicationModel {
        crate::model::build(self)
    }

    fn inject_builtins(&mut self) {
        self.root.flags.retain(|f| f.builtin.is_none());
        if !self.root.flags.iter().any(|f| f.name == "help") {
            self.root.flags.push(FlagDecl::builtin(Builtin::Help));
        }
        if self.version.is_some() && !self.root.flags.iter().any(|f| f.name == "version") {
            self.root.flags.push(FlagDecl::builtin(Builtin::Version));
        }
    }

    /// Help wins over version when both were given.
    fn requested_builtin(&self, context: &ParseContext) -> Option<Builtin> {
        let mut found = None;
        for element in context.elements() {
            if let Element::Flag { flag, .. } = element {
                match self.flag_decl(*flag).builtin {
                    Some(Builtin::Help) => return Some(Builtin::Help),
                    Some(Builtin::Version) => found = Some(Builtin::Version),
                    None => {}
                }
            }
        }
        found
    }

    /// Walk the command tree carrying every ancestor's flag names. Engine
    /// flags are neither checked nor recorded, so user flags may shadow them.
    fn check_duplicate_flags(
        &self,
        scope: ScopeId,
        names: &mut HashSet<String>,
        shorts: &mut HashSet<char>,
    ) -> Result<(), GrammarError> {
        let scope = self.scope(scope);
        let mut added_names = Vec::new();
        let mut added_shorts = Vec::new();

        for flag in scope.flags.iter().filter(|f| f.builtin.is_none()) {
            if let Some(c) = flag.short {
                if !shorts.insert(c) {
                    return Err(GrammarError::DuplicateShortFlag(c));
                }
                added_shorts.push(c);
            }
            if !names.insert(flag.name.clone()) {
                return Err(GrammarError::DuplicateLongFlag(flag.name.clone()));
            }
            added_names.push(flag.name.clone());
        }

        for &child in &scope.commands {
            self.check_duplicate_flags(ScopeId::Command(child), names, shorts)?;
        }

        for name in &added_names {
            names.remove(name);
        }
        for c in &added_shorts {
            shorts.remove(c);
        }
        Ok(())
    }

    pub(crate) fn add_command(
        &mut self,
        parent: Option<CommandId>,
        name: &str,
        help: &str,
    ) -> CommandId {
        let id = CommandId(self.commands.len());
        self.commands.push(CommandNode::new(name, help, parent));
        match parent {
            Some(p) => self.scope_mut(ScopeId::Command(p)).commands.push(id),
            None => self.scope_mut(ScopeId::Root).commands.push(id),
        }
        id
    }

    pub(crate) fn node(&self, id: CommandId) -> &CommandNode {
        &self.commands[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        &mut self.commands[id.0]
    }

    pub(crate) fn scope(&self, id: ScopeId) -> &Scope {
        match id {
            ScopeId::Root => &self.root,
            ScopeId::Command(c) => &self.node(c).scope,
        }
    }

    /// Mutable access for declaring things; invalidates earlier validation.
    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.initialized = false;
        match id {
            ScopeId::Root => &mut self.root,
            ScopeId::Command(c) => &mut self.commands[c.0].scope,
        }
    }

    pub(crate) fn flag_decl(&self, flag: FlagRef) -> &FlagDecl {
        &self.scope(flag.scope).flags[flag.index]
    }

    pub(crate) fn flag_decl_mut(&mut self, flag: FlagRef) -> &mut FlagDecl {
        match flag.scope {
            ScopeId::Root => &mut self.root.flags[flag.index],
            ScopeId::Command(c) => &mut self.commands[c.0].scope.flags[flag.index],
        }
    }

    pub(crate) fn arg_decl_mut(&mut self, arg: ArgRef) -> &mut ArgDecl {
        match arg.scope {
            ScopeId::Root => &mut self.root.args[arg.index],
            ScopeId::Command(c) => &mut self.commands[c.0].scope.args[arg.index],
        }
    }
}

fn init_scope<E: Environment + ?Sized>(
    scope: &mut Scope,
    commands: &[CommandNode],
    env: &E,
) -> Result<(), GrammarError> {
    for flag in &mut scope.flags {
        flag.init(env)?;
    }
    validate_args(&scope.args)?;

    let mut seen = HashSet::new();
    for &child in &scope.commands {
        let name = commands[child.0].name.as_str();
        if !seen.insert(name) {
            return Err(GrammarError::DuplicateCommand(name.to_string()));
        }
    }
    Ok(())
}
