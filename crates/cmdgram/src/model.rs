//! Serializable snapshot of a grammar, for renderers and tooling.

use serde::Serialize;

use crate::app::Application;
use crate::arg::ArgDecl;
use crate::command::{CommandId, Scope};
use crate::flag::{Builtin, FlagDecl};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationModel {
    pub name: String,
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub flags: Vec<FlagModel>,
    pub args: Vec<ArgModel>,
    pub commands: Vec<CommandModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandModel {
    pub name: String,
    /// Names from the top-level command down to this one.
    pub full_command: String,
    pub help: String,
    pub hidden: bool,
    pub flags: Vec<FlagModel>,
    pub args: Vec<ArgModel>,
    pub commands: Vec<CommandModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagModel {
    pub name: String,
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub required: bool,
    pub hidden: bool,
    pub is_bool: bool,
    /// Current sink contents, rendered.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgModel {
    pub name: String,
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    pub remainder: bool,
    pub value: String,
}

impl FlagModel {
    /// Text standing in for the value: the explicit placeholder, else the
    /// default, else the upper-cased name.
    pub fn format_placeholder(&self) -> String {
        if let Some(placeholder) = &self.placeholder {
            return placeholder.clone();
        }
        if let Some(default) = &self.default {
            return default.clone();
        }
        self.name.to_ascii_uppercase()
    }

    /// `-s, --server=SERVER`, or just `--debug` for booleans.
    pub fn format_flag(&self) -> String {
        let mut out = String::new();
        if let Some(c) = self.short {
            out.push_str(&format!("-{c}, "));
        }
        out.push_str(&format!("--{}", self.name));
        if !self.is_bool {
            out.push_str(&format!("={}", self.format_placeholder()));
        }
        out
    }
}

impl ArgModel {
    pub fn format_arg(&self) -> String {
        let mut out = format!("<{}>", self.name);
        if self.remainder {
            out.push_str("...");
        }
        if self.required {
            out
        } else {
            format!("[{out}]")
        }
    }
}

/// One-line flag synopsis: every required flag spelled out, then
/// `[<flags>]` if anything optional (other than help) remains.
pub fn flag_summary(flags: &[FlagModel]) -> String {
    let mut out = Vec::new();
    let mut count = 0;
    for flag in flags {
        if flag.name != "help" {
            count += 1;
        }
        if flag.required {
            if flag.is_bool {
                out.push(format!("--[no-]{}", flag.name));
            } else {
                out.push(format!("--{}={}", flag.name, flag.format_placeholder()));
            }
        }
    }
    if count != out.len() {
        out.push("[<flags>]".to_string());
    }
    out.join(" ")
}

/// `<a> [<b> [<c>]]`: optional arguments nest to the end.
pub fn arg_summary(args: &[ArgModel]) -> String {
    let mut depth = 0;
    let mut out = Vec::new();
    for arg in args {
        let mut h = format!("<{}>", arg.name);
        if arg.remainder {
            h.push_str("...");
        }
        if !arg.required {
            h.insert(0, '[');
            depth += 1;
        }
        out.push(h);
    }
    if let Some(last) = out.last_mut() {
        last.push_str(&"]".repeat(depth));
    }
    out.join(" ")
}

impl ApplicationModel {
    /// Resolve a space-separated selection path. `""` is the root and yields
    /// `None`, like an unknown path; use [`ApplicationModel::resolve`] to tell
    /// them apart.
    pub fn find_command(&self, path: &str) -> Option<&CommandModel> {
        let mut names = path.split_whitespace();
        let first = names.next()?;
        let mut current = self.commands.iter().find(|c| c.name == first)?;
        for name in names {
            current = current.commands.iter().find(|c| c.name == name)?;
        }
        Some(current)
    }

    /// Every command on `path`, top-down. `Some(vec![])` for the root,
    /// `None` if a name does not resolve.
    pub fn resolve(&self, path: &str) -> Option<Vec<&CommandModel>> {
        let mut chain = Vec::new();
        let mut children = &self.commands;
        for name in path.split_whitespace() {
            let next = children.iter().find(|c| c.name == name)?;
            chain.push(next);
            children = &next.commands;
        }
        Some(chain)
    }

    /// Leaf commands in declaration order, depth first.
    pub fn flattened_commands(&self) -> Vec<&CommandModel> {
        flatten(&self.commands)
    }
}

impl CommandModel {
    pub fn flattened_commands(&self) -> Vec<&CommandModel> {
        flatten(&self.commands)
    }
}

fn flatten(commands: &[CommandModel]) -> Vec<&CommandModel> {
    let mut out = Vec::new();
    for cmd in commands {
        if cmd.commands.is_empty() {
            out.push(cmd);
        }
        out.extend(flatten(&cmd.commands));
    }
    out
}

/// Like the flattened listing, but hidden commands and everything below them
/// are skipped.
pub(crate) fn flatten_visible(commands: &[CommandModel]) -> Vec<&CommandModel> {
    let mut out = Vec::new();
    for cmd in commands.iter().filter(|c| !c.hidden) {
        if cmd.commands.is_empty() {
            out.push(cmd);
        }
        out.extend(flatten_visible(&cmd.commands));
    }
    out
}

pub(crate) fn build(app: &Application) -> ApplicationModel {
    let mut flags: Vec<FlagModel> = app
        .root
        .flags
        .iter()
        .filter(|f| f.builtin.is_none())
        .map(flag_model)
        .collect();

    // Built-ins are only injected at init; mirror that here so the model
    // looks the same before and after.
    if !flags.iter().any(|f| f.name == "help") {
        flags.push(flag_model(&FlagDecl::builtin(Builtin::Help)));
    }
    if app.version_string().is_some() && !flags.iter().any(|f| f.name == "version") {
        flags.push(flag_model(&FlagDecl::builtin(Builtin::Version)));
    }

    ApplicationModel {
        name: app.name().to_string(),
        help: app.help().to_string(),
        version: app.version_string().map(str::to_string),
        flags,
        args: app.root.args.iter().map(arg_model).collect(),
        commands: commands_model(app, &app.root),
    }
}

fn commands_model(app: &Application, scope: &Scope) -> Vec<CommandModel> {
    scope
        .commands
        .iter()
        .map(|&id| command_model(app, id))
        .collect()
}

fn command_model(app: &Application, id: CommandId) -> CommandModel {
    let node = app.node(id);
    CommandModel {
        name: node.name.clone(),
        full_command: app.full_command(id),
        help: node.help.clone(),
        hidden: node.hidden,
        flags: node.scope.flags.iter().map(flag_model).collect(),
        args: node.scope.args.iter().map(arg_model).collect(),
        commands: commands_model(app, &node.scope),
    }
}

fn flag_model(decl: &FlagDecl) -> FlagModel {
    FlagModel {
        name: decl.name.clone(),
        help: decl.help.clone(),
        short: decl.short,
        default: decl.default.clone(),
        envar: decl.envar.clone(),
        placeholder: decl.placeholder.clone(),
        required: decl.required,
        hidden: decl.hidden,
        is_bool: decl.is_bool(),
        value: decl.value.as_ref().map(|v| v.render()).unwrap_or_default(),
    }
}

fn arg_model(decl: &ArgDecl) -> ArgModel {
    ArgModel {
        name: decl.name.clone(),
        help: decl.help.clone(),
        default: decl.default.clone(),
        required: decl.required,
        remainder: decl.consumes_remainder(),
        value: decl.value.as_ref().map(|v| v.render()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Application {
        let mut app = Application::new("git", "A VCS.");
        app.version("2.0");
        app.flag("verbose", "Chatty.").short('v').counter();
        let mut remote = app.command("remote", "Manage remotes.");
        let mut add = remote.command("add", "Add one.");
        add.flag("fetch", "").required().bool();
        add.arg("name", "").required().string();
        add.arg("url", "").string();
        app.command("gc", "").hidden();
        app
    }

    #[test]
    fn built_ins_appear_before_and_after_init() {
        let mut app = sample();
        let before = app.model();
        app.init().unwrap();
        let after = app.model();
        assert_eq!(before, after);
        let names: Vec<_> = after.flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["verbose", "help", "version"]);
    }

    #[test]
    fn commands_carry_full_paths_and_flatten_to_leaves() {
        let model = sample().model();
        let add = model.find_command("remote add").unwrap();
        assert_eq!(add.full_command, "remote add");
        assert!(model.find_command("remote nope").is_none());
        assert!(model.find_command("").is_none());
        assert_eq!(model.resolve("").unwrap().len(), 0);

        let leaves: Vec<_> = model
            .flattened_commands()
            .iter()
            .map(|c| c.full_command.as_str())
            .collect();
        assert_eq!(leaves, vec!["remote add", "gc"]);
    }

    #[test]
    fn summaries_follow_declarations() {
        let model = sample().model();
        let add = model.find_command("remote add").unwrap();
        assert_eq!(flag_summary(&add.flags), "--[no-]fetch");
        assert_eq!(arg_summary(&add.args), "<name> [<url>]");
        assert_eq!(flag_summary(&model.flags), "[<flags>]");
        assert_eq!(model.flags[0].format_flag(), "-v, --verbose");
    }

    #[test]
    fn placeholder_prefers_explicit_then_default_then_name() {
        let mut app = Application::new("app", "");
        app.flag("out", "").placeholder("FILE").string();
        app.flag("level", "").default("info").string();
        app.flag("host", "").string();
        let model = app.model();
        assert_eq!(model.flags[0].format_flag(), "--out=FILE");
        assert_eq!(model.flags[1].format_placeholder(), "info");
        assert_eq!(model.flags[2].format_placeholder(), "HOST");
    }

    #[test]
    fn serializes_camel_case() {
        let model = sample().model();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["commands"][0]["commands"][0]["fullCommand"], "remote add");
        assert_eq!(json["flags"][0]["isBool"], true);
        assert!(json["flags"][0].get("default").is_none());
    }
}
