use anyhow::{Context, Result, bail};
use cmdgram::{Application, CommandClause, Slot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GRAMMAR_NAME: &str = "grammar.json";

/// A grammar described as data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarFile {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envar: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,

    #[serde(rename = "type", default)]
    pub kind: ValueKind,

    /// Allowed values for `enum`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: ValueKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Bool,
    Counter,
    Int,
    Uint,
    Float,
    Duration,
    Enum,
    Strings,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Handle onto one declared sink, kept so values can be read back after a
/// parse.
pub enum Sink {
    String(Slot<String>),
    Bool(Slot<bool>),
    Counter(Slot<u64>),
    Int(Slot<i64>),
    Uint(Slot<u64>),
    Float(Slot<f64>),
    Duration(Slot<Duration>),
    Strings(Slot<Vec<String>>),
}

impl Sink {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Sink::String(s) => s.get().into(),
            Sink::Bool(s) => s.get().into(),
            Sink::Counter(s) | Sink::Uint(s) => s.get().into(),
            Sink::Int(s) => s.get().into(),
            Sink::Float(s) => s.get().into(),
            Sink::Duration(s) => format!("{:?}", s.get()).into(),
            Sink::Strings(s) => s.get().into(),
        }
    }
}

/// A declared flag or argument and where it lives.
pub struct SinkEntry {
    /// Command path owning the declaration, `""` for the root.
    pub scope: String,
    /// `--name` for flags, `<name>` for arguments.
    pub key: String,
    pub sink: Sink,
}

pub struct BuiltGrammar {
    pub app: Application,
    pub sinks: Vec<SinkEntry>,
}

impl GrammarFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read grammar: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse grammar JSON: {}", path.display()))
    }

    /// Declare everything on a fresh application. Structural problems such
    /// as duplicate flags surface later, from `Application::init`.
    pub fn build(&self) -> Result<BuiltGrammar> {
        if self.name.trim().is_empty() {
            bail!("grammar has no name");
        }
        let mut app = Application::new(&self.name, &self.help);
        if let Some(version) = &self.version {
            app.version(version.as_str());
        }

        let mut sinks = Vec::new();
        for flag in &self.flags {
            let sink = declare_flag(app.flag(&flag.name, &flag.help), flag)?;
            sinks.push(SinkEntry {
                scope: String::new(),
                key: format!("--{}", flag.name),
                sink,
            });
        }
        for arg in &self.args {
            let sink = declare_arg(app.arg(&arg.name, &arg.help), arg)?;
            sinks.push(SinkEntry {
                scope: String::new(),
                key: format!("<{}>", arg.name),
                sink,
            });
        }
        for command in &self.commands {
            let clause = app.command(&command.name, &command.help);
            declare_command(clause, command, &mut sinks)?;
        }

        Ok(BuiltGrammar { app, sinks })
    }
}

fn declare_command(
    mut clause: CommandClause<'_>,
    spec: &CommandSpec,
    sinks: &mut Vec<SinkEntry>,
) -> Result<()> {
    let scope = clause.full_command();
    for flag in &spec.flags {
        let sink = declare_flag(clause.flag(&flag.name, &flag.help), flag)?;
        sinks.push(SinkEntry {
            scope: scope.clone(),
            key: format!("--{}", flag.name),
            sink,
        });
    }
    for arg in &spec.args {
        let sink = declare_arg(clause.arg(&arg.name, &arg.help), arg)?;
        sinks.push(SinkEntry {
            scope: scope.clone(),
            key: format!("<{}>", arg.name),
            sink,
        });
    }
    for child in &spec.commands {
        let child_clause = clause.command(&child.name, &child.help);
        declare_command(child_clause, child, sinks)?;
    }
    if spec.hidden {
        clause.hidden();
    }
    Ok(())
}

fn declare_flag(mut clause: cmdgram::FlagClause<'_>, spec: &FlagSpec) -> Result<Sink> {
    if let Some(c) = spec.short {
        clause = clause.short(c);
    }
    if spec.required {
        clause = clause.required();
    }
    if let Some(default) = &spec.default {
        clause = clause.default(default.as_str());
    }
    if let Some(envar) = &spec.envar {
        clause = clause.envar(envar.as_str());
    }
    if let Some(placeholder) = &spec.placeholder {
        clause = clause.placeholder(placeholder.as_str());
    }
    if spec.hidden {
        clause = clause.hidden();
    }

    Ok(match spec.kind {
        ValueKind::String => Sink::String(clause.string()),
        ValueKind::Bool => Sink::Bool(clause.bool()),
        ValueKind::Counter => Sink::Counter(clause.counter()),
        ValueKind::Int => Sink::Int(clause.int()),
        ValueKind::Uint => Sink::Uint(clause.uint()),
        ValueKind::Float => Sink::Float(clause.float()),
        ValueKind::Duration => Sink::Duration(clause.duration()),
        ValueKind::Enum => {
            if spec.options.is_empty() {
                bail!("enum flag --{} has no options", spec.name);
            }
            Sink::String(clause.enumeration(spec.options.iter().cloned()))
        }
        ValueKind::Strings => Sink::Strings(clause.strings()),
    })
}

fn declare_arg(mut clause: cmdgram::ArgClause<'_>, spec: &ArgSpec) -> Result<Sink> {
    if spec.required {
        clause = clause.required();
    }
    if let Some(default) = &spec.default {
        clause = clause.default(default.as_str());
    }

    Ok(match spec.kind {
        ValueKind::String => Sink::String(clause.string()),
        ValueKind::Bool => Sink::Bool(clause.bool()),
        ValueKind::Int => Sink::Int(clause.int()),
        ValueKind::Uint => Sink::Uint(clause.uint()),
        ValueKind::Float => Sink::Float(clause.float()),
        ValueKind::Duration => Sink::Duration(clause.duration()),
        ValueKind::Enum => {
            if spec.options.is_empty() {
                bail!("enum argument '{}' has no options", spec.name);
            }
            Sink::String(clause.enumeration(spec.options.iter().cloned()))
        }
        ValueKind::Strings => Sink::Strings(clause.strings()),
        ValueKind::Counter => bail!("argument '{}' cannot be a counter", spec.name),
    })
}

pub fn write_default_grammar(dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = dir.join(DEFAULT_GRAMMAR_NAME);
    if dest.exists() && !overwrite {
        bail!("{} already exists (use --force to overwrite)", dest.display());
    }

    let grammar = sample_grammar();
    let bytes = serde_json::to_vec_pretty(&grammar).context("failed to serialize grammar")?;
    let mut out = String::from_utf8(bytes).context("grammar is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

/// The chat client from the library docs, as data.
fn sample_grammar() -> GrammarFile {
    GrammarFile {
        name: "chat".to_string(),
        help: "A command-line chat application.".to_string(),
        version: Some("0.1.0".to_string()),
        flags: vec![
            FlagSpec {
                name: "debug".to_string(),
                help: "Enable debug mode.".to_string(),
                short: Some('d'),
                kind: ValueKind::Bool,
                ..Default::default()
            },
            FlagSpec {
                name: "server".to_string(),
                help: "Server address.".to_string(),
                short: Some('s'),
                default: Some("127.0.0.1".to_string()),
                envar: Some("CHAT_SERVER".to_string()),
                placeholder: Some("IP".to_string()),
                ..Default::default()
            },
        ],
        args: Vec::new(),
        commands: vec![
            CommandSpec {
                name: "register".to_string(),
                help: "Register a new user.".to_string(),
                args: vec![
                    ArgSpec {
                        name: "nick".to_string(),
                        help: "Nickname for user.".to_string(),
                        required: true,
                        ..Default::default()
                    },
                    ArgSpec {
                        name: "name".to_string(),
                        help: "Name of user.".to_string(),
                        required: true,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            CommandSpec {
                name: "post".to_string(),
                help: "Post a message to a channel.".to_string(),
                flags: vec![FlagSpec {
                    name: "image".to_string(),
                    help: "Image to post.".to_string(),
                    placeholder: Some("FILE".to_string()),
                    ..Default::default()
                }],
                args: vec![
                    ArgSpec {
                        name: "channel".to_string(),
                        help: "Channel to post to.".to_string(),
                        required: true,
                        ..Default::default()
                    },
                    ArgSpec {
                        name: "text".to_string(),
                        help: "Text to post.".to_string(),
                        kind: ValueKind::Strings,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdgram::ParseOutcome;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("cmdgram-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn grammar_deserializes_camel_case_with_defaults() {
        let json = r#"{
  "name": "tool",
  "flags": [
    { "name": "level", "type": "enum", "options": ["low", "high"], "envar": "LEVEL" },
    { "name": "quiet", "short": "q", "type": "bool" }
  ],
  "commands": [
    { "name": "run", "hidden": true, "args": [{ "name": "files", "type": "strings" }] }
  ]
}"#;
        let g: GrammarFile = serde_json::from_str(json).unwrap();
        assert_eq!(g.name, "tool");
        assert!(g.help.is_empty());
        assert_eq!(g.flags[0].kind, ValueKind::Enum);
        assert_eq!(g.flags[0].options, vec!["low", "high"]);
        assert_eq!(g.flags[0].envar.as_deref(), Some("LEVEL"));
        assert_eq!(g.flags[1].short, Some('q'));
        assert!(g.commands[0].hidden);
        assert_eq!(g.commands[0].args[0].kind, ValueKind::Strings);
        assert_eq!(g.commands[0].args[0].name, "files");
    }

    #[test]
    fn built_grammar_parses_and_exposes_sinks() {
        let mut built = sample_grammar().build().unwrap();
        let outcome = built
            .app
            .parse(&["-d", "post", "#general", "hello", "world"])
            .unwrap();
        assert_eq!(outcome, ParseOutcome::Command("post".to_string()));

        let value = |scope: &str, key: &str| {
            built
                .sinks
                .iter()
                .find(|e| e.scope == scope && e.key == key)
                .map(|e| e.sink.to_json())
                .unwrap()
        };
        assert_eq!(value("", "--debug"), serde_json::json!(true));
        assert_eq!(value("post", "<channel>"), serde_json::json!("#general"));
        assert_eq!(value("post", "<text>"), serde_json::json!(["hello", "world"]));
    }

    #[test]
    fn enum_without_options_is_rejected() {
        let grammar = GrammarFile {
            name: "tool".to_string(),
            flags: vec![FlagSpec {
                name: "mode".to_string(),
                kind: ValueKind::Enum,
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = grammar.build().err().unwrap();
        assert!(err.to_string().contains("--mode"), "{err}");
    }

    #[test]
    fn write_default_grammar_round_trips_and_refuses_overwrite() {
        let dir = make_temp_dir("grammar-defaults");
        let dest = write_default_grammar(&dir, false).unwrap();
        let g = GrammarFile::from_file(&dest).unwrap();
        assert_eq!(g.name, "chat");
        assert_eq!(g.commands.len(), 2);
        assert!(g.build().is_ok());

        assert!(write_default_grammar(&dir, false).is_err());
        assert!(write_default_grammar(&dir, true).is_ok());

        let _ = fs::remove_dir_all(&dir);
    }
}
