//! Plain-text usage rendering over [`ApplicationModel`].

use crate::error::{ParseError, ParseResult};
use crate::model::{
    ApplicationModel, ArgModel, CommandModel, FlagModel, arg_summary, flag_summary, flatten_visible,
};

/// Render usage for the root (`command == ""`) or a space-separated command
/// path. Flags shown are everything visible at that depth; hidden flags and
/// commands are left out.
pub fn render(model: &ApplicationModel, command: &str) -> ParseResult<String> {
    let chain = model
        .resolve(command)
        .ok_or_else(|| ParseError::UnknownCommand(command.to_string()))?;

    let mut out = String::new();
    let (help, args, children, own_flags): (&str, &[ArgModel], &[CommandModel], &[FlagModel]) =
        match chain.last() {
            Some(cmd) => {
                out.push_str(&format!("usage: {} {}", model.name, cmd.full_command));
                (
                    cmd.help.as_str(),
                    cmd.args.as_slice(),
                    cmd.commands.as_slice(),
                    cmd.flags.as_slice(),
                )
            }
            None => {
                out.push_str(&format!("usage: {}", model.name));
                (
                    model.help.as_str(),
                    model.args.as_slice(),
                    model.commands.as_slice(),
                    model.flags.as_slice(),
                )
            }
        };
    out.push_str(&synopsis(own_flags, args));
    if !children.is_empty() {
        out.push_str(" <command> [<args> ...]");
    }
    out.push('\n');

    if !help.trim().is_empty() {
        out.push('\n');
        out.push_str(help.trim_end());
        out.push('\n');
    }

    let visible_flags: Vec<&FlagModel> = model
        .flags
        .iter()
        .chain(chain.iter().flat_map(|c| c.flags.iter()))
        .filter(|f| !f.hidden)
        .collect();
    if !visible_flags.is_empty() {
        out.push_str("\nFlags:\n");
        let rows = visible_flags
            .iter()
            .map(|f| (f.format_flag(), flag_help(f)))
            .collect::<Vec<_>>();
        push_rows(&mut out, &rows);
    }

    if !args.is_empty() {
        out.push_str("\nArgs:\n");
        let rows = args
            .iter()
            .map(|a| (a.format_arg(), arg_help(a)))
            .collect::<Vec<_>>();
        push_rows(&mut out, &rows);
    }

    let commands = flatten_visible(children);
    if !commands.is_empty() {
        out.push_str("\nCommands:\n");
        for cmd in commands {
            out.push_str(&format!(
                "  {}{}\n",
                cmd.full_command,
                synopsis(&cmd.flags, &cmd.args)
            ));
            if !cmd.help.trim().is_empty() {
                for line in cmd.help.trim_end().lines() {
                    out.push_str(&format!("    {line}\n"));
                }
            }
            out.push('\n');
        }
    }

    Ok(out)
}

fn synopsis(flags: &[FlagModel], args: &[ArgModel]) -> String {
    let mut out = String::new();
    let flags = flag_summary(flags);
    if !flags.is_empty() {
        out.push(' ');
        out.push_str(&flags);
    }
    if !args.is_empty() {
        out.push(' ');
        out.push_str(&arg_summary(args));
    }
    out
}

fn flag_help(flag: &FlagModel) -> String {
    let mut out = flag.help.trim().to_string();
    if let Some(envar) = &flag.envar {
        push_note(&mut out, &format!("(${envar})"));
    }
    if flag.required {
        push_note(&mut out, "(required)");
    }
    out
}

fn arg_help(arg: &ArgModel) -> String {
    let mut out = arg.help.trim().to_string();
    if let Some(default) = &arg.default {
        push_note(&mut out, &format!("[default: {default}]"));
    }
    out
}

fn push_note(out: &mut String, note: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(note);
}

fn push_rows(out: &mut String, rows: &[(String, String)]) {
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}
