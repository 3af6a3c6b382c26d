//! Turns a matched element list into assigned values and dispatched actions.
//!
//! Stages run in a fixed order: reset, defaults, values, validators, dispatch.
//! The first failure stops the pipeline; values already assigned stay put.

use crate::app::{Application, ParseOutcome};
use crate::command::Scope;
use crate::context::{Element, Flow, ParseContext};
use crate::error::{ParseError, ParseResult};
use crate::value::Value;

pub(crate) fn execute(app: &mut Application, context: &ParseContext) -> ParseResult<ParseOutcome> {
    reset(app);
    apply_defaults(app, context)?;
    assign_values(app, context)?;
    run_validators(app, context)?;

    if let Flow::Exit(code) = dispatch(app, context)? {
        tracing::debug!(code, "action requested exit");
        return Ok(ParseOutcome::Exit(code));
    }

    if let Some(id) = context.selected_command() {
        if !app.node(id).scope.commands.is_empty() {
            return Err(ParseError::SubcommandRequired(app.full_command(id)));
        }
    }

    let path = context.selected_path();
    tracing::debug!(command = %path, "parse complete");
    Ok(ParseOutcome::Command(path))
}

/// Zero every sink in the grammar, so a second parse never sees values from
/// the first.
fn reset(app: &mut Application) {
    reset_scope(&mut app.root);
    for node in &mut app.commands {
        reset_scope(&mut node.scope);
    }
}

fn reset_scope(scope: &mut Scope) {
    let flags = scope.flags.iter_mut().map(|f| &mut f.value);
    let args = scope.args.iter_mut().map(|a| &mut a.value);
    for sink in flags.chain(args).flatten() {
        sink.reset();
    }
}

fn apply_defaults(app: &mut Application, context: &ParseContext) -> ParseResult<()> {
    for flag in context.visible_flags() {
        let matched = context
            .elements()
            .iter()
            .any(|e| matches!(e, Element::Flag { flag: f, .. } if *f == flag));
        let decl = app.flag_decl_mut(flag);
        if matched || decl.builtin.is_some() {
            continue;
        }
        if decl.needs_value() {
            return Err(ParseError::RequiredFlag(decl.name.clone()));
        }
        if let Some(default) = decl.effective_default().map(str::to_string) {
            tracing::trace!(flag = %decl.name, %default, "applying default");
            set(&mut decl.value, &default, || format!("flag --{}", decl.name))?;
        }
    }

    for &arg in context.visible_args() {
        let matched = context
            .elements()
            .iter()
            .any(|e| matches!(e, Element::Arg { arg: a, .. } if *a == arg));
        if matched {
            continue;
        }
        let decl = app.arg_decl_mut(arg);
        if decl.required {
            return Err(ParseError::RequiredArgument(decl.name.clone()));
        }
        if let Some(default) = decl.default.clone() {
            tracing::trace!(arg = %decl.name, %default, "applying default");
            set(&mut decl.value, &default, || format!("argument '{}'", decl.name))?;
        }
    }
    Ok(())
}

fn assign_values(app: &mut Application, context: &ParseContext) -> ParseResult<()> {
    for element in context.elements() {
        match element {
            Element::Flag { flag, name, value } => {
                let decl = app.flag_decl_mut(*flag);
                set(&mut decl.value, value, || format!("flag --{name}"))?;
            }
            Element::Arg { arg, name, value } => {
                let decl = app.arg_decl_mut(*arg);
                set(&mut decl.value, value, || format!("argument '{name}'"))?;
            }
            Element::Command { .. } => {}
        }
    }
    Ok(())
}

fn set(
    sink: &mut Option<Box<dyn Value>>,
    raw: &str,
    target: impl FnOnce() -> String,
) -> ParseResult<()> {
    let Some(sink) = sink.as_mut() else {
        return Ok(());
    };
    sink.set(raw).map_err(|message| ParseError::InvalidValue {
        target: target(),
        message,
    })
}

fn run_validators(app: &mut Application, context: &ParseContext) -> ParseResult<()> {
    for element in context.elements() {
        if let Element::Command { command, .. } = element {
            if let Some(validator) = app.node_mut(*command).validator.as_mut() {
                validator(context).map_err(ParseError::Validation)?;
            }
        }
    }
    if let Some(validator) = app.validator.as_mut() {
        validator(context).map_err(ParseError::Validation)?;
    }
    Ok(())
}

fn dispatch(app: &mut Application, context: &ParseContext) -> ParseResult<Flow> {
    if let Some(action) = app.action.as_mut() {
        if let Flow::Exit(code) = action(context).map_err(ParseError::Action)? {
            return Ok(Flow::Exit(code));
        }
    }

    for element in context.elements() {
        let action = match element {
            Element::Flag { flag, .. } => app.flag_decl_mut(*flag).action.as_mut(),
            Element::Arg { arg, .. } => app.arg_decl_mut(*arg).action.as_mut(),
            Element::Command { command, .. } => app.node_mut(*command).action.as_mut(),
        };
        if let Some(action) = action {
            if let Flow::Exit(code) = action(context).map_err(ParseError::Action)? {
                return Ok(Flow::Exit(code));
            }
        }
    }
    Ok(Flow::Continue)
}
