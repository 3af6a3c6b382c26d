use crate::context::{Action, Flow, ParseContext};
use crate::env::Environment;
use crate::error::GrammarError;
use crate::value::{CounterValue, Slot, Value, value_constructors};

/// Flags the engine injects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Help,
    Version,
}

pub(crate) struct FlagDecl {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) short: Option<char>,
    pub(crate) default: Option<String>,
    pub(crate) envar: Option<String>,
    /// Value of `envar` captured when the grammar was initialized.
    pub(crate) env_default: Option<String>,
    pub(crate) placeholder: Option<String>,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    pub(crate) value: Option<Box<dyn Value>>,
    pub(crate) action: Option<Action>,
    pub(crate) builtin: Option<Builtin>,
}

impl FlagDecl {
    pub(crate) fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            short: None,
            default: None,
            envar: None,
            env_default: None,
            placeholder: None,
            required: false,
            hidden: false,
            value: None,
            action: None,
            builtin: None,
        }
    }

    pub(crate) fn builtin(kind: Builtin) -> Self {
        let mut decl = match kind {
            Builtin::Help => Self::new("help", "Show context-sensitive help."),
            Builtin::Version => Self::new("version", "Show application version."),
        };
        decl.value = Some(Box::new(crate::value::BoolValue(Slot::default())));
        decl.builtin = Some(kind);
        decl
    }

    pub(crate) fn is_bool(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_bool())
    }

    /// The environment wins over the literal default.
    pub(crate) fn effective_default(&self) -> Option<&str> {
        self.env_default.as_deref().or(self.default.as_deref())
    }

    /// Required unless the environment already supplied a value.
    pub(crate) fn needs_value(&self) -> bool {
        self.required && self.env_default.is_none()
    }

    pub(crate) fn init<E: Environment + ?Sized>(&mut self, env: &E) -> Result<(), GrammarError> {
        if self.required && self.default.is_some() {
            return Err(GrammarError::RequiredFlagWithDefault(self.name.clone()));
        }
        if self.value.is_none() {
            return Err(GrammarError::FlagWithoutValue(self.name.clone()));
        }
        self.env_default = self
            .envar
            .as_deref()
            .and_then(|key| env.var(key))
            .filter(|v| !v.is_empty());
        Ok(())
    }
}

/// Builder for a flag declaration. Finish with a typed method such as
/// [`FlagClause::string`] to obtain the handle the parsed value lands in.
pub struct FlagClause<'a> {
    decl: &'a mut FlagDecl,
}

impl<'a> FlagClause<'a> {
    pub(crate) fn new(decl: &'a mut FlagDecl) -> Self {
        Self { decl }
    }

    pub fn short(self, short: char) -> Self {
        self.decl.short = Some(short);
        self
    }

    /// Used when the flag is absent. Must parse with the flag's type.
    pub fn default(self, value: impl Into<String>) -> Self {
        self.decl.default = Some(value.into());
        self
    }

    /// Environment variable whose value, if set and non-empty when the grammar
    /// is initialized, overrides the default.
    pub fn envar(self, name: impl Into<String>) -> Self {
        self.decl.envar = Some(name.into());
        self
    }

    pub fn placeholder(self, placeholder: impl Into<String>) -> Self {
        self.decl.placeholder = Some(placeholder.into());
        self
    }

    /// Hide from usage; the flag is still accepted.
    pub fn hidden(self) -> Self {
        self.decl.hidden = true;
        self
    }

    /// Must be given on the command line. Cannot be combined with a default.
    pub fn required(self) -> Self {
        self.decl.required = true;
        self
    }

    /// Called during dispatch each time the flag was matched.
    pub fn action<F>(self, action: F) -> Self
    where
        F: FnMut(&ParseContext) -> Result<Flow, String> + 'static,
    {
        self.decl.action = Some(Box::new(action));
        self
    }

    /// Install a custom sink.
    pub fn value<V: Value + 'static>(self, value: V) {
        self.decl.value = Some(Box::new(value));
    }

    /// Boolean that counts occurrences, so `-vvv` yields 3.
    pub fn counter(self) -> Slot<u64> {
        let slot = Slot::default();
        self.value(CounterValue(slot.clone()));
        slot
    }

    value_constructors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn required_with_default_is_rejected() {
        let mut decl = FlagDecl::new("name", "");
        FlagClause::new(&mut decl).required().default("x").string();
        let err = decl.init(env(&[]).as_slice()).unwrap_err();
        assert_eq!(err, GrammarError::RequiredFlagWithDefault("name".to_string()));
        assert!(err.to_string().contains("'--name'"));
    }

    #[test]
    fn flag_without_type_is_rejected() {
        let mut decl = FlagDecl::new("name", "");
        FlagClause::new(&mut decl).short('n');
        assert_eq!(
            decl.init(env(&[]).as_slice()).unwrap_err(),
            GrammarError::FlagWithoutValue("name".to_string())
        );
    }

    #[test]
    fn envar_is_captured_at_init_and_beats_default() {
        let mut decl = FlagDecl::new("format", "");
        FlagClause::new(&mut decl)
            .default("plain")
            .envar("FORMAT")
            .string();
        decl.init(env(&[("FORMAT", "json")]).as_slice()).unwrap();
        assert_eq!(decl.effective_default(), Some("json"));

        decl.init(env(&[("FORMAT", "")]).as_slice()).unwrap();
        assert_eq!(decl.effective_default(), Some("plain"));
    }

    #[test]
    fn envar_satisfies_required_flag() {
        let mut decl = FlagDecl::new("token", "");
        FlagClause::new(&mut decl).required().envar("TOKEN").string();
        decl.init(env(&[]).as_slice()).unwrap();
        assert!(decl.needs_value());
        decl.init(env(&[("TOKEN", "s3cret")]).as_slice()).unwrap();
        assert!(!decl.needs_value());
    }

    #[test]
    fn boolean_ness_follows_the_sink() {
        let mut flag = FlagDecl::new("debug", "");
        FlagClause::new(&mut flag).bool();
        assert!(flag.is_bool());

        let mut counter = FlagDecl::new("verbose", "");
        FlagClause::new(&mut counter).counter();
        assert!(counter.is_bool());

        let mut text = FlagDecl::new("name", "");
        FlagClause::new(&mut text).string();
        assert!(!text.is_bool());
    }
}
