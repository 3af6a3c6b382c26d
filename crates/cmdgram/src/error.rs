use thiserror::Error;

/// A misconfigured grammar, detected once before any argv is looked at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("duplicate long flag --{0}")]
    DuplicateLongFlag(String),

    #[error("duplicate short flag -{0}")]
    DuplicateShortFlag(char),

    #[error("duplicate command '{0}'")]
    DuplicateCommand(String),

    #[error("duplicate argument '{0}'")]
    DuplicateArgument(String),

    #[error("required flag '--{0}' with default value that will never be used")]
    RequiredFlagWithDefault(String),

    #[error("required argument '{0}' with unusable default value")]
    RequiredArgumentWithDefault(String),

    #[error("required argument '{0}' found after non-required arguments")]
    RequiredAfterOptional(String),

    #[error("remainder argument can't be followed by another argument '{0}'")]
    ArgumentAfterRemainder(String),

    #[error("can't mix arguments with commands in '{0}'")]
    MixedArgumentsAndCommands(String),

    #[error("no type defined for --{0} (eg. .string())")]
    FlagWithoutValue(String),

    #[error("no type defined for argument '{0}'")]
    ArgumentWithoutValue(String),
}

/// A failed parse. Every variant naming a flag, argument or command carries
/// the text exactly as the user typed it, or the declared name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("unknown long flag '{0}'")]
    UnknownLongFlag(String),

    #[error("unknown short flag '{0}'")]
    UnknownShortFlag(String),

    #[error("expected argument for flag '{0}'")]
    MissingValue(String),

    #[error("flag '{0}' does not take a value")]
    UnexpectedValue(String),

    #[error("cannot negate non-boolean flag '{0}'")]
    InvalidInversion(String),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("no such command '{0}'")]
    UnknownCommand(String),

    #[error("required flag --{0} not provided")]
    RequiredFlag(String),

    #[error("required argument '{0}' not provided")]
    RequiredArgument(String),

    #[error("must select a subcommand of '{0}'")]
    SubcommandRequired(String),

    #[error("invalid value for {target}: {message}")]
    InvalidValue { target: String, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Action(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_text() {
        assert_eq!(
            ParseError::UnknownLongFlag("--nope".to_string()).to_string(),
            "unknown long flag '--nope'"
        );
        assert_eq!(
            ParseError::RequiredFlag("x".to_string()).to_string(),
            "required flag --x not provided"
        );
        let err: ParseError = GrammarError::DuplicateLongFlag("debug".to_string()).into();
        assert_eq!(err.to_string(), "duplicate long flag --debug");
    }
}
