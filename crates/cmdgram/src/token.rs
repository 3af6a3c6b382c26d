//! Lexical classification of the raw argument vector.
//!
//! Tokenization knows nothing about the grammar: `--x` is a long flag whether
//! or not anything named `x` is declared. Resolving names happens in the
//! matcher.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Long,
    Short,
    Positional,
    Eol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    value: String,
    inline: Option<String>,
    continuation: bool,
}

impl Token {
    fn long(name: &str, inline: Option<&str>) -> Self {
        Self {
            kind: TokenKind::Long,
            value: name.to_string(),
            inline: inline.map(|s| s.to_string()),
            continuation: false,
        }
    }

    fn short(name: char, rest: &str, continuation: bool) -> Self {
        Self {
            kind: TokenKind::Short,
            value: name.to_string(),
            inline: (!rest.is_empty()).then(|| rest.to_string()),
            continuation,
        }
    }

    fn positional(text: &str) -> Self {
        Self {
            kind: TokenKind::Positional,
            value: text.to_string(),
            inline: None,
            continuation: false,
        }
    }

    fn eol() -> Self {
        Self {
            kind: TokenKind::Eol,
            value: String::new(),
            inline: None,
            continuation: false,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Flag name without its dashes, or the positional text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// For `--name=value`, the `value`. For a short flag, the rest of its
    /// cluster after this letter (`bc` for the `a` of `-abc`).
    pub fn inline(&self) -> Option<&str> {
        self.inline.as_deref()
    }

    /// Whether this short flag came from the same `-abc` cluster as the
    /// previous token.
    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, TokenKind::Long | TokenKind::Short)
    }

    pub fn is_eol(&self) -> bool {
        self.kind == TokenKind::Eol
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Long => write!(f, "--{}", self.value),
            TokenKind::Short => write!(f, "-{}", self.value),
            TokenKind::Positional => f.write_str(&self.value),
            TokenKind::Eol => f.write_str("<EOL>"),
        }
    }
}

/// Replayable token sequence terminated by an end-of-line sentinel.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn peek(&self) -> &Token {
        // The sentinel is always last, so clamping never indexes past it.
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    /// Consume the current token. Past the end this keeps returning the
    /// end-of-line sentinel.
    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    /// Skip the rest of a short-flag cluster whose leader took the remainder
    /// as its value.
    pub(crate) fn skip_continuations(&mut self) {
        while self.peek().is_continuation() {
            self.advance();
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_eol(&self) -> bool {
        self.peek().is_eol()
    }
}

/// Classify `argv` (without the program name).
pub fn tokenize<S: AsRef<str>>(argv: &[S]) -> TokenStream {
    let mut tokens = Vec::with_capacity(argv.len() + 1);
    let mut after_separator = false;

    for arg in argv {
        let arg = arg.as_ref();
        if after_separator {
            tokens.push(Token::positional(arg));
            continue;
        }
        if arg == "--" {
            after_separator = true;
            continue;
        }
        if let Some(long) = arg.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) => tokens.push(Token::long(name, Some(value))),
                None => tokens.push(Token::long(long, None)),
            }
            continue;
        }
        if let Some(cluster) = arg.strip_prefix('-').filter(|s| !s.is_empty()) {
            for (i, (offset, c)) in cluster.char_indices().enumerate() {
                let rest = &cluster[offset + c.len_utf8()..];
                tokens.push(Token::short(c, rest, i > 0));
            }
            continue;
        }
        tokens.push(Token::positional(arg));
    }

    tokens.push(Token::eol());
    TokenStream { tokens, cursor: 0 }
}
