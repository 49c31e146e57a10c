//! Failure kinds and caret diagnostics.
//!
//! Every failure inside a pass renders the offending source line with a
//! caret under the failure site, followed by a message naming the macro
//! involved.

use std::fmt;

use thiserror::Error;

use crate::lexer::Lexer;

/// What went wrong. Variants carry the name of the macro involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid macro name")]
    InvalidMacroName,
    #[error("invalid argument name for macro \"{0}\"")]
    InvalidArgumentName(String),
    #[error("invalid symbol in parameter list of macro \"{0}\"")]
    InvalidSymbolInParameterList(String),
    #[error("unterminated parameter list for macro \"{0}\"")]
    UnterminatedParameterList(String),
    #[error("too many arguments to macro \"{0}\"")]
    TooManyArguments(String),
    #[error("too few arguments to macro \"{0}\"")]
    TooFewArguments(String),
    #[error("unfinished invocation of macro \"{0}\"")]
    UnfinishedInvocation(String),
    #[error("macro expansion exceeded {0} levels")]
    DepthLimitExceeded(usize),
}

/// The source line a failure points into.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceContext {
    line: String,
    column: usize,
}

/// A failed pass: the failure kind plus, when the failure site is known,
/// the source line it happened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    context: Option<SourceContext>,
}

impl Error {
    /// A failure at the lexer's current position.
    pub(crate) fn at(lexer: &Lexer<'_>, kind: ErrorKind) -> Self {
        Self {
            kind,
            context: Some(SourceContext {
                line: lexer.current_line().to_owned(),
                column: lexer.column(),
            }),
        }
    }

    /// A failure with no cursor attached (the expansion depth guard).
    pub(crate) fn bare(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The source line the failure points into, if known.
    pub fn line(&self) -> Option<&str> {
        self.context.as_ref().map(|context| context.line.as_str())
    }

    /// Byte offset of the caret within [`line`](Self::line).
    pub fn column(&self) -> Option<usize> {
        self.context.as_ref().map(|context| context.column)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            writeln!(f, "{}", context.line)?;
            writeln!(f, "{:>width$}", "^", width = context.column.max(1))?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_line_caret_and_message() {
        let error = Error {
            kind: ErrorKind::TooManyArguments("ADD".to_owned()),
            context: Some(SourceContext {
                line: "ADD(1, 2, 3)".to_owned(),
                column: 9,
            }),
        };
        assert_eq!(
            error.to_string(),
            "ADD(1, 2, 3)\n        ^\ntoo many arguments to macro \"ADD\""
        );
    }

    #[test]
    fn caret_at_line_start_still_renders() {
        let error = Error {
            kind: ErrorKind::InvalidMacroName,
            context: Some(SourceContext {
                line: String::new(),
                column: 0,
            }),
        };
        assert_eq!(error.to_string(), "\n^\ninvalid macro name");
    }

    #[test]
    fn display_without_context_is_just_the_message() {
        let error = Error::bare(ErrorKind::DepthLimitExceeded(100));
        assert_eq!(error.to_string(), "macro expansion exceeded 100 levels");
    }
}
