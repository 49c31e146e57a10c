//! A textual macro preprocessor.
//!
//! One left-to-right pass over a source text collects `#macro` definitions
//! and replaces every later use of a defined name with its recursively
//! expanded replacement tokens. Everything else passes through unchanged,
//! whitespace and line breaks included.
//!
//! Two definition forms exist. A value macro expands to the same tokens at
//! every use:
//!
//! ```text
//! #macro GREETING hello
//! ```
//!
//! A parameterized macro takes a parenthesized, comma-separated argument
//! list at each use and substitutes the arguments into its replacement
//! body by parameter name:
//!
//! ```
//! let output = mprep::expand_str("#macro ADD(a, b) a+b\nADD(ADD(1,2), 3)").unwrap();
//! assert_eq!(output, "1+2+3");
//! ```
//!
//! The first failure aborts the pass; the returned [`Error`] renders the
//! offending source line with a caret under the failure site.

pub mod error;
pub mod lexer;
pub mod processor;
pub mod table;
pub mod token;

pub use error::{Error, ErrorKind};
pub use lexer::{Lexer, Mark};
pub use processor::{DEFAULT_MAX_DEPTH, PreprocessReader, Preprocessor};
pub use table::{Macro, MacroKind, MacroTable};
pub use token::{Token, TokenKind};

/// Preprocess `source` with a fresh, empty macro table.
pub fn expand_str(source: &str) -> Result<String, Error> {
    Preprocessor::new().process(source)
}
