//! Definition parsing, argument collection, and recursive expansion.

use std::io::{self, Read};

use log::{debug, trace};

use crate::error::{Error, ErrorKind};
use crate::lexer::Lexer;
use crate::table::{Macro, MacroKind, MacroTable};
use crate::token::{ARGS_END, ARGS_SEPARATOR, ARGS_START, Token, TokenKind};

/// Expansion depth at which a self-referential macro is reported instead
/// of overflowing the stack.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// A preprocessing pass: owns the macro table and drives the lexer over a
/// source buffer, expanding as it goes.
///
/// The table persists across [`process`](Self::process) calls, so
/// definitions collected in one pass apply to later passes on the same
/// instance.
pub struct Preprocessor<'src> {
    table: MacroTable<'src>,
    max_depth: usize,
}

impl Default for Preprocessor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> Preprocessor<'src> {
    pub fn new() -> Self {
        Self::with_table(MacroTable::new())
    }

    /// Start from an already-populated table.
    pub fn with_table(table: MacroTable<'src>) -> Self {
        Self {
            table,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Cap the expansion recursion depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Definitions collected so far.
    pub fn table(&self) -> &MacroTable<'src> {
        &self.table
    }

    pub fn into_table(self) -> MacroTable<'src> {
        self.table
    }

    /// Run one left-to-right pass over `source`.
    ///
    /// Definition lines are consumed whole and produce no output; every
    /// recognized invocation is replaced by its expansion; everything else
    /// is copied through unchanged. The first failure aborts the pass.
    pub fn process(&mut self, source: &'src str) -> Result<String, Error> {
        let mut lexer = Lexer::new(source);
        let mut output = String::new();
        loop {
            let token = lexer.next_token();
            match token.kind {
                TokenKind::End => break,
                TokenKind::MacroKeyword => define_macro(&mut lexer, &mut self.table)?,
                TokenKind::Text => {
                    let mut expanded = Vec::new();
                    match self.table.find_by_name(&token) {
                        None => expanded.push(token),
                        Some(mac) if mac.kind == MacroKind::Value => {
                            expand(&self.table, &[token], &mut expanded, 0, self.max_depth)?;
                        }
                        Some(mac) => {
                            let mut invocation = vec![token];
                            collect_invocation(&mut lexer, &self.table, mac, &mut invocation)?;
                            expand(&self.table, &invocation, &mut expanded, 0, self.max_depth)?;
                        }
                    }
                    for expanded_token in &expanded {
                        output.push_str(expanded_token.text);
                    }
                }
                _ => output.push_str(token.text),
            }
        }
        debug!(
            "pass produced {} byte(s) with {} macro(s) defined",
            output.len(),
            self.table.len()
        );
        Ok(output)
    }
}

/// Consume one definition after its `#macro` keyword and insert it into
/// the table. The cursor is left past the end of the definition line.
fn define_macro<'src>(lexer: &mut Lexer<'src>, table: &mut MacroTable<'src>) -> Result<(), Error> {
    let name = lexer.next_token_skipping(TokenKind::Whitespace);
    if name.kind != TokenKind::Text {
        return Err(Error::at(lexer, ErrorKind::InvalidMacroName));
    }

    let mut kind = MacroKind::Value;
    let mut params = Vec::new();
    let mut first_body_token = None;

    let lookahead = lexer.next_token_skipping(TokenKind::Whitespace);
    if lookahead.is_symbol(ARGS_START) {
        kind = MacroKind::Parameterized;
        let mut param = lexer.next_token_skipping(TokenKind::Whitespace);
        loop {
            match param.kind {
                TokenKind::Text => params.push(param),
                TokenKind::End | TokenKind::Newline => {
                    return Err(Error::at(
                        lexer,
                        ErrorKind::UnterminatedParameterList(name.text.to_owned()),
                    ));
                }
                _ => {
                    return Err(Error::at(
                        lexer,
                        ErrorKind::InvalidArgumentName(name.text.to_owned()),
                    ));
                }
            }

            let separator = lexer.next_token_skipping(TokenKind::Whitespace);
            if separator.is_symbol(ARGS_END) {
                break;
            } else if separator.is_symbol(ARGS_SEPARATOR) {
                param = lexer.next_token_skipping(TokenKind::Whitespace);
            } else if matches!(separator.kind, TokenKind::End | TokenKind::Newline) {
                return Err(Error::at(
                    lexer,
                    ErrorKind::UnterminatedParameterList(name.text.to_owned()),
                ));
            } else {
                return Err(Error::at(
                    lexer,
                    ErrorKind::InvalidSymbolInParameterList(name.text.to_owned()),
                ));
            }
        }
    } else {
        // A value definition: the lookahead is the first replacement token.
        first_body_token = Some(lookahead);
    }

    let mut body = Vec::new();
    let mut token = match first_body_token {
        Some(token) => token,
        None => lexer.next_token_skipping(TokenKind::Whitespace),
    };
    while !matches!(token.kind, TokenKind::End | TokenKind::Newline) {
        body.push(token);
        token = lexer.next_token();
    }

    debug!(
        "defined macro \"{}\" with {} parameter(s) and {} replacement token(s)",
        name.text,
        params.len(),
        body.len()
    );
    table.define(Macro {
        kind,
        name,
        params,
        body,
    });
    Ok(())
}

/// Collect a parameterized invocation, `(` through the matching `)`, into
/// `out`, validating the argument count as it goes.
///
/// The name token is already in `out`. If the next raw token is not `(`
/// the cursor is restored and `false` is returned: the name is not an
/// activation and stays plain text. Nested parameterized invocations found
/// while scanning are collected recursively so their parentheses and
/// commas do not disturb the outer depth or separator count.
fn collect_invocation<'src>(
    lexer: &mut Lexer<'src>,
    table: &MacroTable<'src>,
    mac: &Macro<'src>,
    out: &mut Vec<Token<'src>>,
) -> Result<bool, Error> {
    let mark = lexer.mark();
    let open = lexer.next_token();
    if !open.is_symbol(ARGS_START) {
        lexer.restore(mark);
        return Ok(false);
    }
    out.push(open);

    let mut depth = 1usize;
    let mut separators = 0usize;
    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::End | TokenKind::Newline => {
                return Err(Error::at(
                    lexer,
                    ErrorKind::UnfinishedInvocation(mac.name.text.to_owned()),
                ));
            }
            TokenKind::Symbol if token.is_symbol(ARGS_START) => {
                depth += 1;
                out.push(token);
            }
            TokenKind::Symbol if token.is_symbol(ARGS_END) => {
                depth -= 1;
                if depth == 0 && separators + 1 < mac.params.len() {
                    return Err(Error::at(
                        lexer,
                        ErrorKind::TooFewArguments(mac.name.text.to_owned()),
                    ));
                }
                out.push(token);
                if depth == 0 {
                    break;
                }
            }
            TokenKind::Symbol if depth == 1 && token.is_symbol(ARGS_SEPARATOR) => {
                if separators + 1 >= mac.params.len() {
                    return Err(Error::at(
                        lexer,
                        ErrorKind::TooManyArguments(mac.name.text.to_owned()),
                    ));
                }
                separators += 1;
                out.push(token);
            }
            TokenKind::Text => {
                out.push(token);
                if let Some(nested) = table.find_by_name(&token) {
                    if nested.kind == MacroKind::Parameterized {
                        collect_invocation(lexer, table, nested, out)?;
                    }
                }
            }
            _ => out.push(token),
        }
    }
    Ok(true)
}

/// Substitute every macro use in `tokens`, appending the result to `out`.
///
/// Value-macro bodies are expanded recursively. Parameterized bodies only
/// have their parameter references replaced, each by the recursively
/// expanded argument segment at the parameter's declared ordinal; other
/// body tokens are copied unchanged.
fn expand<'src>(
    table: &MacroTable<'src>,
    tokens: &[Token<'src>],
    out: &mut Vec<Token<'src>>,
    depth: usize,
    max_depth: usize,
) -> Result<(), Error> {
    if depth > max_depth {
        return Err(Error::bare(ErrorKind::DepthLimitExceeded(max_depth)));
    }

    let mut index = 0;
    while index < tokens.len() {
        let token = tokens[index];
        let Some(mac) = table.find_by_name(&token) else {
            out.push(token);
            index += 1;
            continue;
        };

        match mac.kind {
            MacroKind::Value => {
                trace!("expanding value macro \"{}\"", token.text);
                expand(table, &mac.body, out, depth + 1, max_depth)?;
                index += 1;
            }
            MacroKind::Parameterized => {
                // An activation needs the `(` right behind the name.
                let activated = tokens
                    .get(index + 1)
                    .is_some_and(|next| next.is_symbol(ARGS_START));
                if !activated {
                    out.push(token);
                    index += 1;
                    continue;
                }

                let (segments, consumed) = split_arguments(&tokens[index + 2..]);
                trace!(
                    "expanding macro \"{}\" with {} argument(s)",
                    token.text,
                    segments.len()
                );
                for body_token in &mac.body {
                    match mac.parameter_index(body_token) {
                        Some(ordinal) => {
                            let segment = segments.get(ordinal).copied().unwrap_or(&[]);
                            expand(table, segment, out, depth + 1, max_depth)?;
                        }
                        None => out.push(*body_token),
                    }
                }
                index += 2 + consumed;
            }
        }
    }
    Ok(())
}

/// Split the call-site tokens following the opening `(` into one slice per
/// argument, plus the number of tokens consumed including the closing `)`.
///
/// Commas separate only at nesting depth one, so nested invocations and
/// plain parenthesized groups stay inside their segment. Leading
/// whitespace of a segment is not part of the argument. A slice with no
/// closing `)` (possible only inside replacement bodies, which the
/// collector never validated) contributes everything left as the final
/// segment.
fn split_arguments<'a, 'src>(tokens: &'a [Token<'src>]) -> (Vec<&'a [Token<'src>]>, usize) {
    let mut segments = Vec::new();
    let mut depth = 1usize;
    let mut start = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        if token.is_symbol(ARGS_START) {
            depth += 1;
        } else if token.is_symbol(ARGS_END) {
            depth -= 1;
            if depth == 0 {
                segments.push(trim_leading_whitespace(&tokens[start..index]));
                return (segments, index + 1);
            }
        } else if depth == 1 && token.is_symbol(ARGS_SEPARATOR) {
            segments.push(trim_leading_whitespace(&tokens[start..index]));
            start = index + 1;
        }
    }
    segments.push(trim_leading_whitespace(&tokens[start..]));
    (segments, tokens.len())
}

fn trim_leading_whitespace<'a, 'src>(segment: &'a [Token<'src>]) -> &'a [Token<'src>] {
    let skip = segment
        .iter()
        .take_while(|token| token.kind == TokenKind::Whitespace)
        .count();
    &segment[skip..]
}

/// Adapts any [`Read`] source so reads yield the preprocessed text.
///
/// The whole input is read and processed on the first read call;
/// preprocessing failures surface as [`io::ErrorKind::InvalidData`].
pub struct PreprocessReader<R: Read> {
    inner: R,
    buffer: Vec<u8>,
    buffer_pos: usize,
    done: bool,
}

impl<R: Read> PreprocessReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            buffer_pos: 0,
            done: false,
        }
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        if self.done {
            return Ok(());
        }

        let mut input = String::new();
        self.inner.read_to_string(&mut input)?;

        let mut preprocessor = Preprocessor::new();
        match preprocessor.process(&input) {
            Ok(output) => {
                self.buffer = output.into_bytes();
                self.buffer_pos = 0;
            }
            Err(error) => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, error));
            }
        }

        self.done = true;
        Ok(())
    }
}

impl<R: Read> Read for PreprocessReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer_pos >= self.buffer.len() && !self.done {
            self.fill_buffer()?;
        }

        if self.buffer_pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = self.buffer.len() - self.buffer_pos;
        let count = available.min(buf.len());
        buf[..count].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + count]);
        self.buffer_pos += count;
        Ok(count)
    }
}
