//! Byte-cursor lexer.
//!
//! Produces one classified [`Token`] per call, tracking the current line
//! start so failures can be reported with a caret into the source.

use crate::token::{MACRO_PREFIX, Token, TokenKind};

/// Reserved keyword spellings recognized behind the `#` prefix.
const KEYWORDS: &[(&str, TokenKind)] = &[("macro", TokenKind::MacroKeyword)];

// Ranges read off an ASCII table: all printable punctuation.
fn is_symbol_byte(byte: u8) -> bool {
    matches!(byte, b'!'..=b'/' | b':'..=b'@' | b'['..=b'`' | b'{'..=b'~')
}

// Newline is intentionally not spacing; it terminates definitions.
fn is_space_byte(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | 0x0b | 0x0c)
}

/// A captured cursor position, for lookahead with backtracking.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    pos: usize,
    line_start: usize,
}

/// The lexer over a source buffer.
pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    line_start: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line_start: 0,
        }
    }

    /// Capture the cursor so a peeked token can be un-read with
    /// [`restore`](Self::restore).
    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line_start: self.line_start,
        }
    }

    /// Rewind the cursor to a captured position.
    pub fn restore(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line_start = mark.line_start;
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    /// Lex one token. End of input yields `End` without advancing.
    pub fn next_token(&mut self) -> Token<'src> {
        let Some(mut byte) = self.peek_byte() else {
            return Token::new(TokenKind::End, &self.source[self.pos..]);
        };

        // The prefix is consumed here and never reaches the output; the
        // token behind it is checked against the keyword table below.
        let mut keyword_prefixed = false;
        if byte == MACRO_PREFIX {
            keyword_prefixed = true;
            self.pos += 1;
            byte = match self.peek_byte() {
                Some(byte) => byte,
                None => return Token::new(TokenKind::End, &self.source[self.pos..]),
            };
        }

        let start = self.pos;
        let kind = if byte == b'\n' {
            self.pos += 1;
            self.line_start = self.pos;
            TokenKind::Newline
        } else if is_symbol_byte(byte) {
            self.pos += 1;
            TokenKind::Symbol
        } else if is_space_byte(byte) {
            self.pos += 1;
            TokenKind::Whitespace
        } else if byte.is_ascii_alphabetic() {
            self.take_word();
            TokenKind::Text
        } else if byte.is_ascii_digit() {
            self.take_word();
            TokenKind::Number
        } else {
            // One whole character, so the driver can pass it through.
            let len = self.source[self.pos..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.pos += len;
            TokenKind::None
        };

        let mut token = Token::new(kind, &self.source[start..self.pos]);
        if keyword_prefixed {
            for &(spelling, keyword_kind) in KEYWORDS {
                if token.text == spelling {
                    token.kind = keyword_kind;
                    break;
                }
            }
        }
        token
    }

    // Greedily extend a Text or Number token over letters and digits.
    fn take_word(&mut self) {
        while self.peek_byte().is_some_and(|byte| byte.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
    }

    /// Lex tokens, discarding those of kind `skip`, until `End` or the
    /// first token of a different kind.
    pub fn next_token_skipping(&mut self, skip: TokenKind) -> Token<'src> {
        loop {
            let token = self.next_token();
            if token.kind == TokenKind::End || token.kind != skip {
                return token;
            }
        }
    }

    /// Full text of the line containing the next unread byte.
    pub(crate) fn current_line(&self) -> &'src str {
        let rest = &self.source[self.line_start..];
        match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }

    /// Byte offset of the cursor within the current line.
    pub(crate) fn column(&self) -> usize {
        self.pos - self.line_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token();
            kinds.push(token.kind);
            if token.kind == TokenKind::End {
                return kinds;
            }
        }
    }

    #[test]
    fn empty_source_yields_end() {
        assert_eq!(kinds(""), vec![TokenKind::End]);
    }

    #[test]
    fn classifies_words_and_numbers() {
        let mut lexer = Lexer::new("abc a1b2 42 9lives");
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Text, "abc"));
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Text, "a1b2"));
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Number, "42"));
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Number, "9lives"));
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn whitespace_tokens_cover_one_character_each() {
        assert_eq!(
            kinds("a \tb"),
            vec![
                TokenKind::Text,
                TokenKind::Whitespace,
                TokenKind::Whitespace,
                TokenKind::Text,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn newline_is_not_whitespace() {
        assert_eq!(
            kinds(" \n "),
            vec![
                TokenKind::Whitespace,
                TokenKind::Newline,
                TokenKind::Whitespace,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn symbols_are_single_characters() {
        let mut lexer = Lexer::new("+*");
        assert!(lexer.next_token().is_symbol(b'+'));
        assert!(lexer.next_token().is_symbol(b'*'));
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn keyword_requires_the_prefix() {
        let mut lexer = Lexer::new("macro #macro");
        assert_eq!(lexer.next_token().kind, TokenKind::Text);
        lexer.next_token();
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::MacroKeyword, "macro"));
    }

    #[test]
    fn prefix_is_consumed_even_without_a_keyword() {
        let mut lexer = Lexer::new("#other");
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Text, "other"));
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn prefix_at_end_of_input_yields_end() {
        let mut lexer = Lexer::new("#");
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn doubled_prefix_lexes_a_symbol() {
        let mut lexer = Lexer::new("##");
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::Symbol, "#"));
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn unrecognized_characters_lex_one_at_a_time() {
        let mut lexer = Lexer::new("é\x01");
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::None, "é"));
        let token = lexer.next_token();
        assert_eq!((token.kind, token.text), (TokenKind::None, "\x01"));
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn mark_and_restore_backtrack() {
        let mut lexer = Lexer::new("name(");
        assert_eq!(lexer.next_token().text, "name");
        let mark = lexer.mark();
        assert!(lexer.next_token().is_symbol(b'('));
        lexer.restore(mark);
        assert!(lexer.next_token().is_symbol(b'('));
    }

    #[test]
    fn skipping_stops_at_the_first_other_kind() {
        let mut lexer = Lexer::new("   x");
        let token = lexer.next_token_skipping(TokenKind::Whitespace);
        assert_eq!((token.kind, token.text), (TokenKind::Text, "x"));
    }

    #[test]
    fn skipping_stops_at_end() {
        let mut lexer = Lexer::new("   ");
        let token = lexer.next_token_skipping(TokenKind::Whitespace);
        assert_eq!(token.kind, TokenKind::End);
    }

    #[test]
    fn line_tracking_follows_newlines() {
        let mut lexer = Lexer::new("one\ntwo three");
        while lexer.next_token().kind != TokenKind::Newline {}
        lexer.next_token();
        assert_eq!(lexer.current_line(), "two three");
        assert_eq!(lexer.column(), 3);
    }
}
