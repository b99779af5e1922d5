//! Streaming tokenizer for `.proto` schema sources.
//!
//! The reader splits a source file into a lazy, single-pass sequence of
//! tokens: words, one-character delimiters, and string literals. Line and
//! block comments are stripped. The tokenizer itself never rejects input;
//! anything surprising is left for the parser to diagnose with the token's
//! line and column.

use std::fs;
use std::path::Path;
use std::str::Chars;

use crate::error::Result;

const WHITESPACE: &str = " \t\r\n";
const DELIMITERS: &str = "{}[]=;\"";

/// A single token together with the 1-based position of its first character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: u32,
    pub column: u32,
}

/// Owns the text of one schema source and hands out token iterators over it.
pub struct TokenReader {
    file_name: String,
    source: String,
}

impl TokenReader {
    /// Opens a schema file, reading it fully into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<TokenReader> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        Ok(TokenReader {
            file_name: path.to_string_lossy().into_owned(),
            source,
        })
    }

    /// Creates a reader over in-memory schema text.
    pub fn from_source(source: impl Into<String>, file_name: impl Into<String>) -> TokenReader {
        TokenReader {
            file_name: file_name.into(),
            source: source.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns an iterator rewound to the beginning of the source and
    /// positioned on the first token.
    pub fn iter(&self) -> TokenIter<'_> {
        let mut iter = TokenIter {
            chars: self.source.chars(),
            line: 1,
            column: 1,
            pending: None,
            string_mode: false,
            end: false,
            token: String::new(),
            token_line: 1,
            token_column: 1,
        };
        iter.advance();
        iter
    }
}

/// A restartable, single-pass iterator over the tokens of one source.
///
/// Two iterators compare equal exactly when both are at the end; no other
/// comparison is meaningful.
pub struct TokenIter<'a> {
    chars: Chars<'a>,
    line: u32,
    column: u32,
    /// A delimiter that ended the previous token, waiting to be emitted.
    pending: Option<(char, u32, u32)>,
    string_mode: bool,
    end: bool,
    token: String,
    token_line: u32,
    token_column: u32,
}

impl<'a> TokenIter<'a> {
    /// The current token's text; empty once the iterator is at the end.
    pub fn current(&self) -> &str {
        &self.token
    }

    pub fn at_end(&self) -> bool {
        self.end
    }

    /// 1-based line of the current token's first character.
    pub fn line(&self) -> u32 {
        self.token_line
    }

    /// 1-based column of the current token's first character.
    pub fn column(&self) -> u32 {
        self.token_column
    }

    fn next_char(&mut self) -> Option<(char, u32, u32)> {
        let c = self.chars.next()?;
        let (line, column) = (self.line, self.column);
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some((c, line, column))
    }

    /// Moves to the next token; past the end this is a no-op.
    pub fn advance(&mut self) {
        if self.end {
            return;
        }

        // A delimiter found while gathering the previous token was already
        // consumed from the stream; emit it now.
        if let Some((delim, line, column)) = self.pending.take() {
            self.token.clear();
            self.token.push(delim);
            self.token_line = line;
            self.token_column = column;
            return;
        }

        let mut text = String::new();
        let mut start: Option<(u32, u32)> = None;
        let mut pending_slash: Option<(u32, u32)> = None;
        let mut previous_star = false;
        let mut previous_escape = false;
        let mut ignore_to_end_of_line = false;
        let mut ignore_to_end_of_comment = false;
        let mut returning_string = false;

        fn push(text: &mut String, start: &mut Option<(u32, u32)>, c: char, pos: (u32, u32)) {
            if start.is_none() {
                *start = Some(pos);
            }
            text.push(c);
        }

        while let Some((c, cl, cc)) = self.next_char() {
            if self.string_mode {
                // An opening quote ended the previous token, so this token
                // gathers string content until an unescaped quote or the
                // end of the line. Strings do not span lines; a newline
                // ends the string with whatever was gathered so far.
                if start.is_none() {
                    start = Some((cl, cc));
                }
                if c == '\n' {
                    self.string_mode = false;
                    returning_string = true;
                    break;
                }
                if c == '\\' {
                    if previous_escape {
                        text.push_str("\\\\");
                        previous_escape = false;
                    } else {
                        previous_escape = true;
                    }
                    continue;
                }
                if c != '"' || previous_escape {
                    if previous_escape {
                        text.push('\\');
                        previous_escape = false;
                    }
                    text.push(c);
                    continue;
                }
                // The ending quote closes the string even when it arrives
                // immediately after the opening quote; an empty string is
                // still a token.
                self.string_mode = false;
                self.pending = Some(('"', cl, cc));
                returning_string = true;
                break;
            }

            if ignore_to_end_of_comment {
                if c == '/' && previous_star {
                    previous_star = false;
                    ignore_to_end_of_comment = false;
                } else {
                    previous_star = c == '*';
                }
                continue;
            }

            if ignore_to_end_of_line {
                if c == '\n' {
                    ignore_to_end_of_line = false;
                    if !text.is_empty() {
                        // Treat the end of the line like whitespace when
                        // text was already gathered before the comment.
                        break;
                    }
                }
                continue;
            }

            if DELIMITERS.contains(c) {
                if c == '"' {
                    // The next token is read in string mode.
                    self.string_mode = true;
                }
                if let Some(pos) = pending_slash.take() {
                    push(&mut text, &mut start, '/', pos);
                }
                self.pending = Some((c, cl, cc));
                break;
            }

            if WHITESPACE.contains(c) {
                if let Some(pos) = pending_slash.take() {
                    // A single forward slash followed by whitespace stays
                    // part of the word.
                    push(&mut text, &mut start, '/', pos);
                }
                if !text.is_empty() {
                    break;
                }
                continue;
            }

            if c == '/' {
                if pending_slash.take().is_some() {
                    ignore_to_end_of_line = true;
                    continue;
                }
                pending_slash = Some((cl, cc));
                continue;
            }

            if c == '*' && pending_slash.is_some() {
                pending_slash = None;
                ignore_to_end_of_comment = true;
                continue;
            }

            if let Some(pos) = pending_slash.take() {
                push(&mut text, &mut start, '/', pos);
            }
            push(&mut text, &mut start, c, (cl, cc));
        }

        if previous_escape {
            // A lone escape at the end of a line or of the input keeps its
            // backslash.
            text.push('\\');
        }
        if let Some(pos) = pending_slash {
            // A slash pending at end of input still belongs to the word.
            push(&mut text, &mut start, '/', pos);
        }

        if returning_string || !text.is_empty() {
            let (line, column) = start.unwrap_or((self.line, self.column));
            self.token = text;
            self.token_line = line;
            self.token_column = column;
        } else if let Some((delim, line, column)) = self.pending.take() {
            self.token.clear();
            self.token.push(delim);
            self.token_line = line;
            self.token_column = column;
        } else {
            self.token.clear();
            self.end = true;
        }
    }
}

impl<'a> PartialEq for TokenIter<'a> {
    fn eq(&self, other: &TokenIter<'a>) -> bool {
        self.end && other.end
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.end {
            return None;
        }
        let token = Token {
            text: self.token.clone(),
            line: self.token_line,
            column: self.token_column,
        };
        self.advance();
        Some(token)
    }
}
