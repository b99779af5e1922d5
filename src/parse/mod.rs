//! Pluggable recursive-descent parsing of `.proto` sources.
//!
//! Parsing is driven by a registry of sub-parsers keyed by grammatical
//! context. At each position the driver offers the current token to the
//! context's sub-parsers in registration order; the first one that
//! recognises the construct consumes it and mutates the shared
//! [`ProtoModel`]. A sub-parser that does not recognise the first token
//! reports [`ParseOutcome::NotApplicable`] without consuming anything so
//! the next candidate can try.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::model::ProtoModel;
use crate::token_reader::{TokenIter, TokenReader};

mod enums;
mod field;
mod import;
mod message;
mod oneof;
mod package;

pub use enums::{EnumParser, EnumValueParser};
pub use field::{FieldOptionParser, MessageFieldParser};
pub use import::ImportParser;
pub use message::{MessageParser, OptionParser};
pub use oneof::{OneofFieldParser, OneofParser};
pub use package::PackageParser;

/// Grammatical-context keys under which sub-parsers are registered.
pub mod context {
    pub const TOP: &str = "top";
    pub const MESSAGE: &str = "message";
    pub const ENUM: &str = "enum";
    pub const ONEOF: &str = "oneof";
    pub const MESSAGE_FIELD: &str = "messageField";
    pub const ONEOF_FIELD: &str = "oneofField";
}

/// The two ways a sub-parser can return without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The construct was consumed; the cursor rests on its last token and
    /// the caller advances once more.
    Accepted,
    /// The first token was not recognised; the cursor is unchanged and
    /// another candidate may try.
    NotApplicable,
}

/// A plug-in parsing unit for a single grammatical construct.
///
/// Once a sub-parser has recognised its first token it is committed: any
/// later mismatch is an `InvalidProto` error, never `NotApplicable`.
pub trait SubParser: Send + Sync {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome>;
}

/// Ordered lists of sub-parsers keyed by grammatical context.
///
/// The process-wide instance is created lazily on first use and never
/// mutated afterwards; tests can build a fresh registry per scenario with
/// [`ParserRegistry::with_default_parsers`].
#[derive(Default)]
pub struct ParserRegistry {
    contexts: HashMap<&'static str, Vec<Box<dyn SubParser>>>,
}

static GLOBAL_REGISTRY: Lazy<ParserRegistry> = Lazy::new(ParserRegistry::with_default_parsers);

impl ParserRegistry {
    pub fn new() -> ParserRegistry {
        ParserRegistry::default()
    }

    /// Builds a registry populated from the standard registration table.
    pub fn with_default_parsers() -> ParserRegistry {
        let mut registry = ParserRegistry::new();
        registry.register(context::TOP, Box::new(PackageParser));
        registry.register(context::TOP, Box::new(ImportParser));
        registry.register(context::TOP, Box::new(EnumParser));
        registry.register(context::TOP, Box::new(MessageParser));
        registry.register(context::MESSAGE, Box::new(MessageParser));
        registry.register(context::MESSAGE, Box::new(EnumParser));
        registry.register(context::MESSAGE, Box::new(OneofParser));
        registry.register(context::MESSAGE, Box::new(OptionParser));
        registry.register(context::MESSAGE, Box::new(MessageFieldParser));
        registry.register(context::ENUM, Box::new(EnumValueParser));
        registry.register(context::ONEOF, Box::new(OneofFieldParser));
        registry.register(context::MESSAGE_FIELD, Box::new(FieldOptionParser));
        registry.register(context::ONEOF_FIELD, Box::new(FieldOptionParser));
        registry
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static ParserRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn register(&mut self, context: &'static str, parser: Box<dyn SubParser>) {
        self.contexts.entry(context).or_default().push(parser);
    }

    /// Offers the current token to the context's sub-parsers in
    /// registration order; the first to accept wins.
    pub(crate) fn dispatch(
        &self,
        context: &str,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if let Some(parsers) = self.contexts.get(context) {
            for parser in parsers {
                if let ParseOutcome::Accepted = parser.try_parse(self, tokens, model)? {
                    return Ok(ParseOutcome::Accepted);
                }
            }
        }
        Ok(ParseOutcome::NotApplicable)
    }
}

/// Parses one `.proto` file into a [`ProtoModel`].
pub struct ProtoParser {
    reader: TokenReader,
}

impl ProtoParser {
    pub fn open(path: impl AsRef<Path>) -> Result<ProtoParser> {
        Ok(ProtoParser {
            reader: TokenReader::open(path)?,
        })
    }

    pub fn from_source(source: impl Into<String>, file_name: impl Into<String>) -> ProtoParser {
        ProtoParser {
            reader: TokenReader::from_source(source, file_name),
        }
    }

    /// Parses the file using the process-wide registry.
    pub fn parse(&self) -> Result<ProtoModel> {
        self.parse_with(ParserRegistry::global())
    }

    /// Parses the file using a caller-supplied registry.
    pub fn parse_with(&self, registry: &ParserRegistry) -> Result<ProtoModel> {
        debug!("parsing {}", self.reader.file_name());
        let mut model = ProtoModel::new(self.reader.file_name());
        let mut tokens = self.reader.iter();

        while !tokens.at_end() {
            match registry.dispatch(context::TOP, &mut tokens, &mut model) {
                Ok(ParseOutcome::Accepted) => {}
                Ok(ParseOutcome::NotApplicable) => {
                    return Err(err_at(
                        &tokens,
                        format!("Unrecognized content '{}'.", tokens.current()),
                    )
                    .with_file(self.reader.file_name()));
                }
                Err(err) => return Err(err.with_file(self.reader.file_name())),
            }
            tokens.advance();
        }

        if model.has_open_messages() {
            return Err(
                err_at(&tokens, "Expected } character before end of file.")
                    .with_file(self.reader.file_name()),
            );
        }

        model
            .assign_field_categories()
            .map_err(|err| err.with_file(self.reader.file_name()))?;
        Ok(model)
    }
}

/// Creates an `InvalidProto` error at the cursor's position; the driver
/// attaches the file name.
pub(crate) fn err_at(tokens: &TokenIter, message: impl Into<String>) -> Error {
    Error::invalid_proto(tokens.line(), tokens.column(), message)
}

/// Advances to the next token and returns it as a word, failing with
/// `Expected <what>.` at end of input or on an empty token.
pub(crate) fn advance_to_word(tokens: &mut TokenIter, what: &str) -> Result<String> {
    tokens.advance();
    if tokens.at_end() || tokens.current().is_empty() {
        return Err(err_at(tokens, format!("Expected {}.", what)));
    }
    Ok(tokens.current().to_string())
}

/// Advances to the next token and requires it to be the given delimiter.
pub(crate) fn advance_to_delimiter(tokens: &mut TokenIter, delimiter: &str) -> Result<()> {
    tokens.advance();
    if tokens.at_end() || tokens.current() != delimiter {
        return Err(err_at(tokens, format!("Expected {} character.", delimiter)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_an_empty_model() {
        let model = ProtoParser::from_source("   \n\t\n", "Empty.proto")
            .parse()
            .unwrap();
        assert!(model.current_package().is_empty());
        assert!(model.imports().is_empty());
        assert!(model.enums().is_empty());
        assert_eq!(0, model.messages().count());
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        let err = ProtoParser::from_source("message a {", "Open.proto")
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("Expected } character"));

        let err = ProtoParser::from_source("}", "Close.proto")
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("Unrecognized content"));
    }

    #[test]
    fn errors_carry_file_and_position() {
        let err = ProtoParser::from_source("message a {\n  required int32 b\n}", "Pos.proto")
            .parse()
            .unwrap_err();
        match err {
            Error::InvalidProto { file, line, .. } => {
                assert_eq!("Pos.proto", file);
                assert_eq!(3, line);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn fresh_registries_parse_independently() {
        let registry = ParserRegistry::with_default_parsers();
        let model = ProtoParser::from_source("enum e { a = 0; }", "Fresh.proto")
            .parse_with(&registry)
            .unwrap();
        assert_eq!(1, model.enums().len());
    }
}
