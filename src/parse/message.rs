//! Sub-parsers for `message` declarations and ignored `option` lines.

use log::debug;

use crate::error::Result;
use crate::model::{MessageModel, ProtoModel};
use crate::token_reader::TokenIter;

use super::{
    advance_to_delimiter, advance_to_word, context, err_at, ParseOutcome, ParserRegistry, SubParser,
};

/// Parses `message <Name> { <body> }`. The body may contain nested
/// messages, enums, oneofs, fields, and `option` lines; each is handled by
/// the sub-parsers registered under the `message` context.
pub struct MessageParser;

impl SubParser for MessageParser {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "message" {
            return Ok(ParseOutcome::NotApplicable);
        }

        let name = advance_to_word(tokens, "message name")?;
        debug!("message: {}", name);
        let package = model.current_package().to_string();
        model.add_message(MessageModel::new(name, package));
        advance_to_delimiter(tokens, "{")?;

        loop {
            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected } character."));
            }
            if tokens.current() == "}" {
                model
                    .complete_message()
                    .map_err(|message| err_at(tokens, message))?;
                return Ok(ParseOutcome::Accepted);
            }
            match registry.dispatch(context::MESSAGE, tokens, model)? {
                ParseOutcome::Accepted => {}
                ParseOutcome::NotApplicable => {
                    return Err(err_at(
                        tokens,
                        format!("Unexpected message content '{}' found.", tokens.current()),
                    ));
                }
            }
        }
    }
}

/// Accepts `option … ;` lines inside message bodies and discards them.
pub struct OptionParser;

impl SubParser for OptionParser {
    fn try_parse(
        &self,
        _registry: &ParserRegistry,
        tokens: &mut TokenIter,
        _model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "option" {
            return Ok(ParseOutcome::NotApplicable);
        }

        loop {
            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected ; character."));
            }
            if tokens.current() == ";" {
                return Ok(ParseOutcome::Accepted);
            }
        }
    }
}
