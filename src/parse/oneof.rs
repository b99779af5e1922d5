//! Sub-parsers for `oneof` groups and their fields.

use log::debug;

use crate::error::Result;
use crate::model::{MessageFieldModel, OneofModel, ProtoModel, Requiredness};
use crate::token_reader::TokenIter;

use super::field::{finish_field, parse_field_index};
use super::{
    advance_to_delimiter, advance_to_word, context, err_at, ParseOutcome, ParserRegistry, SubParser,
};

/// Parses `oneof <Name> { <field>+ }`. Fields inside the group share the
/// enclosing message's index space and are attached through the model's
/// oneof cursor.
pub struct OneofParser;

impl SubParser for OneofParser {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "oneof" {
            return Ok(ParseOutcome::NotApplicable);
        }

        let name = advance_to_word(tokens, "oneof name")?;
        debug!("oneof: {}", name);
        let package = model.current_package().to_string();
        model
            .add_oneof(OneofModel::new(name, package))
            .map_err(|message| err_at(tokens, message))?;
        advance_to_delimiter(tokens, "{")?;

        loop {
            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected } character."));
            }
            if tokens.current() == "}" {
                model.complete_oneof();
                return Ok(ParseOutcome::Accepted);
            }
            match registry.dispatch(context::ONEOF, tokens, model)? {
                ParseOutcome::Accepted => {}
                ParseOutcome::NotApplicable => {
                    return Err(err_at(tokens, "Unexpected oneof content found."));
                }
            }
        }
    }
}

/// Parses one `<type> <name> = <index>` line inside a oneof body. The
/// requiredness is forced to optional; at most one member of the group is
/// ever present.
pub struct OneofFieldParser;

impl SubParser for OneofFieldParser {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() {
            return Ok(ParseOutcome::NotApplicable);
        }
        if tokens.current().is_empty() {
            return Err(err_at(tokens, "Expected field type."));
        }
        let field_type = tokens.current().to_string();

        let name = advance_to_word(tokens, "field name")?;
        advance_to_delimiter(tokens, "=")?;
        let index = parse_field_index(tokens)?;

        model
            .add_field(MessageFieldModel::new(
                Requiredness::Optional,
                field_type,
                name,
                index,
            ))
            .map_err(|message| err_at(tokens, message))?;

        finish_field(registry, tokens, model, context::ONEOF_FIELD)?;

        Ok(ParseOutcome::Accepted)
    }
}
