//! Sub-parsers for `enum` declarations and their values.

use log::debug;

use crate::error::Result;
use crate::model::{EnumModel, EnumValueModel, ProtoModel};
use crate::token_reader::TokenIter;

use super::{
    advance_to_delimiter, advance_to_word, context, err_at, ParseOutcome, ParserRegistry, SubParser,
};

/// Parses `enum <Name> { <value>+ }`. Registered at the top level and
/// inside message bodies; nesting is handled by the model's cursor stack.
pub struct EnumParser;

impl SubParser for EnumParser {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "enum" {
            return Ok(ParseOutcome::NotApplicable);
        }

        let name = advance_to_word(tokens, "enum name")?;
        debug!("enum: {}", name);
        let package = model.current_package().to_string();
        model.add_enum(EnumModel::new(name, package));
        advance_to_delimiter(tokens, "{")?;

        let mut value_count = 0;
        loop {
            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected } character."));
            }
            if tokens.current() == "}" {
                if value_count == 0 {
                    return Err(err_at(tokens, "Expected at least one enum value."));
                }
                model.complete_enum();
                return Ok(ParseOutcome::Accepted);
            }
            match registry.dispatch(context::ENUM, tokens, model)? {
                ParseOutcome::Accepted => value_count += 1,
                ParseOutcome::NotApplicable => {
                    return Err(err_at(tokens, "Unexpected enum content found."));
                }
            }
        }
    }
}

/// Parses one `<name> = <signedInt>;` value line inside an enum body.
pub struct EnumValueParser;

impl SubParser for EnumValueParser {
    fn try_parse(
        &self,
        _registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() {
            return Ok(ParseOutcome::NotApplicable);
        }
        if tokens.current().is_empty() {
            return Err(err_at(tokens, "Expected enum value name."));
        }
        let name = tokens.current().to_string();

        advance_to_delimiter(tokens, "=")?;
        let number = advance_to_word(tokens, "enum value number")?;
        let value: i32 = number
            .parse()
            .map_err(|_| err_at(tokens, "Expected enum value number."))?;
        advance_to_delimiter(tokens, ";")?;

        model
            .add_enum_value(EnumValueModel::new(name, value))
            .map_err(|message| err_at(tokens, message))?;

        Ok(ParseOutcome::Accepted)
    }
}
