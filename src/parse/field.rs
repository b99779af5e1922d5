//! Sub-parsers for message fields and inline field options.

use crate::error::Result;
use crate::model::{MessageFieldModel, ProtoModel, Requiredness};
use crate::token_reader::TokenIter;

use super::{
    advance_to_delimiter, advance_to_word, context, err_at, ParseOutcome, ParserRegistry, SubParser,
};

/// Parses `<requiredness> <type> <name> = <index>` followed by `;` or an
/// inline option list and `;`.
pub struct MessageFieldParser;

impl SubParser for MessageFieldParser {
    fn try_parse(
        &self,
        registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() {
            return Ok(ParseOutcome::NotApplicable);
        }
        let requiredness = match tokens.current() {
            "required" => Requiredness::Required,
            "optional" => Requiredness::Optional,
            "repeated" => Requiredness::Repeated,
            _ => return Ok(ParseOutcome::NotApplicable),
        };

        let field_type = advance_to_word(tokens, "field type")?;
        let name = advance_to_word(tokens, "field name")?;
        advance_to_delimiter(tokens, "=")?;
        let index = parse_field_index(tokens)?;

        model
            .add_field(MessageFieldModel::new(requiredness, field_type, name, index))
            .map_err(|message| err_at(tokens, message))?;

        finish_field(registry, tokens, model, context::MESSAGE_FIELD)?;

        Ok(ParseOutcome::Accepted)
    }
}

/// Reads the field index token and parses it as an unsigned decimal.
pub(crate) fn parse_field_index(tokens: &mut TokenIter) -> Result<u32> {
    let index = advance_to_word(tokens, "field index")?;
    index
        .parse()
        .map_err(|_| err_at(tokens, "Expected field index."))
}

/// Consumes the terminator of a field line: either `;` directly, or an
/// inline option list handled by the given context's parsers and then `;`.
/// Completes the model's current field on success.
pub(crate) fn finish_field(
    registry: &ParserRegistry,
    tokens: &mut TokenIter,
    model: &mut ProtoModel,
    option_context: &str,
) -> Result<()> {
    tokens.advance();
    if tokens.at_end() {
        return Err(err_at(tokens, "Expected ; or [ character."));
    }
    if tokens.current() != ";" {
        match registry.dispatch(option_context, tokens, model)? {
            ParseOutcome::Accepted => {}
            ParseOutcome::NotApplicable => {
                return Err(err_at(tokens, "Unexpected option content found."));
            }
        }
        advance_to_delimiter(tokens, ";")?;
    }
    model.complete_field();
    Ok(())
}

/// Parses an inline option list: `[ <key> = <value>, … ]`. The only
/// recognised key is `default`; its value is copied verbatim, with the
/// surrounding quotes stripped for string defaults.
pub struct FieldOptionParser;

impl SubParser for FieldOptionParser {
    fn try_parse(
        &self,
        _registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "[" {
            return Ok(ParseOutcome::NotApplicable);
        }

        loop {
            let key = advance_to_word(tokens, "option name")?;
            advance_to_delimiter(tokens, "=")?;

            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected option value."));
            }
            let value = if tokens.current() == "\"" {
                // A quoted value: take the string token and require the
                // closing quote.
                tokens.advance();
                if tokens.at_end() {
                    return Err(err_at(tokens, "Expected option value."));
                }
                let value = tokens.current().to_string();
                advance_to_delimiter(tokens, "\"")?;
                value
            } else {
                tokens.current().to_string()
            };

            match key.as_str() {
                "default" => model
                    .set_default_value(value)
                    .map_err(|message| err_at(tokens, message))?,
                _ => {
                    return Err(err_at(tokens, format!("Unrecognized option '{}'.", key)));
                }
            }

            tokens.advance();
            if tokens.at_end() {
                return Err(err_at(tokens, "Expected , or ] character."));
            }
            match tokens.current() {
                "]" => return Ok(ParseOutcome::Accepted),
                "," => {}
                _ => return Err(err_at(tokens, "Expected , or ] character.")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Requiredness;
    use crate::parse::ProtoParser;

    #[test]
    fn all_requiredness_forms_parse() {
        let source = "message m {\n  required string a = 1;\n  optional int32 b = 2;\n  repeated bool c = 3;\n}";
        let model = ProtoParser::from_source(source, "F.proto").parse().unwrap();
        let fields = model.messages().next().unwrap().fields().to_vec();
        assert_eq!(Requiredness::Required, fields[0].requiredness());
        assert_eq!(Requiredness::Optional, fields[1].requiredness());
        assert_eq!(Requiredness::Repeated, fields[2].requiredness());
        assert_eq!(3, fields[2].index());
    }

    #[test]
    fn numeric_default_is_recorded() {
        let source = "message m { optional int32 age = 2 [default = 0]; }";
        let model = ProtoParser::from_source(source, "F.proto").parse().unwrap();
        let field = &model.messages().next().unwrap().fields()[0];
        assert_eq!(Some("0"), field.default_value());
    }

    #[test]
    fn string_default_strips_quotes() {
        let source = "message m { optional string name = 1 [default = \"anon\"]; }";
        let model = ProtoParser::from_source(source, "F.proto").parse().unwrap();
        let field = &model.messages().next().unwrap().fields()[0];
        assert_eq!(Some("anon"), field.default_value());
    }

    #[test]
    fn unknown_option_key_is_rejected() {
        let source = "message m { optional int32 a = 1 [packed = true]; }";
        let err = ProtoParser::from_source(source, "F.proto")
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("Unrecognized option 'packed'."));
    }

    #[test]
    fn field_index_at_the_varint_tag_limit_parses() {
        let source = "message m { optional int32 a = 536870911; }";
        let model = ProtoParser::from_source(source, "F.proto").parse().unwrap();
        assert_eq!(
            536_870_911,
            model.messages().next().unwrap().fields()[0].index()
        );
    }

    #[test]
    fn non_numeric_index_is_rejected() {
        let err = ProtoParser::from_source("message m { optional int32 a = x; }", "F.proto")
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("Expected field index."));
    }
}
