//! Sub-parser for `import` statements.

use crate::error::Result;
use crate::model::{ImportModel, ImportVisibility, ProtoModel};
use crate::token_reader::TokenIter;

use super::{advance_to_delimiter, advance_to_word, err_at, ParseOutcome, ParserRegistry, SubParser};

/// Parses `import [public|weak] "<path>";` and appends it to the model's
/// import list in source order.
pub struct ImportParser;

impl SubParser for ImportParser {
    fn try_parse(
        &self,
        _registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "import" {
            return Ok(ParseOutcome::NotApplicable);
        }

        let mut visibility = ImportVisibility::Normal;
        let target = advance_to_word(tokens, "import file name")?;
        match target.as_str() {
            "public" => {
                visibility = ImportVisibility::Public;
                advance_to_word(tokens, "import file name")?;
            }
            "weak" => {
                visibility = ImportVisibility::Weak;
                advance_to_word(tokens, "import file name")?;
            }
            _ => {}
        }

        // The file name is a string literal: an opening quote, the path
        // token, then the closing quote.
        if tokens.current() != "\"" {
            return Err(err_at(tokens, "Expected \" character."));
        }
        tokens.advance();
        if tokens.at_end() {
            return Err(err_at(tokens, "Expected import file name."));
        }
        let path = tokens.current().to_string();
        advance_to_delimiter(tokens, "\"")?;
        advance_to_delimiter(tokens, ";")?;

        model.add_import(ImportModel::new(path, visibility));

        Ok(ParseOutcome::Accepted)
    }
}
