//! Sub-parser for `package` statements.

use crate::error::Result;
use crate::model::ProtoModel;
use crate::token_reader::TokenIter;

use super::{advance_to_delimiter, advance_to_word, ParseOutcome, ParserRegistry, SubParser};

/// Parses `package <dotted.name>;` and records it as the current package.
/// Repeated statements are tolerated; the last one wins.
pub struct PackageParser;

impl SubParser for PackageParser {
    fn try_parse(
        &self,
        _registry: &ParserRegistry,
        tokens: &mut TokenIter,
        model: &mut ProtoModel,
    ) -> Result<ParseOutcome> {
        if tokens.at_end() || tokens.current() != "package" {
            return Ok(ParseOutcome::NotApplicable);
        }

        let name = advance_to_word(tokens, "package name")?;
        advance_to_delimiter(tokens, ";")?;
        model.set_current_package(name);

        Ok(ParseOutcome::Accepted)
    }
}
