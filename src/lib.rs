//! `protogen` compiles proto2-dialect `.proto` schema files into C++
//! message classes.
//!
//! For a schema at `schemas/Person.proto`, compilation writes
//! `Person.protocol.h` and `Person.protocol.cpp` into the output
//! directory, together with a shared runtime-support header
//! `ProtoBase.protocol.h` that the generated classes include. The
//! generated classes expose typed accessors for every field, oneof choice
//! tracking, and `clear` / `parse` / `serialize` / `byteSize` / `valid`
//! operations over the standard Protocol Buffers wire format.
//!
//! ## Example
//!
//! ```no_run
//! fn main() -> protogen::Result<()> {
//!     protogen::compile_protos(&["schemas/Person.proto"], "generated")
//! }
//! ```
//!
//! Non-default options go through the [`Config`] builder:
//!
//! ```no_run
//! fn main() -> protogen::Result<()> {
//!     protogen::Config::new()
//!         .project_name("Demo")
//!         .compile_protos(&["schemas/Person.proto"], "generated")
//! }
//! ```
//!
//! The schema front end is self-contained: a streaming tokenizer
//! ([`TokenReader`]) feeds a registry of sub-parsers ([`ParserRegistry`])
//! that build the schema model ([`ProtoModel`]), and a registered
//! [`Generator`] walks the model to emit the output files. Both
//! registries are populated once at startup and can be replaced per call
//! for testing or for custom target languages.

mod codegen;
mod error;
mod ident;
mod model;
mod parse;
mod token_reader;

pub use codegen::{
    CodeWriter, CppGenerator, Generator, GeneratorRegistry, MethodQuals, CPLUSPLUS,
};
pub use error::{Error, Result};
pub use model::{
    EnumModel, EnumValueModel, FieldCategory, ImportModel, ImportVisibility, MessageFieldModel,
    MessageIndex, MessageModel, OneofModel, ProtoModel, Requiredness, BUILT_IN_TYPES,
};
pub use parse::{context, ParseOutcome, ParserRegistry, ProtoParser, SubParser};
pub use token_reader::{Token, TokenIter, TokenReader};

use std::path::Path;

use log::debug;

/// Configuration options for schema compilation.
///
/// This builder selects the target language, the project name used in
/// include guards, and whether the shared runtime header is written.
pub struct Config {
    project_name: String,
    language: String,
    common_code: bool,
}

impl Config {
    /// Creates a configuration with default options: no project prefix,
    /// the C++ generator, and the runtime header written once.
    pub fn new() -> Config {
        Config::default()
    }

    /// Sets the project name prefixed to the generated include guards.
    pub fn project_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.project_name = name.into();
        self
    }

    /// Selects the target language by registry tag.
    pub fn language(&mut self, tag: impl Into<String>) -> &mut Self {
        self.language = tag.into();
        self
    }

    /// Skips writing the shared runtime-support header, for builds where a
    /// previous run already produced it.
    pub fn skip_common_code(&mut self) -> &mut Self {
        self.common_code = false;
        self
    }

    /// Compiles each schema into the output directory, creating it when
    /// needed. The runtime-support header is written at most once per
    /// call, alongside the first schema's output.
    pub fn compile_protos<P>(&self, protos: &[P], out_dir: impl AsRef<Path>) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let generator = GeneratorRegistry::global()
            .generator(&self.language)
            .ok_or_else(|| {
                Error::Schema(format!(
                    "no generator registered for language '{}'",
                    self.language
                ))
            })?;
        let out_dir = out_dir.as_ref();

        let mut common_code = self.common_code;
        for proto in protos {
            let model = ProtoParser::open(proto)?.parse()?;
            debug!("compiling {} into {}", model.file_name(), out_dir.display());
            generator.generate(&model, out_dir, &self.project_name, common_code)?;
            common_code = false;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            project_name: String::new(),
            language: CPLUSPLUS.to_string(),
            common_code: true,
        }
    }
}

/// Compiles `.proto` schema files into C++ sources with default options.
///
/// # Errors
///
/// Fails with [`Error::Io`] when a schema cannot be read or an output file
/// cannot be written, [`Error::InvalidProto`] when a schema does not
/// parse, and [`Error::Schema`] when a field references an unknown type.
pub fn compile_protos<P>(protos: &[P], out_dir: impl AsRef<Path>) -> Result<()>
where
    P: AsRef<Path>,
{
    Config::new().compile_protos(protos, out_dir)
}
