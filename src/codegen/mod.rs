//! Code generation from a parsed schema model.
//!
//! Generators are looked up by target-language tag in a process-wide
//! registry mirroring the parser registry: populated once from a
//! registration table, read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::model::ProtoModel;

mod cpp;
mod writer;

pub use cpp::CppGenerator;
pub use writer::{CodeWriter, MethodQuals};

/// Target-language tag of the bundled C++ generator.
pub const CPLUSPLUS: &str = "CPlusPlus";

/// A code generator for one target language.
pub trait Generator: Send + Sync {
    /// Generates output files for the model into `out_dir`, creating the
    /// directory when needed. When `common_code` is set, the shared
    /// runtime-support header is written as well.
    fn generate(
        &self,
        model: &ProtoModel,
        out_dir: &Path,
        project_name: &str,
        common_code: bool,
    ) -> Result<()>;
}

/// Generators keyed by target-language tag.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<&'static str, Box<dyn Generator>>,
}

static GLOBAL_REGISTRY: Lazy<GeneratorRegistry> =
    Lazy::new(GeneratorRegistry::with_default_generators);

impl GeneratorRegistry {
    pub fn new() -> GeneratorRegistry {
        GeneratorRegistry::default()
    }

    /// Builds a registry populated from the standard registration table.
    pub fn with_default_generators() -> GeneratorRegistry {
        let mut registry = GeneratorRegistry::new();
        registry.register(CPLUSPLUS, Box::new(CppGenerator));
        registry
    }

    /// The shared process-wide registry.
    pub fn global() -> &'static GeneratorRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn register(&mut self, language: &'static str, generator: Box<dyn Generator>) {
        self.generators.insert(language, generator);
    }

    pub fn generator(&self, language: &str) -> Option<&dyn Generator> {
        self.generators.get(language).map(Box::as_ref)
    }
}
