/**
 * engine module
 *
 * An RML engine turns (mapping, preprocessed JSON) into triples. The
 * materializer post-processes and writes whatever the engine returns.
 */

pub mod builtin;
pub mod morph_kgc;

use oxigraph::model::Triple;
use std::path::Path;

use crate::config::EngineKind;
use crate::errors::Result;

pub use builtin::BuiltinEngine;
pub use morph_kgc::MorphKgcEngine;

pub trait RmlEngine {
    fn name(&self) -> &'static str;

    /// Execute `mapping` with every logical source read from `data`
    fn materialize(&self, mapping: &Path, data: &Path) -> Result<Vec<Triple>>;
}

pub fn engine_for(kind: EngineKind) -> Box<dyn RmlEngine> {
    match kind {
        EngineKind::Builtin => Box::new(BuiltinEngine),
        EngineKind::MorphKgc => Box::new(MorphKgcEngine::default()),
    }
}
