//! Contract Tests - Artifact Invariant Protection
//!
//! This file aggregates all contract test modules.
//! Contract tests verify invariants of the pipeline artifacts that MUST NEVER
//! BREAK: downstream stages and external tools rely on them.

#[path = "../common/mod.rs"]
mod common;

mod contracts {
    // Preprocessed JSON contracts
    mod preprocess {
        include!("preprocess_contracts.rs");
    }

    // RNR document and RML mapping contracts
    mod mapping {
        include!("mapping_contracts.rs");
    }

    // KG / iKG contracts
    mod graph {
        include!("graph_contracts.rs");
    }
}
