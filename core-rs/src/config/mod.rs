/**
 * config module
 *
 * - platform: PlatformConfig JSON (ID_KEY / TYPE_KEYS / JSONPATH_EXTRA_NODES)
 * - pipeline: optional kgctl.yaml with defaults for the CLI stages
 */

pub mod pipeline;
pub mod platform;

pub use pipeline::{EngineKind, PipelineConfig, INDEX_CACHE_ENV};
pub use platform::PlatformConfig;
