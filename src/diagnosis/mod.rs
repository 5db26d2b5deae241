//! Plant diagnosis: prompt, external model call and response normalization.

pub mod fallback;
pub mod normalizer;
pub mod prompt;
pub mod record;

pub use fallback::{fallback_record, FallbackLocale};
pub use normalizer::DiagnosisNormalizer;
pub use record::{DiagnosisRecord, HEALTHY_PLANT};
