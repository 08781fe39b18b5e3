//! `guestlink-matcher`: approximate identity matching between a guest-survey
//! extract and a property-management-system extract.
//!
//! Pure engine crate: receives pre-loaded records, returns classified match
//! results. No CLI dependencies; the only IO is parsing CSV text handed in.

pub mod assemble;
pub mod blocker;
pub mod classify;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fuzz;
pub mod hooks;
pub mod model;
pub mod normalize;
pub mod passes;
pub mod scorer;
pub mod summary;

pub use config::{Algorithm, ColumnMapping, MatchConfig};
pub use embedding::{Capabilities, EmbeddingProvider, LazyEmbedder};
pub use engine::{compare_algorithms, load_csv_records, run};
pub use error::MatchError;
pub use hooks::{CancelFlag, HookContext, HookReport, PostMatchHook, RunHooks};
pub use model::{Confidence, MatchInput, MatchOutput, MatchResult, RawRecord, RawValue, RunStatus};
