//! Chat sessions and the rolling summarization controller.
//!
//! - [`store::MessageStore`]: ordered messages, written through to a mirror.
//! - [`mirror`]: the durable [`Mirror`] trait and the JSON chat log.
//! - [`window`]: when a pass runs and which indices it may touch.
//! - [`pipeline`]: candidate selection and the batched backend call.
//! - [`splice`]: folding summaries back in and advancing the cursor.
//! - [`session::ChatSession`]: ties the above together. Start here.

pub mod mirror;
pub mod pipeline;
pub mod session;
pub mod splice;
pub mod store;
pub mod tokens;
pub mod window;

pub use mirror::{ChatLog, JsonFileMirror, Mirror, NullMirror, SessionInfo};
pub use pipeline::{Candidate, SummaryResult};
pub use session::{ChatSession, PassOutcome};
pub use splice::SessionState;
pub use store::MessageStore;
pub use tokens::{CharRatioEstimator, TokenEstimator, WordCountEstimator};
pub use window::SummarizationPolicy;
