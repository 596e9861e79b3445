//! Query resolution: normalize → match → classify → compose, with the
//! router deciding between the knowledge base and the generative responder.

pub mod compose;
pub mod intent;
pub mod matcher;
pub mod normalize;
pub mod router;

pub use intent::IntentField;
pub use matcher::{MatchResult, MatchVia};
pub use normalize::normalize;
pub use router::{Priority, Router};
