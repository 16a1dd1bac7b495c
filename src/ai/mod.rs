//! Annotation pipeline: proofreading, assistant generation, and the
//! projection of published error ranges into renderable marks.

pub mod assistant;
pub mod decorations;
pub mod proofread;

pub use assistant::AssistantCoordinator;
pub use decorations::{DecorationProjector, Mark};
pub use proofread::{ProofreadCoordinator, ProofreadError};

/// Identity of one issued request, used to recognize stale results that
/// arrive after their request was superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);
