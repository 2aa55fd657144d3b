use crate::heuristics::HeuristicId;
use crate::section::SectionId;
use thiserror::Error;

/// Fatal errors raised while building or finalizing a result tree.
///
/// Soft input problems (unknown attack ids, ignored heuristics) never surface
/// here; they are logged and the tree keeps building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultError {
    #[error("Invalid heuristic {heur_id}: {reason}")]
    InvalidHeuristic { heur_id: HeuristicId, reason: String },

    #[error("Invalid function: {0}")]
    InvalidFunction(String),

    #[error("Result aggregation failed: {0}")]
    ResultAggregation(String),

    #[error("Section {0} does not belong to this result")]
    UnknownSection(SectionId),

    #[error("Cannot attach section {child} under {parent}: it is an ancestor of its new parent")]
    SectionCycle { parent: SectionId, child: SectionId },

    #[error("Failed to register attachment '{name}': {reason}")]
    Attachment { name: String, reason: String },

    #[error("Invalid result document: {0}")]
    InvalidDocument(String),
}

impl ResultError {
    pub(crate) fn unknown_heuristic(heur_id: HeuristicId) -> Self {
        Self::InvalidHeuristic {
            heur_id,
            reason: "a heuristic with this ID must be added to the service manifest before using it"
                .to_string(),
        }
    }

    pub(crate) fn heuristic_already_set(current: HeuristicId, new: HeuristicId) -> Self {
        Self::InvalidHeuristic {
            heur_id: new,
            reason: format!(
                "the section already carries heuristic {current}; setting a heuristic twice is not allowed"
            ),
        }
    }
}
