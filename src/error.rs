use thiserror::Error;

use crate::crew::Stage;

/// Failures surfaced by the crew to its caller.
#[derive(Debug, Error)]
pub enum CrewError {
    /// The availability probe failed; nothing downstream was built.
    #[error("model backend is not accessible at {base_url}; please start the server")]
    BackendUnavailable { base_url: String },

    /// A model call failed mid-run. The run is abandoned as a whole.
    #[error("{stage} stage failed: {cause:#}")]
    StageFailed { stage: Stage, cause: anyhow::Error },
}
