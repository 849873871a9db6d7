use acl_agent_core::WorkloadEndpointId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend does not (yet) know an endpoint for these workloads. They
    /// remain pending.
    #[error("no backend endpoint found for {}", join_ids(.0))]
    UnknownEndpoints(Vec<WorkloadEndpointId>),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

// === impl Error ===

impl Error {
    /// Both kinds leave the affected endpoints pending, so a later pass can
    /// apply them.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnknownEndpoints(_) | Self::Backend(_) => true,
        }
    }

    /// Unknown endpoints usually appear once the backend finishes creating
    /// them; they are not a failure of the backend.
    pub fn is_unknown_endpoint(&self) -> bool {
        matches!(self, Self::UnknownEndpoints(_))
    }
}

fn join_ids(ids: &[WorkloadEndpointId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
