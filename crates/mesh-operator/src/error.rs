use mesh_common::error::MeshError;

pub type MeshOperatorResult<T = (), E = MeshOperatorError> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MeshOperatorError {
    /// Any error originating from the `kube-rs` crate
    #[error("Kubernetes reported error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    /// The mesh lacks the identity needed to own its children.
    #[error("Unable to build owner reference for Mesh {namespace}/{name}")]
    OwnerReference { namespace: String, name: String },

    #[error("Invalid Mesh spec: {0}")]
    InvalidSpec(String),

    #[error("Leadership of lease {0} was lost")]
    LeadershipLost(String),

    #[error(transparent)]
    Common(#[from] MeshError),
}

impl MeshOperatorError {
    /// True when the API server rejected a create because the object exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            MeshOperatorError::Kube {
                source: kube::Error::Api(response),
            } if response.code == 409 && response.reason == "AlreadyExists"
        )
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> MeshOperatorError {
    MeshOperatorError::Kube {
        source: kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} (test)"),
            reason: reason.to_string(),
            code,
        }),
    }
}
