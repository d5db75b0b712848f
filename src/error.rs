use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("metrics API unavailable: {reason} (is metrics-server installed and running?)")]
    MetricsUnavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("cluster request failed: {0}")]
    Connection(#[source] kube::Error),
}

impl ClusterError {
    pub fn from_kube(err: kube::Error, kind: &'static str, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => ClusterError::Connection(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}
