use thiserror::Error;

/// Failures surfaced by the render pipeline and the graph model.
///
/// Model and precondition errors are reported before any mutation is applied.
/// Collaborator failures carry the original error as their source; the
/// transition that triggered them commits nothing.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("node `{0}` does not exist")]
    MissingNode(String),
    #[error("edge `{0}` does not exist")]
    MissingEdge(String),
    #[error("node `{0}` already exists")]
    DuplicateNode(String),
    #[error("edge `{0}` already exists")]
    DuplicateEdge(String),
    #[error("zoom factor has not been computed yet")]
    UninitializedZoom,
    #[error("invalid attribute `{key}`: {reason}")]
    InvalidAttribute { key: String, reason: String },
    #[error("layout engine returned an unusable result: {0}")]
    InvalidLayout(String),
    #[error("layout engine failed")]
    Layout(#[source] anyhow::Error),
    #[error("edge router failed while routing `{edge}`")]
    Routing {
        edge: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("shape rasterizer failed for node `{node}`")]
    Rasterize {
        node: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RenderError {
    pub(crate) fn invalid_attribute(key: &str, reason: impl Into<String>) -> Self {
        RenderError::InvalidAttribute {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
