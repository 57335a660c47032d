use crate::node::HandleType;

pub type Result<T> = std::result::Result<T, FlowError>;

/// Configuration errors reported through the flow's error channel.
///
/// None of these abort processing of the rest of the graph: the offending
/// node or edge is skipped (or treated as parentless) and the pass continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("node \"{node_id}\" uses the parent extent but has no parent")]
    ParentExtentWithoutParent { node_id: String },

    #[error(
        "couldn't create edge for {side} handle, edge id: {edge_id} (source handle: {source_handle:?}, target handle: {target_handle:?})"
    )]
    MissingHandle {
        edge_id: String,
        side: HandleType,
        source_handle: Option<String>,
        target_handle: Option<String>,
    },

    #[error("edge \"{edge_id}\" references unknown node \"{node_id}\"")]
    EdgeEndpointNotFound { edge_id: String, node_id: String },

    #[error("node \"{node_id}\" has no dimensions yet and can't be clamped to an extent")]
    MissingDimensions { node_id: String },

    #[error("parent node \"{parent_id}\" of node \"{node_id}\" not found")]
    ParentNotFound { node_id: String, parent_id: String },

    #[error("parent chain of node \"{node_id}\" contains a cycle")]
    ParentCycle { node_id: String },

    #[error("node \"{node_id}\" not found")]
    NodeNotFound { node_id: String },
}

impl FlowError {
    /// Stable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::ParentExtentWithoutParent { .. } => "005",
            FlowError::MissingHandle { .. } => "008",
            FlowError::EdgeEndpointNotFound { .. } => "011",
            FlowError::MissingDimensions { .. } => "015",
            FlowError::ParentNotFound { .. } => "016",
            FlowError::ParentCycle { .. } => "017",
            FlowError::NodeNotFound { .. } => "018",
        }
    }
}

/// Caller-supplied error channel.
pub type OnError = Box<dyn FnMut(&FlowError)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_handle_message_names_side_and_id() {
        let err = FlowError::MissingHandle {
            edge_id: "e1".into(),
            side: HandleType::Source,
            source_handle: Some("out".into()),
            target_handle: None,
        };
        assert_eq!(err.code(), "008");
        assert_eq!(
            err.to_string(),
            "couldn't create edge for source handle, edge id: e1 (source handle: Some(\"out\"), target handle: None)"
        );
    }

    #[test]
    fn test_missing_target_handle_names_target_side() {
        let err = FlowError::MissingHandle {
            edge_id: "e2".into(),
            side: HandleType::Target,
            source_handle: Some("out".into()),
            target_handle: None,
        };
        assert!(err.to_string().starts_with("couldn't create edge for target handle"));
    }
}
