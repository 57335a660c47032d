use crate::changes::{push_edge_changes, push_node_changes, EdgeChange, FlowEvent, NodeChange};
use std::collections::HashSet;

/// Selection changes produced by one selection action
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionChanges {
    pub nodes: Vec<NodeChange>,
    pub edges: Vec<EdgeChange>,
}

impl SelectionChanges {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Append the non-empty batches to an event stream, nodes first
    pub fn push_into(self, events: &mut Vec<FlowEvent>) {
        push_node_changes(events, self.nodes);
        push_edge_changes(events, self.edges);
    }
}

/// Diff the current selection of `items` against the wanted set
///
/// Only items whose flag flips are returned, in iteration order.
pub fn diff_selection<'a, I>(items: I, wanted: &HashSet<&str>) -> Vec<(String, bool)>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    items
        .into_iter()
        .filter_map(|(id, selected)| {
            let will_be_selected = wanted.contains(id);
            (selected != will_be_selected).then(|| (id.to_owned(), will_be_selected))
        })
        .collect()
}
