//! Link graph for visualization
//!
//! Nodes are notes, edges are undirected "links to" relations derived with
//! [`extract_links`]. A pair of notes linking to each other in both
//! directions produces a single edge; self-links and links to notes missing
//! from the collection are not drawn.

use crate::models::NoteCollection;
use crate::services::link_extraction::extract_links;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const MIN_RADIUS: f64 = 3.0;
const MAX_RADIUS: f64 = 10.0;
const RADIUS_PER_LINK: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    /// Number of distinct notes linked to or from this one
    pub link_count: usize,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

/// Visual radius: grows linearly with link count, saturating at 10
pub fn node_radius(link_count: usize) -> f64 {
    (MIN_RADIUS + RADIUS_PER_LINK * link_count as f64).min(MAX_RADIUS)
}

/// Build the graph for every note in `collection`, ordered by note id
pub fn compute_graph(collection: &NoteCollection) -> LinkGraph {
    let ids = collection.sorted_ids();
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> =
        ids.iter().map(|id| (*id, BTreeSet::new())).collect();

    for &source in &ids {
        let Some(note) = collection.get(source) else {
            continue;
        };
        for found in extract_links(&note.content) {
            let target = found.note_id();
            if target == source || !collection.contains(target) {
                continue;
            }
            adjacency.entry(source).or_default().insert(target);
            adjacency.entry(target).or_default().insert(source);
        }
    }

    let nodes = ids
        .iter()
        .filter_map(|id| {
            let note = collection.get(id)?;
            let link_count = adjacency.get(id).map_or(0, BTreeSet::len);
            Some(GraphNode {
                id: note.id.clone(),
                title: note.title.clone(),
                link_count,
                radius: node_radius(link_count),
            })
        })
        .collect();

    let links = adjacency
        .iter()
        .flat_map(|(source, targets)| {
            targets
                .iter()
                .filter(move |target| *source < **target)
                .map(move |target| GraphLink {
                    source: source.to_string(),
                    target: target.to_string(),
                })
        })
        .collect();

    LinkGraph { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Element, Node, Note};
    use chrono::Utc;

    fn linking_to(targets: &[(&str, &str)]) -> Document {
        Document::new(vec![Node::Element(Element::paragraph(
            targets
                .iter()
                .map(|(id, title)| Node::Element(Element::note_link(*id, *title)))
                .collect(),
        ))])
    }

    #[test]
    fn test_radius_saturates() {
        assert_eq!(node_radius(0), 3.0);
        assert_eq!(node_radius(4), 5.0);
        assert_eq!(node_radius(14), 10.0);
        assert_eq!(node_radius(20), 10.0);
    }

    #[test]
    fn test_mutual_links_make_one_edge() {
        let now = Utc::now();
        let notes: NoteCollection = [
            Note::with_id("a", "A", linking_to(&[("b", "B"), ("b", "B"), ("a", "A")]), now),
            Note::with_id("b", "B", linking_to(&[("a", "A"), ("gone", "Gone")]), now),
            Note::with_id("c", "C", Document::empty(), now),
        ]
        .into_iter()
        .collect();

        let graph = compute_graph(&notes);
        assert_eq!(
            graph.links,
            vec![GraphLink {
                source: "a".into(),
                target: "b".into()
            }]
        );
        let counts: Vec<(&str, usize)> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.link_count))
            .collect();
        assert_eq!(counts, vec![("a", 1), ("b", 1), ("c", 0)]);
        assert_eq!(graph.nodes[2].radius, 3.0);
    }

    #[test]
    fn test_link_count_is_symmetric() {
        let now = Utc::now();
        let notes: NoteCollection = [
            Note::with_id("hub", "Hub", Document::empty(), now),
            Note::with_id("s1", "S1", linking_to(&[("hub", "Hub")]), now),
            Note::with_id("s2", "S2", linking_to(&[("hub", "Hub")]), now),
        ]
        .into_iter()
        .collect();

        let graph = compute_graph(&notes);
        let hub = graph.nodes.iter().find(|n| n.id == "hub").unwrap();
        assert_eq!(hub.link_count, 2);
        assert_eq!(hub.radius, 4.0);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let graph = LinkGraph {
            nodes: vec![GraphNode {
                id: "a".into(),
                title: "A".into(),
                link_count: 0,
                radius: 3.0,
            }],
            links: vec![],
        };
        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["nodes"][0]["linkCount"], 0);
    }
}
