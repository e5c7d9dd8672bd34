//! Tip network graph for the front-end visualization

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::Tip;

/// Kind of graph node
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Tip,
    Topic,
    Semester,
    Tag,
}

impl NodeKind {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Tip => "tip",
            Self::Topic => "topic",
            Self::Semester => "semester",
            Self::Tag => "tag",
        }
    }
}

/// A node of the tip graph
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphNode {
    /// `<kind>:<key>`
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Number of tips attached to the node (1 for tip nodes)
    pub weight: usize,
}

/// An edge from a tip to one of its attributes
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

/// Node/link structure consumed by force-directed graph libraries
#[derive(Debug, Clone, Default, Serialize)]
pub struct TipGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

fn node_id(kind: NodeKind, key: &str) -> String {
    format!("{}:{}", kind.prefix(), key)
}

impl TipGraph {
    /// Build the graph for a set of tips
    pub fn build(tips: &[Tip]) -> Self {
        let mut graph = TipGraph::default();
        // (kind, normalized key) -> (label, weight)
        let mut shared: BTreeMap<(NodeKind, String), (String, usize)> = BTreeMap::new();

        let mut attach = |graph: &mut TipGraph, tip_node: &str, kind: NodeKind, label: &str| {
            let key = label.trim().to_lowercase();
            if key.is_empty() {
                return;
            }
            let entry = shared
                .entry((kind, key.clone()))
                .or_insert_with(|| (label.trim().to_string(), 0));
            entry.1 += 1;
            graph.links.push(GraphLink {
                source: tip_node.to_string(),
                target: node_id(kind, &key),
            });
        };

        for tip in tips {
            let tip_node = node_id(NodeKind::Tip, &tip.id.to_string());
            graph.nodes.push(GraphNode {
                id: tip_node.clone(),
                kind: NodeKind::Tip,
                label: tip_label(tip),
                weight: 1,
            });

            attach(&mut graph, &tip_node, NodeKind::Topic, &tip.issue_type);
            attach(&mut graph, &tip_node, NodeKind::Semester, &tip.semester);
            for tag in &tip.tags {
                attach(&mut graph, &tip_node, NodeKind::Tag, tag);
            }
        }

        graph.nodes.extend(shared.into_iter().map(|((kind, key), (label, weight))| GraphNode {
            id: node_id(kind, &key),
            kind,
            label,
            weight,
        }));

        graph
    }
}

fn tip_label(tip: &Tip) -> String {
    const MAX: usize = 60;
    let mut label: String = tip.description.chars().take(MAX).collect();
    if tip.description.chars().count() > MAX {
        label.push_str("...");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TipSubmission;

    fn tip(semester: &str, issue_type: &str, tags: &[&str]) -> Tip {
        TipSubmission {
            semester: semester.into(),
            issue_type: issue_type.into(),
            description: "Ein ausreichend langer Tipp für den Graphen.".into(),
            course: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
        .into_tip()
        .unwrap()
    }

    #[test]
    fn test_shared_nodes_are_weighted() {
        let tips = vec![
            tip("3", "Prüfungen", &["mathe"]),
            tip("3", "prüfungen", &["mathe", "lernen"]),
            tip("5", "Praktikum", &[]),
        ];
        let graph = TipGraph::build(&tips);

        let node = |id: &str| graph.nodes.iter().find(|n| n.id == id).unwrap();
        assert_eq!(node("topic:prüfungen").weight, 2);
        assert_eq!(node("topic:prüfungen").label, "Prüfungen");
        assert_eq!(node("semester:3").weight, 2);
        assert_eq!(node("tag:mathe").weight, 2);
        assert_eq!(node("tag:lernen").weight, 1);

        let tip_nodes = graph.nodes.iter().filter(|n| n.kind == NodeKind::Tip).count();
        assert_eq!(tip_nodes, 3);
        // 3 topics + 3 semesters + 3 tags
        assert_eq!(graph.links.len(), 9);
        // 3 tips + 2 topics + 2 semesters + 2 tags
        assert_eq!(graph.nodes.len(), 9);
    }

    #[test]
    fn test_links_point_to_existing_nodes() {
        let graph = TipGraph::build(&[tip("WS24/25", "Mensa", &["essen"])]);
        for link in &graph.links {
            assert!(graph.nodes.iter().any(|n| n.id == link.source));
            assert!(graph.nodes.iter().any(|n| n.id == link.target));
        }
    }
}
