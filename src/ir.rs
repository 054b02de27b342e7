use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" | "td" | "tb" => Some(Self::TopDown),
            "LR" | "lr" => Some(Self::LeftRight),
            _ => None,
        }
    }
}

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(value) => Some(*value as f64),
            AttrValue::Float(value) => Some(*value),
            AttrValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(value) => Some(*value),
            AttrValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            AttrValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            AttrValue::Str(value) => match value.trim() {
                "true" | "yes" | "on" => Some(true),
                "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders scalars as text, used for labels given as numbers.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttrValue::Str(value) => Some(value.clone()),
            AttrValue::Int(value) => Some(value.to_string()),
            AttrValue::Float(value) => Some(value.to_string()),
            AttrValue::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Builds an attribute map from key/value pairs.
pub fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// How an attribute update combines with the existing map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    #[default]
    Merge,
    Replace,
}

pub(crate) fn apply_update(target: &mut Attributes, update: Attributes, mode: UpdateMode) {
    match mode {
        UpdateMode::Merge => target.extend(update),
        UpdateMode::Replace => *target = update,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub attributes: Attributes,
}

impl Edge {
    /// The endpoint opposite to `node_id`. Self loops return `node_id`.
    pub fn other(&self, node_id: &str) -> &str {
        if self.from == node_id {
            &self.to
        } else {
            &self.from
        }
    }
}

/// Nodes and edges with open-ended attributes. Every edge endpoint exists.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    pub direction: Option<Direction>,
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_node(&mut self, id: &str, attributes: Attributes) -> Result<()> {
        if self.nodes.contains_key(id) {
            return Err(RenderError::DuplicateNode(id.to_string()));
        }
        self.nodes.insert(
            id.to_string(),
            Node {
                id: id.to_string(),
                attributes,
            },
        );
        Ok(())
    }

    /// Removes the node and every incident edge; returns the removed edges.
    pub fn remove_node(&mut self, id: &str) -> Result<(Node, Vec<Edge>)> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| RenderError::MissingNode(id.to_string()))?;
        let incident: Vec<String> = self
            .edges
            .values()
            .filter(|edge| edge.from == id || edge.to == id)
            .map(|edge| edge.id.clone())
            .collect();
        let removed = incident
            .iter()
            .filter_map(|edge_id| self.edges.remove(edge_id))
            .collect();
        Ok((node, removed))
    }

    pub fn update_node_attributes(
        &mut self,
        id: &str,
        update: Attributes,
        mode: UpdateMode,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| RenderError::MissingNode(id.to_string()))?;
        apply_update(&mut node.attributes, update, mode);
        Ok(())
    }

    pub fn add_edge(&mut self, id: &str, from: &str, to: &str, attributes: Attributes) -> Result<()> {
        for endpoint in [from, to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(RenderError::MissingNode(endpoint.to_string()));
            }
        }
        if self.edges.contains_key(id) {
            return Err(RenderError::DuplicateEdge(id.to_string()));
        }
        self.edges.insert(
            id.to_string(),
            Edge {
                id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                attributes,
            },
        );
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        self.edges
            .remove(id)
            .ok_or_else(|| RenderError::MissingEdge(id.to_string()))
    }

    pub fn update_edge_attributes(
        &mut self,
        id: &str,
        update: Attributes,
        mode: UpdateMode,
    ) -> Result<()> {
        let edge = self
            .edges
            .get_mut(id)
            .ok_or_else(|| RenderError::MissingEdge(id.to_string()))?;
        apply_update(&mut edge.attributes, update, mode);
        Ok(())
    }

    /// Edges touching `id`, in edge id order.
    pub fn incident_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .filter(move |edge| edge.from == id || edge.to == id)
    }

    /// Distinct neighbor ids of `id`, in first-seen edge order.
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for edge in self.incident_edges(id) {
            let other = edge.other(id);
            if other != id && !out.iter().any(|seen| seen == other) {
                out.push(other.to_string());
            }
        }
        out
    }

    /// An edge id not yet in use, derived from the endpoints.
    pub fn next_edge_id(&self, from: &str, to: &str) -> String {
        let base = format!("{from}->{to}");
        if !self.edges.contains_key(&base) {
            return base;
        }
        let mut idx = 1usize;
        loop {
            let candidate = format!("{base}#{idx}");
            if !self.edges.contains_key(&candidate) {
                return candidate;
            }
            idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphModel {
        let mut graph = GraphModel::new();
        graph.add_node("A", Attributes::new()).unwrap();
        graph.add_node("B", Attributes::new()).unwrap();
        graph.add_node("C", Attributes::new()).unwrap();
        graph.add_edge("e1", "A", "B", Attributes::new()).unwrap();
        graph.add_edge("e2", "C", "A", Attributes::new()).unwrap();
        graph
    }

    #[test]
    fn edge_requires_existing_endpoints() {
        let mut graph = sample();
        let err = graph.add_edge("e3", "A", "Z", Attributes::new()).unwrap_err();
        assert!(matches!(err, RenderError::MissingNode(id) if id == "Z"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn removing_a_node_removes_incident_edges() {
        let mut graph = sample();
        let (_, removed) = graph.remove_node("A").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(matches!(graph.remove_node("A"), Err(RenderError::MissingNode(_))));
    }

    #[test]
    fn merge_and_replace_updates() {
        let mut graph = sample();
        graph
            .update_node_attributes("A", attrs([("label", "x".into())]), UpdateMode::Merge)
            .unwrap();
        graph
            .update_node_attributes("A", attrs([("shape", "box".into())]), UpdateMode::Merge)
            .unwrap();
        assert_eq!(graph.node("A").unwrap().attributes.len(), 2);
        graph
            .update_node_attributes("A", attrs([("z", 1i64.into())]), UpdateMode::Replace)
            .unwrap();
        assert_eq!(graph.node("A").unwrap().attributes.len(), 1);
    }

    #[test]
    fn neighbors_and_edge_ids() {
        let graph = sample();
        assert_eq!(graph.neighbors("A"), vec!["B".to_string(), "C".to_string()]);
        assert_eq!(graph.next_edge_id("A", "B"), "A->B");
    }

    #[test]
    fn attr_values_deserialize_untagged() {
        let parsed: Attributes =
            serde_json::from_str(r#"{"x": 1, "y": 2.5, "label": "hi", "on": true}"#).unwrap();
        assert_eq!(parsed["x"].as_i64(), Some(1));
        assert_eq!(parsed["y"].as_f64(), Some(2.5));
        assert_eq!(parsed["label"].as_str(), Some("hi"));
        assert_eq!(parsed["on"].as_bool(), Some(true));
    }
}
