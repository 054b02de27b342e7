use crate::ir::{AttrValue, Attributes, Direction, GraphModel};
use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

static DIRECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^direction\s+(\w+)$").unwrap());
static NODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w.-]+)\s*(?:\[(.*)\])?$").unwrap());
static EDGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([\w.#>-]+)\s*:\s+)?([\w.-]+)\s*(<->|->|<-|--)\s*([\w.-]+)\s*(?:\[(.*)\])?$")
        .unwrap()
});
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w.]+)\s*=\s*("(?:[^"\\]|\\.)*"|\[[^\]]*\]|\{[^}]*\}|[^,\s]+)"#).unwrap()
});

#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    nodes: Vec<NodeDocument>,
    #[serde(default)]
    edges: Vec<EdgeDocument>,
}

#[derive(Debug, Deserialize)]
struct NodeDocument {
    id: String,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct EdgeDocument {
    #[serde(default)]
    id: Option<String>,
    from: String,
    to: String,
    #[serde(default)]
    attributes: Attributes,
}

/// Parses a graph from a JSON/JSON5 document or from the line-oriented
/// edge-list format.
pub fn parse_graph(input: &str) -> Result<GraphModel> {
    if input.trim_start().starts_with('{') {
        parse_document(input)
    } else {
        parse_edge_list(input)
    }
}

fn parse_document(input: &str) -> Result<GraphModel> {
    let doc: GraphDocument = match serde_json::from_str(input) {
        Ok(doc) => doc,
        Err(_) => json5::from_str(input).context("invalid graph document")?,
    };
    let mut graph = GraphModel::new();
    graph.direction = match doc.direction.as_deref() {
        Some(token) => Some(parse_direction(token)?),
        None => None,
    };
    for node in doc.nodes {
        graph.add_node(&node.id, node.attributes)?;
    }
    for edge in doc.edges {
        let id = match edge.id {
            Some(id) => id,
            None => graph.next_edge_id(&edge.from, &edge.to),
        };
        graph.add_edge(&id, &edge.from, &edge.to, edge.attributes)?;
    }
    Ok(graph)
}

struct EdgeLine {
    id: Option<String>,
    from: String,
    to: String,
    attributes: Attributes,
}

fn parse_edge_list(input: &str) -> Result<GraphModel> {
    let mut direction = None;
    let mut nodes: BTreeMap<String, Attributes> = BTreeMap::new();
    let mut edges: Vec<EdgeLine> = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = idx + 1;
        if let Some(caps) = DIRECTION_RE.captures(line) {
            direction = Some(parse_direction(&caps[1]).with_context(|| format!("line {line_no}"))?);
            continue;
        }
        if let Some(caps) = EDGE_RE.captures(line) {
            let mut attributes = parse_attributes(caps.get(5).map_or("", |m| m.as_str()))
                .with_context(|| format!("line {line_no}"))?;
            let (mut from, mut to) = (caps[2].to_string(), caps[4].to_string());
            match &caps[3] {
                "--" => {
                    attributes.entry("end_arrow".to_string()).or_insert(AttrValue::Bool(false));
                }
                "<->" => {
                    attributes.entry("start_arrow".to_string()).or_insert(AttrValue::Bool(true));
                }
                "<-" => std::mem::swap(&mut from, &mut to),
                _ => {}
            }
            nodes.entry(from.clone()).or_default();
            nodes.entry(to.clone()).or_default();
            edges.push(EdgeLine {
                id: caps.get(1).map(|m| m.as_str().to_string()),
                from,
                to,
                attributes,
            });
            continue;
        }
        if let Some(caps) = NODE_RE.captures(line) {
            let attributes = parse_attributes(caps.get(2).map_or("", |m| m.as_str()))
                .with_context(|| format!("line {line_no}"))?;
            nodes.entry(caps[1].to_string()).or_default().extend(attributes);
            continue;
        }
        return Err(anyhow!("line {line_no}: cannot parse `{line}`"));
    }

    let mut graph = GraphModel::new();
    graph.direction = direction;
    for (id, attributes) in nodes {
        graph.add_node(&id, attributes)?;
    }
    for edge in edges {
        let id = match edge.id {
            Some(id) => id,
            None => graph.next_edge_id(&edge.from, &edge.to),
        };
        graph.add_edge(&id, &edge.from, &edge.to, edge.attributes)?;
    }
    Ok(graph)
}

fn parse_direction(token: &str) -> Result<Direction> {
    Direction::from_token(token).ok_or_else(|| anyhow!("unknown direction `{token}`"))
}

/// Parses `key=value, other="quoted, text"` lists. Dotted keys nest:
/// `ports.out=right` yields `{ports: {out: "right"}}`.
fn parse_attributes(input: &str) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    let mut consumed = 0usize;
    for caps in ATTR_RE.captures_iter(input) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let gap = &input[consumed..whole.start];
        if !gap.chars().all(|ch| ch == ',' || ch.is_whitespace()) {
            return Err(anyhow!("unexpected `{}` in attribute list", gap.trim()));
        }
        consumed = whole.end;
        let value = parse_value(&caps[2])?;
        insert_path(&mut attributes, &caps[1], value)?;
    }
    let rest = &input[consumed..];
    if !rest.chars().all(|ch| ch == ',' || ch.is_whitespace()) {
        return Err(anyhow!("unexpected `{}` in attribute list", rest.trim()));
    }
    Ok(attributes)
}

fn parse_value(raw: &str) -> Result<AttrValue> {
    if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Ok(AttrValue::Str(unescape(inner)));
    }
    if raw.starts_with('[') || raw.starts_with('{') {
        return json5::from_str(raw).with_context(|| format!("invalid value `{raw}`"));
    }
    if let Ok(value) = raw.parse::<bool>() {
        return Ok(AttrValue::Bool(value));
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(AttrValue::Int(value));
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Ok(AttrValue::Float(value));
    }
    Ok(AttrValue::Str(raw.to_string()))
}

fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn insert_path(target: &mut Attributes, key: &str, value: AttrValue) -> Result<()> {
    match key.split_once('.') {
        None => {
            target.insert(key.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| AttrValue::Map(BTreeMap::new()));
            let AttrValue::Map(nested) = entry else {
                return Err(anyhow!("`{head}` is not a map"));
            };
            insert_path(nested, rest, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edge_list() {
        let input = r#"
# two boxes
direction TD
Hello [label="Hello, there", x=0, y=0]
World [x=0, y=10]
Hello -> World [label=go]
World -- Extra
"#;
        let graph = parse_graph(input).unwrap();
        assert_eq!(graph.direction, Some(Direction::TopDown));
        assert_eq!(graph.node_count(), 3);
        let hello = graph.node("Hello").unwrap();
        assert_eq!(
            hello.attributes.get("label"),
            Some(&AttrValue::Str("Hello, there".to_string()))
        );
        assert_eq!(hello.attributes.get("x"), Some(&AttrValue::Int(0)));

        let edge = graph.edge("Hello->World").unwrap();
        assert_eq!(edge.attributes.get("label"), Some(&AttrValue::Str("go".to_string())));
        let undirected = graph.edge("World->Extra").unwrap();
        assert_eq!(undirected.attributes.get("end_arrow"), Some(&AttrValue::Bool(false)));
    }

    #[test]
    fn edge_ids_and_reverse_arrows() {
        let graph = parse_graph("link: A <- B\nA -> B\nA -> B\n").unwrap();
        let link = graph.edge("link").unwrap();
        assert_eq!((link.from.as_str(), link.to.as_str()), ("B", "A"));
        assert!(graph.edge("A->B").is_some());
        assert!(graph.edge("A->B#1").is_some());
    }

    #[test]
    fn dotted_keys_nest() {
        let graph = parse_graph("A [ports.out=right, ports.in.magnet=left, lod_map=[0.5]]").unwrap();
        let attrs = &graph.node("A").unwrap().attributes;
        let ports = attrs.get("ports").and_then(AttrValue::as_map).unwrap();
        assert_eq!(ports.get("out"), Some(&AttrValue::Str("right".to_string())));
        assert!(ports.get("in").and_then(AttrValue::as_map).is_some());
        assert_eq!(
            attrs.get("lod_map"),
            Some(&AttrValue::List(vec![AttrValue::Float(0.5)]))
        );
    }

    #[test]
    fn parses_json5_documents() {
        let input = r#"{
  direction: "LR",
  nodes: [{ id: "a", attributes: { label: "A" } }, { id: "b" }],
  edges: [{ from: "a", to: "b" }],
}"#;
        let graph = parse_graph(input).unwrap();
        assert_eq!(graph.direction, Some(Direction::LeftRight));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge("a->b").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_graph("A -> ").is_err());
        assert!(parse_graph("A [label=x y]").is_err());
        assert!(parse_graph("direction sideways").is_err());
        assert!(parse_graph(r#"{"nodes": [], "edges": [{"from": "a", "to": "b"}]}"#).is_err());
    }
}
