use anyhow::anyhow;
use std::collections::BTreeMap;

use super::{LayoutEdge, LayoutEngine, LayoutNode};
use crate::geometry::FPoint;
use crate::ir::Direction;

/// Places every node at its pinned `x`/`y` attributes. Missing coordinates
/// default to zero; edges are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLayout;

impl LayoutEngine for StaticLayout {
    fn layout(
        &self,
        nodes: &[LayoutNode<'_>],
        _edges: &[LayoutEdge<'_>],
        _direction: Option<Direction>,
    ) -> anyhow::Result<BTreeMap<String, FPoint>> {
        let mut positions = BTreeMap::new();
        for node in nodes {
            let coord = |key: &str| -> anyhow::Result<f32> {
                match node.attributes.get(key) {
                    None => Ok(0.0),
                    Some(value) => value
                        .as_f64()
                        .map(|v| v as f32)
                        .ok_or_else(|| anyhow!("node `{}` has a non-numeric `{key}`", node.id)),
                }
            };
            positions.insert(node.id.to_string(), FPoint::new(coord("x")?, coord("y")?));
        }
        Ok(positions)
    }
}
