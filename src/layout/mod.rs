//! Layout engines: graph topology and node sizes in, node centers out.

mod layered;
mod static_layout;

pub use layered::LayeredLayout;
pub use static_layout::StaticLayout;

use std::collections::BTreeMap;

use crate::config::{LayoutConfig, LayoutKind};
use crate::geometry::FPoint;
use crate::ir::{Attributes, Direction};

/// A node as the layout engine sees it: its layout size (content plus
/// margins) and a read-only view of its attributes.
#[derive(Debug, Clone, Copy)]
pub struct LayoutNode<'a> {
    pub id: &'a str,
    pub width: f32,
    pub height: f32,
    pub attributes: &'a Attributes,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutEdge<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

pub trait LayoutEngine {
    /// Returns the center of every node in graph space. Every coordinate
    /// must be finite and every node must be present. `direction` is the
    /// graph's principal direction, when it has one.
    fn layout(
        &self,
        nodes: &[LayoutNode<'_>],
        edges: &[LayoutEdge<'_>],
        direction: Option<Direction>,
    ) -> anyhow::Result<BTreeMap<String, FPoint>>;
}

impl<T: LayoutEngine + ?Sized> LayoutEngine for Box<T> {
    fn layout(
        &self,
        nodes: &[LayoutNode<'_>],
        edges: &[LayoutEdge<'_>],
        direction: Option<Direction>,
    ) -> anyhow::Result<BTreeMap<String, FPoint>> {
        (**self).layout(nodes, edges, direction)
    }
}

/// Builds the engine selected by `config`.
pub fn engine_for(config: &LayoutConfig) -> Box<dyn LayoutEngine> {
    match config.engine {
        LayoutKind::Static => Box::new(StaticLayout),
        LayoutKind::Layered => Box::new(LayeredLayout::from_config(config)),
    }
}
