pub mod anchors;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod pipeline;
pub mod properties;
pub mod raster;
pub mod render;
pub mod routing;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use error::{RenderError, Result};
pub use ir::{AttrValue, Attributes, GraphModel, UpdateMode};
pub use pipeline::{RenderPipeline, RenderState};
