//! Template engines behind a single renderer interface.
//!
//! Compilation is a registry function (`compile`); rendering goes through
//! the [`Renderer`] trait so the request handler never needs to know which
//! engine produced a given [`crate::runtime::CompiledBody::Rendered`].

pub mod block;
pub mod functions;
pub mod interpolation;
pub mod value;

use std::fmt;
use std::sync::Arc;

use crate::error::{MockError, Result};
use crate::runtime::RenderContext;

/// A compiled template, callable against a [`RenderContext`].
pub trait Renderer: Send + Sync + fmt::Debug {
    /// Renders the template, producing response body bytes.
    fn render(&self, ctx: &RenderContext) -> Result<Vec<u8>>;
}

/// Compiles `source` with the named engine (`expr` or `jinja2`).
///
/// `display_name` identifies the owning scenario in error messages.
pub fn compile(engine: &str, display_name: &str, source: &str) -> Result<Arc<dyn Renderer>> {
    match engine {
        "expr" => Ok(Arc::new(interpolation::InterpolationRenderer::compile(
            source,
        )?)),
        "jinja2" => Ok(Arc::new(block::BlockRenderer::compile(source)?)),
        other => Err(MockError::Compile {
            id: display_name.to_string(),
            message: format!("unknown template engine '{other}'"),
        }),
    }
}
