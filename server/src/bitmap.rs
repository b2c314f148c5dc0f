//! SVG to PNG rasterization
//!
//! Charts are produced as SVG sized in device pixels; this turns them into a
//! PNG of the same size on a white background.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to parse SVG: {0}")]
    Parse(#[from] usvg::Error),

    #[error("cannot allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// System fonts, loaded once per process.
fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();

            // Generic families used by the chart text
            db.set_sans_serif_family("DejaVu Sans");
            db.set_serif_family("DejaVu Serif");
            db.set_monospace_family("DejaVu Sans Mono");

            info!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

pub fn render_svg_to_png(svg: &str) -> Result<Vec<u8>, RenderError> {
    let opts = usvg::Options {
        fontdb: font_database(),
        ..usvg::Options::default()
    };

    let tree = usvg::Tree::from_str(svg, &opts)?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;

    // SVG backgrounds are transparent by default
    pixmap.fill(tiny_skia::Color::WHITE);

    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    debug!(width, height, "rasterized svg");

    pixmap
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}
