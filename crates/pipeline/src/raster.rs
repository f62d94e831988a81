//! Label rasterization: SVG → straight-alpha RGBA → PNG.

use std::io::Cursor;
use std::sync::Arc;

/// Largest label raster side accepted, in pixels.
const MAX_RASTER_DIM: u32 = 16_384;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("invalid label svg: {0}")]
    Parse(#[from] usvg::Error),

    #[error("label raster size {width}x{height} is not drawable")]
    Size { width: u32, height: u32 },

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Renders label SVG documents with a shared font database.
///
/// Loading system fonts is slow, so one rasterizer is built per process and
/// shared between jobs.
#[derive(Clone)]
pub struct LabelRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl LabelRasterizer {
    pub fn new(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    pub fn with_system_fonts() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        ensure_sans_serif(&mut db);
        tracing::debug!(faces = db.len(), "Loaded system fonts for label rendering");
        Self::new(Arc::new(db))
    }

    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }

    /// Rasterize an SVG at its intrinsic size.
    pub fn render_rgba(&self, svg: &str) -> Result<image::RgbaImage, RasterError> {
        let opts = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts)?;

        let size = tree.size();
        let width = size.width().ceil() as u32;
        let height = size.height().ceil() as u32;
        if width == 0 || height == 0 || width > MAX_RASTER_DIM || height > MAX_RASTER_DIM {
            return Err(RasterError::Size { width, height });
        }

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or(RasterError::Size { width, height })?;
        resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied pixels; PNG wants straight alpha.
        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        image::RgbaImage::from_raw(width, height, rgba).ok_or(RasterError::Size { width, height })
    }

    /// Rasterize an SVG and encode it as PNG.
    pub fn render_png(&self, svg: &str) -> Result<Vec<u8>, RasterError> {
        let img = self.render_rgba(svg)?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(buf)
    }
}

/// Point the generic sans-serif family at an installed face when the
/// default one is missing, so labels still get text.
fn ensure_sans_serif(db: &mut usvg::fontdb::Database) {
    use usvg::fontdb::{Family, Query};

    let query = Query {
        families: &[Family::SansSerif],
        ..Query::default()
    };
    if db.query(&query).is_some() {
        return;
    }
    let fallback = db
        .faces()
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
    if let Some(family) = fallback {
        tracing::debug!(%family, "Default sans-serif family missing, using fallback");
        db.set_sans_serif_family(family);
    }
}

impl std::fmt::Debug for LabelRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelRasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}
