//! Page composition.
//!
//! This module lays out an ordered list of images into a PDF document, one
//! image per page, each scaled to fit the page and centered.

use crate::geometry::{PageGeometry, PlacementRect};
use crate::source::{DecodeError, ImageSource};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use std::io::{self, BufWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Title used when the caller does not provide one.
pub const DEFAULT_TITLE: &str = "Images";

/// Rasters are embedded at one pixel per point.
const POINTS_PER_INCH: f32 = 72.0;

/// Errors that can occur while composing or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Image #{page} failed: {source}")]
    Decode {
        page: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid page dimensions: width={width}, height={height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("Conversion cancelled")]
    Cancelled,

    #[error("PDF creation error: {0}")]
    PdfCreation(String),

    #[error("Cannot write PDF to {destination}: {source}")]
    Write {
        destination: String,
        #[source]
        source: io::Error,
    },
}

/// Shared flag used to abandon a conversion between two images.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished PDF together with where each image was placed.
#[derive(Debug, Clone)]
pub struct ComposedPdf {
    bytes: Vec<u8>,
    placements: Vec<PlacementRect>,
}

impl ComposedPdf {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    /// Placement of each page's image, in page order.
    pub fn placements(&self) -> &[PlacementRect] {
        &self.placements
    }
}

/// Builds one-image-per-page PDF documents.
pub struct PageComposer {
    geometry: PageGeometry,
    title: String,
    cancel: Option<CancelToken>,
}

impl Default for PageComposer {
    fn default() -> Self {
        PageComposer {
            geometry: PageGeometry::A4,
            title: DEFAULT_TITLE.to_string(),
            cancel: None,
        }
    }
}

impl PageComposer {
    /// Creates a composer for A4-like pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a composer laying pages out on `geometry`.
    pub fn with_geometry(geometry: PageGeometry) -> Self {
        PageComposer {
            geometry,
            ..Self::default()
        }
    }

    /// Sets the document title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Attaches a cancellation flag, checked once per image.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Converts points to millimeters.
    ///
    /// printpdf 0.7 only takes page sizes and offsets in `Mm`, and converts
    /// back with its own factor, so written values drift by under 0.001 pt
    /// (a 595 pt page comes out as 595.0004).
    fn points_to_mm(points: f32) -> f32 {
        points * 0.352778
    }

    fn check_cancelled(&self) -> Result<(), ComposeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ComposeError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Composes `sources` into a PDF with one page per source, in order.
    ///
    /// Sources are decoded one at a time and their rasters dropped as soon
    /// as their page is finished. The first failure aborts the whole
    /// conversion and nothing is returned. An empty slice yields a valid
    /// document without pages.
    pub fn compose<S: ImageSource>(&self, sources: &[S]) -> Result<ComposedPdf, ComposeError> {
        if !self.geometry.is_valid() {
            return Err(ComposeError::InvalidGeometry {
                width: self.geometry.width,
                height: self.geometry.height,
            });
        }

        let page_width = Mm(Self::points_to_mm(self.geometry.width as f32));
        let page_height = Mm(Self::points_to_mm(self.geometry.height as f32));

        let doc = PdfDocument::empty(self.title.clone());
        let mut placements = Vec::with_capacity(sources.len());

        for (index, source) in sources.iter().enumerate() {
            self.check_cancelled()?;

            let page = index + 1;
            let decoded = source
                .decode()
                .map_err(|source| ComposeError::Decode { page, source })?;
            let (width, height) = decoded.dimensions();
            let placement = PlacementRect::fit(width, height, self.geometry).ok_or_else(|| {
                ComposeError::Decode {
                    page,
                    source: DecodeError::EmptyRaster {
                        name: source.describe(),
                        width,
                        height,
                    },
                }
            })?;

            debug!(
                page,
                source = %source.describe(),
                width,
                height,
                scale = PlacementRect::scale(width, height, self.geometry),
                scaled_width = placement.scaled_width,
                scaled_height = placement.scaled_height,
                offset_x = placement.offset_x,
                offset_y = placement.offset_y,
                "placing image"
            );

            let raster = DynamicImage::ImageRgb8(scale_raster(decoded, &placement));

            let (page_idx, layer_idx) = doc.add_page(page_width, page_height, "Layer 1");
            let layer = doc.get_page(page_idx).get_layer(layer_idx);

            // Centered, so each offset is the same from either edge.
            Image::from_dynamic_image(&raster).add_to_layer(
                layer,
                ImageTransform {
                    translate_x: Some(Mm(Self::points_to_mm(placement.offset_x))),
                    translate_y: Some(Mm(Self::points_to_mm(placement.offset_y))),
                    dpi: Some(POINTS_PER_INCH),
                    ..Default::default()
                },
            );

            placements.push(placement);
        }

        self.check_cancelled()?;

        let mut bytes = Vec::new();
        doc.save(&mut BufWriter::new(&mut bytes))
            .map_err(|e| ComposeError::PdfCreation(e.to_string()))?;

        info!(pages = placements.len(), bytes = bytes.len(), "composed PDF");

        Ok(ComposedPdf { bytes, placements })
    }
}

/// Composes `sources` onto pages of `geometry` and returns the PDF bytes.
pub fn compose<S: ImageSource>(
    sources: &[S],
    geometry: PageGeometry,
) -> Result<Vec<u8>, ComposeError> {
    PageComposer::with_geometry(geometry)
        .compose(sources)
        .map(ComposedPdf::into_bytes)
}

/// Resamples `img` to the placement size and flattens any alpha onto white.
fn scale_raster(img: DynamicImage, placement: &PlacementRect) -> RgbImage {
    let img = if img.dimensions() == (placement.scaled_width, placement.scaled_height) {
        img
    } else {
        img.resize_exact(
            placement.scaled_width,
            placement.scaled_height,
            FilterType::Triangle,
        )
    };

    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let alpha = u16::from(src[3]);
        for c in 0..3 {
            let blended = u16::from(src[c]) * alpha + 255 * (255 - alpha);
            dst[c] = ((blended + 127) / 255) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryImage;
    use image::{Rgb, Rgba, RgbaImage};

    fn raster(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 100, 50])))
    }

    fn pdf_page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_default_composer() {
        let composer = PageComposer::new();
        assert_eq!(composer.geometry(), PageGeometry::A4);
        assert_eq!(composer.title, DEFAULT_TITLE);
        assert!(composer.cancel.is_none());
    }

    #[test]
    fn test_points_to_mm() {
        // 72 points = 1 inch = 25.4 mm
        let mm = PageComposer::points_to_mm(72.0);
        assert!((mm - 25.4).abs() < 0.01);
    }

    #[test]
    fn test_compose_single_image() {
        let pdf = PageComposer::new().compose(&[raster(1000, 500)]).unwrap();

        assert!(pdf.bytes().starts_with(b"%PDF-"));
        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf_page_count(pdf.bytes()), 1);

        let placement = pdf.placements()[0];
        assert_eq!((placement.scaled_width, placement.scaled_height), (595, 297));
        assert_eq!((placement.offset_x, placement.offset_y), (0.0, 272.5));
    }

    #[test]
    fn test_compose_keeps_input_order() {
        let sources = vec![raster(1000, 500), raster(400, 800), raster(30, 30)];
        let pdf = PageComposer::new().compose(&sources).unwrap();

        assert_eq!(pdf_page_count(pdf.bytes()), 3);
        let sizes: Vec<(u32, u32)> = pdf
            .placements()
            .iter()
            .map(|p| (p.scaled_width, p.scaled_height))
            .collect();
        assert_eq!(sizes, vec![(595, 297), (421, 842), (595, 595)]);
    }

    #[test]
    fn test_compose_empty_is_valid_document() {
        let sources: Vec<DynamicImage> = Vec::new();
        let pdf = PageComposer::new().compose(&sources).unwrap();

        assert!(pdf.bytes().starts_with(b"%PDF-"));
        assert_eq!(pdf.page_count(), 0);
        assert_eq!(pdf_page_count(pdf.bytes()), 0);
    }

    #[test]
    fn test_decode_failure_aborts() {
        let good = image_png(raster(3, 3));
        let sources = vec![
            MemoryImage::new("one.png", good.clone()),
            MemoryImage::new("two.png", good),
            MemoryImage::new("three.png", b"corrupt".to_vec()),
        ];

        let result = PageComposer::new().compose(&sources);
        match result {
            Err(ComposeError::Decode { page, source }) => {
                assert_eq!(page, 3);
                assert!(source.to_string().contains("three.png"));
            }
            other => panic!("expected decode error, got {:?}", other.map(|p| p.page_count())),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();

        let result = PageComposer::new()
            .cancel_token(token)
            .compose(&[raster(10, 10)]);
        assert!(matches!(result, Err(ComposeError::Cancelled)));
    }

    #[test]
    fn test_cancel_checked_per_image() {
        struct CancellingSource {
            token: CancelToken,
        }

        impl ImageSource for CancellingSource {
            fn describe(&self) -> String {
                "cancelling".to_string()
            }

            fn decode(&self) -> Result<DynamicImage, DecodeError> {
                // The current image still completes; the next boundary stops.
                self.token.cancel();
                Ok(raster(4, 4))
            }
        }

        let token = CancelToken::new();
        let sources = vec![
            CancellingSource {
                token: token.clone(),
            },
            CancellingSource {
                token: token.clone(),
            },
        ];

        let result = PageComposer::new().cancel_token(token.clone()).compose(&sources);
        assert!(matches!(result, Err(ComposeError::Cancelled)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_compose_with_custom_geometry() {
        let geometry = PageGeometry {
            width: 100,
            height: 200,
        };
        let bytes = compose(&[raster(50, 50)], geometry).unwrap();
        assert_eq!(pdf_page_count(&bytes), 1);
    }

    #[test]
    fn test_compose_rejects_empty_page() {
        let geometry = PageGeometry {
            width: 0,
            height: 842,
        };
        let result = PageComposer::with_geometry(geometry).compose(&[raster(10, 10)]);
        assert!(matches!(
            result,
            Err(ComposeError::InvalidGeometry {
                width: 0,
                height: 842
            })
        ));

        let result = compose(
            &[raster(10, 10)],
            PageGeometry {
                width: 595,
                height: 0,
            },
        );
        assert!(matches!(result, Err(ComposeError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_scale_raster_resizes() {
        let placement = PlacementRect::fit(400, 800, PageGeometry::A4).unwrap();
        let scaled = scale_raster(raster(400, 800), &placement);
        assert_eq!(scaled.dimensions(), (421, 842));
    }

    #[test]
    fn test_scale_raster_flattens_alpha_onto_white() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let placement = PlacementRect {
            scaled_width: 2,
            scaled_height: 1,
            offset_x: 0.0,
            offset_y: 0.0,
        };

        let flat = scale_raster(DynamicImage::ImageRgba8(img), &placement);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    fn image_png(img: DynamicImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }
}
