//! img2pdf
//!
//! This library lays out a sequence of images into an A4-like PDF, one image
//! per page, each scaled to fit and centered, and saves the result.

pub mod composer;
pub mod geometry;
pub mod sink;
pub mod source;
pub mod viewer;

pub use composer::{compose, CancelToken, ComposeError, ComposedPdf, PageComposer};
pub use geometry::{PageGeometry, PlacementRect};
pub use sink::{ensure_pdf_extension, save_pdf, write_pdf};
pub use source::{DecodeError, ImageSource, MemoryImage};
pub use viewer::{Opener, ViewerError};
