//! Image sources.
//!
//! An [`ImageSource`] is an opaque reference to one selected image that can
//! be resolved into a decoded raster. Files are sniffed by content, so a
//! mislabelled extension still decodes.

use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

/// Errors that can occur while resolving a source into a raster.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Cannot read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot decode {name}: {source}")]
    Format {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {name} has no pixels: width={width}, height={height}")]
    EmptyRaster {
        name: String,
        width: u32,
        height: u32,
    },
}

/// Something that resolves to a decoded raster.
pub trait ImageSource {
    /// Human-readable name used in logs and error messages.
    fn describe(&self) -> String;

    /// Decodes the source. Every call produces a fresh raster owned by the caller.
    fn decode(&self) -> Result<DynamicImage, DecodeError>;
}

impl ImageSource for Path {
    fn describe(&self) -> String {
        self.display().to_string()
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        let name = self.describe();
        let reader = ImageReader::open(self)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| DecodeError::Io {
                name: name.clone(),
                source,
            })?;
        let img = reader
            .decode()
            .map_err(|source| DecodeError::Format {
                name: name.clone(),
                source,
            })?;
        non_empty(name, img)
    }
}

impl ImageSource for PathBuf {
    fn describe(&self) -> String {
        self.as_path().describe()
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        self.as_path().decode()
    }
}

/// An encoded image (PNG, JPEG, ...) already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    name: String,
    bytes: Vec<u8>,
}

impl MemoryImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        MemoryImage {
            name: name.into(),
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ImageSource for MemoryImage {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        let reader = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|source| DecodeError::Io {
                name: self.name.clone(),
                source,
            })?;
        let img = reader.decode().map_err(|source| DecodeError::Format {
            name: self.name.clone(),
            source,
        })?;
        non_empty(self.name.clone(), img)
    }
}

impl ImageSource for DynamicImage {
    fn describe(&self) -> String {
        let (width, height) = self.dimensions();
        format!("{}x{} raster", width, height)
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        non_empty(self.describe(), self.clone())
    }
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        (**self).decode()
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn decode(&self) -> Result<DynamicImage, DecodeError> {
        (**self).decode()
    }
}

fn non_empty(name: String, img: DynamicImage) -> Result<DynamicImage, DecodeError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyRaster {
            name,
            width,
            height,
        });
    }
    Ok(img)
}
