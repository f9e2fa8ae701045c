//! Writing finished documents.
//!
//! Saving to a path goes through a temporary file in the destination
//! directory that is renamed into place only once every byte is on disk, so
//! a failed save never leaves a truncated PDF behind.

use crate::composer::{ComposeError, ComposedPdf};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes `pdf` to `writer` and flushes it.
pub fn write_pdf<W: Write>(pdf: &ComposedPdf, mut writer: W) -> Result<(), ComposeError> {
    writer
        .write_all(pdf.bytes())
        .and_then(|_| writer.flush())
        .map_err(|source| ComposeError::Write {
            destination: "output stream".to_string(),
            source,
        })
}

/// Atomically saves `pdf` at `path`, replacing any existing file.
pub fn save_pdf(pdf: &ComposedPdf, path: &Path) -> Result<(), ComposeError> {
    let write_error = |source: io::Error| ComposeError::Write {
        destination: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Dropping the temp file on any early return deletes it.
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(pdf.bytes()).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;

    debug!(path = %path.display(), bytes = pdf.bytes().len(), "saved PDF");
    Ok(())
}

/// Appends a `.pdf` extension unless the name already ends in one.
pub fn ensure_pdf_extension(path: &Path) -> PathBuf {
    let has_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if has_pdf {
        return path.to_path_buf();
    }

    let mut name = path.as_os_str().to_os_string();
    name.push(".pdf");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PageComposer;
    use image::{DynamicImage, RgbImage};

    fn small_pdf() -> ComposedPdf {
        PageComposer::new()
            .compose(&[DynamicImage::ImageRgb8(RgbImage::new(4, 4))])
            .unwrap()
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_pdf_to_buffer() {
        let pdf = small_pdf();
        let mut buf = Vec::new();
        write_pdf(&pdf, &mut buf).unwrap();
        assert_eq!(buf, pdf.bytes());
    }

    #[test]
    fn test_write_pdf_broken_sink() {
        let result = write_pdf(&small_pdf(), BrokenWriter);
        assert!(matches!(result, Err(ComposeError::Write { .. })));
    }

    #[test]
    fn test_save_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let pdf = small_pdf();

        save_pdf(&pdf, &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), pdf.bytes());
        // Only the final file remains.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_pdf_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"old").unwrap();

        let pdf = small_pdf();
        save_pdf(&pdf, &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), pdf.bytes());
    }

    #[test]
    fn test_save_pdf_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");

        let result = save_pdf(&small_pdf(), &path);
        assert!(matches!(result, Err(ComposeError::Write { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_ensure_pdf_extension() {
        assert_eq!(
            ensure_pdf_extension(Path::new("holiday")),
            PathBuf::from("holiday.pdf")
        );
        assert_eq!(
            ensure_pdf_extension(Path::new("dir/scan.PDF")),
            PathBuf::from("dir/scan.PDF")
        );
        assert_eq!(
            ensure_pdf_extension(Path::new("report.v2")),
            PathBuf::from("report.v2.pdf")
        );
    }
}
