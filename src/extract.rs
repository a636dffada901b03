//! Per-page PDF extraction.
//!
//! Uses pdfium-render as the primary backend: accurate per-page text plus a
//! rasterized PNG of the page for OCR. Falls back to pdf-extract (text only,
//! no images) when the pdfium library cannot be located.
//!
//! Every call opens the document, reads one page, and drops the handle on
//! exit, so no file handle outlives the call on any path.

use crate::error::{IndexError, Result};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

/// Rendered width of page images sent to the vision model, in pixels.
const RENDER_TARGET_WIDTH: i32 = 1200;

/// Text and/or image content of a single page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Raw page text, possibly empty (e.g. scanned pages).
    pub text: String,
    /// PNG-encoded rasterization of the page, when rendering is available.
    pub image_png: Option<Vec<u8>>,
}

/// Source of page content for the index builder.
pub trait PageSource: Send + Sync {
    /// Total page count of the document.
    fn page_count(&self, path: &Path) -> Result<usize>;

    /// Extract one page. `page_index` is 0-based and must be within
    /// `[0, page_count)`.
    fn extract_page(&self, path: &Path, page_index: usize) -> Result<ExtractedPage>;
}

/// Cached path to the pdfium library directory (found once, reused).
static PDFIUM_LIB_DIR: OnceLock<Option<String>> = OnceLock::new();

fn find_pdfium_library_dir() -> Option<&'static str> {
    PDFIUM_LIB_DIR
        .get_or_init(|| {
            let lib_dirs = [
                "./libs/pdfium/lib",
                ".",
                "/usr/local/lib",
                "/usr/lib",
                "/opt/homebrew/lib",
            ];

            for dir in lib_dirs {
                let lib_path =
                    Path::new(dir).join(Pdfium::pdfium_platform_library_name());
                if lib_path.exists() {
                    tracing::debug!(dir, "found pdfium library");
                    return Some(dir.to_string());
                }
            }

            None
        })
        .as_deref()
}

/// Create a new Pdfium instance (binds to the library each call).
fn create_pdfium() -> Option<Pdfium> {
    if let Some(dir) = find_pdfium_library_dir() {
        if let Ok(bindings) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        {
            return Some(Pdfium::new(bindings));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Some(Pdfium::new(bindings)),
        Err(_) => {
            tracing::debug!("pdfium unavailable, using pdf-extract text fallback");
            None
        }
    }
}

/// Default [`PageSource`] backed by pdfium-render with pdf-extract fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumExtractor;

impl PageSource for PdfiumExtractor {
    fn page_count(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Err(IndexError::unreadable(path, "file does not exist"));
        }

        match create_pdfium() {
            Some(pdfium) => {
                let document = pdfium
                    .load_pdf_from_file(path, None)
                    .map_err(|e| IndexError::unreadable(path, format!("{:?}", e)))?;
                Ok(document.pages().len() as usize)
            }
            None => Ok(fallback_page_texts(path)?.len()),
        }
    }

    fn extract_page(&self, path: &Path, page_index: usize) -> Result<ExtractedPage> {
        if !path.exists() {
            return Err(IndexError::unreadable(path, "file does not exist"));
        }

        match create_pdfium() {
            Some(pdfium) => extract_with_pdfium(&pdfium, path, page_index),
            None => {
                let pages = fallback_page_texts(path)?;
                if page_index >= pages.len() {
                    return Err(IndexError::PageOutOfRange {
                        page: page_index,
                        total: pages.len(),
                    });
                }
                Ok(ExtractedPage {
                    text: pages[page_index].clone(),
                    image_png: None,
                })
            }
        }
    }
}

fn extract_with_pdfium(pdfium: &Pdfium, path: &Path, page_index: usize) -> Result<ExtractedPage> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| IndexError::unreadable(path, format!("{:?}", e)))?;

    let total = document.pages().len() as usize;
    if page_index >= total {
        return Err(IndexError::PageOutOfRange {
            page: page_index,
            total,
        });
    }

    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| IndexError::unreadable(path, format!("{:?}", e)))?;

    let text = page
        .text()
        .map(|t| t.all())
        .unwrap_or_default();

    // Rendering can fail independently of text extraction (e.g. broken
    // embedded fonts); a page without an image is still indexable.
    let image_png = render_page_png(&page);

    Ok(ExtractedPage { text, image_png })
}

fn render_page_png(page: &PdfPage) -> Option<Vec<u8>> {
    let config = PdfRenderConfig::new().set_target_width(RENDER_TARGET_WIDTH);
    let bitmap = page.render_with_config(&config).ok()?;
    let image = bitmap.as_image();

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .ok()?;
    Some(bytes)
}

/// Whole-document text extraction via pdf-extract, split on form feeds.
fn fallback_page_texts(path: &Path) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| IndexError::unreadable(path, e.to_string()))?;

    // Split always yields at least one chunk, so even an empty document
    // comes back as a single blank page rather than zero pages.
    Ok(text
        .split('\u{000C}')
        .map(|page_text| page_text.trim().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_page_count_missing_file() {
        let result = PdfiumExtractor.page_count(Path::new("/nonexistent/file.pdf"));
        assert!(matches!(
            result,
            Err(IndexError::DocumentUnreadable { .. })
        ));
    }

    #[test]
    fn test_extract_page_missing_file() {
        let result = PdfiumExtractor.extract_page(Path::new("/nonexistent/file.pdf"), 0);
        assert!(matches!(
            result,
            Err(IndexError::DocumentUnreadable { .. })
        ));
    }

    #[test]
    fn test_page_count_invalid_pdf() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"This is not a valid PDF").unwrap();
        temp_file.flush().unwrap();

        let result = PdfiumExtractor.page_count(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_extracted_page_default_has_no_image() {
        let page = ExtractedPage::default();
        assert!(page.text.is_empty());
        assert!(page.image_png.is_none());
    }
}
