//! Document decode capability for leafthrough.
//!
//! Everything that knows how to turn a PDF source into page rasters lives
//! behind the [`PdfDecoder`] trait. The default backend is pure Rust
//! (`lopdf`): it reads real page geometry from the document but renders
//! placeholder rasters. Enabling the `pdfium` feature swaps in a backend
//! that rasterizes actual page content through the system pdfium library.

use image::{ImageBuffer, Rgba};
use std::collections::HashMap;

mod fetch;
#[cfg(feature = "pdfium")]
pub mod pdfium_backend;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_pdf;

pub use fetch::fetch_document;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Opaque handle to an opened document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Native page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// A single page render request. `scale` multiplies the native page size
/// to obtain the output raster dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

/// Where a document comes from: raw bytes handed to us by the caller, or
/// a remote URL fetched at open time. Transient; consumed by one load.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Bytes(Vec<u8>),
    Url(String),
}

impl DocumentSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// The decode capability consumed by the rasterizer.
pub trait PdfDecoder {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, DecodeError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, DecodeError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, DecodeError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, DecodeError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), DecodeError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

/// Default pure-Rust backend.
///
/// Page sizes come from each page's MediaBox; rasters are white pages with
/// a hairline border at the exact requested dimensions. Good enough for
/// layout, sizing, and tests without a native pdfium library.
#[derive(Debug, Default)]
pub struct LopdfDecoder {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, DecodeError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(DecodeError::EncryptedUnsupported);
        }

        let doc = lopdf::Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                // US Letter when the page carries no MediaBox
                .unwrap_or(PageSize { width_pt: 612.0, height_pt: 792.0 });

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(DecodeError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, DecodeError> {
        self.docs.get(&handle).ok_or(DecodeError::InvalidHandle(handle.raw()))
    }
}

impl PdfDecoder for LopdfDecoder {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, DecodeError> {
        let bytes = match source {
            DocumentSource::Bytes(bytes) => bytes,
            DocumentSource::Url(url) => fetch_document(&url)?,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, DocumentRecord { page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, DecodeError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, DecodeError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(DecodeError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, DecodeError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), DecodeError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(DecodeError::InvalidHandle(handle.raw()))
    }
}

/// Build the best decoder available in this build.
///
/// With the `pdfium` feature, tries the system pdfium library first and
/// falls back to the pure-Rust backend when it cannot be bound.
pub fn default_decoder() -> Box<dyn PdfDecoder> {
    #[cfg(feature = "pdfium")]
    {
        match pdfium_backend::PdfiumDecoder::from_system_library() {
            Ok(decoder) => return Box::new(decoder),
            Err(err) => {
                log::warn!("pdfium unavailable, using built-in backend: {err}");
            }
        }
    }

    Box::new(LopdfDecoder::new())
}
