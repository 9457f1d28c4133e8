//! pdfium-backed decoder.
//!
//! Binds the pdfium library at runtime (executable directory first, then
//! the working directory, then the system library path) and renders real
//! page content. Documents are kept alive for the duration of the handle
//! by leaking the pdfium instance and the source bytes, which is the cost
//! of pdfium's borrow-based document lifetimes.

use crate::{
    fetch_document, DecodeError, DocumentHandle, DocumentSource, PageSize, PdfDecoder,
    RenderRequest, RgbaImage,
};
use pdfium_render::prelude::*;
use std::collections::HashMap;

pub struct PdfiumDecoder {
    pdfium: &'static Pdfium,
    next_handle: u64,
    docs: HashMap<DocumentHandle, PdfDocument<'static>>,
}

impl PdfiumDecoder {
    /// Bind pdfium, preferring a library shipped next to the executable.
    pub fn from_system_library() -> Result<Self, DecodeError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));

        if let Some(ref dir) = exe_dir {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            {
                return Ok(Self::with_bindings(bindings));
            }
        }

        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|err| {
                    DecodeError::Backend(format!("failed to bind pdfium library: {err}"))
                })?;

        Ok(Self::with_bindings(bindings))
    }

    fn with_bindings(bindings: Box<dyn PdfiumLibraryBindings>) -> Self {
        Self {
            pdfium: Box::leak(Box::new(Pdfium::new(bindings))),
            next_handle: 0,
            docs: HashMap::new(),
        }
    }

    fn document(&self, handle: DocumentHandle) -> Result<&PdfDocument<'static>, DecodeError> {
        self.docs.get(&handle).ok_or(DecodeError::InvalidHandle(handle.raw()))
    }

    fn page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PdfPage<'_>, DecodeError> {
        let document = self.document(handle)?;
        let page_count = document.pages().len() as u32;
        document
            .pages()
            .get(page_index as u16)
            .map_err(|_| DecodeError::PageOutOfRange { page: page_index, page_count })
    }
}

impl PdfDecoder for PdfiumDecoder {
    fn open(&mut self, source: DocumentSource) -> Result<DocumentHandle, DecodeError> {
        let bytes = match source {
            DocumentSource::Bytes(bytes) => bytes,
            DocumentSource::Url(url) => fetch_document(&url)?,
        };

        // pdfium borrows the byte slice for the document's lifetime.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|err| DecodeError::Backend(format!("PDF load error: {err}")))?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, document);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, DecodeError> {
        Ok(self.document(handle)?.pages().len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, DecodeError> {
        let page = self.page(handle, page_index)?;
        Ok(PageSize { width_pt: page.width().value, height_pt: page.height().value })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, DecodeError> {
        let page = self.page(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };

        let width = (page.width().value * scale).round().max(1.0) as i32;
        let height = (page.height().value * scale).round().max(1.0) as i32;

        let config = PdfRenderConfig::new().set_target_width(width).set_target_height(height);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|err| DecodeError::Backend(format!("PDF render error: {err}")))?;

        RgbaImage::from_raw(width as u32, height as u32, bitmap.as_rgba_bytes().to_vec())
            .ok_or_else(|| DecodeError::Backend("unexpected raster dimensions".to_owned()))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), DecodeError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(DecodeError::InvalidHandle(handle.raw()))
    }
}
