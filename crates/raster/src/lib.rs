//! Document Rasterizer.
//!
//! Turns a PDF source into an ordered sequence of JPEG page images, all
//! at the same pixel width, with progress notifications before each page
//! and cooperative cancellation between pages. The PDF itself is decoded
//! through the [`PdfDecoder`] seam from `leafthrough-engine`.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use leafthrough_engine::{
    DecodeError, DocumentHandle, DocumentSource, PdfDecoder, RenderRequest, RgbaImage,
};
use std::sync::Arc;

mod cancel;

pub use cancel::CancelToken;

/// Output images never exceed this width regardless of the viewport.
pub const MAX_TARGET_WIDTH: f32 = 1400.0;

/// Share of the stage width a page image is rendered at.
pub const STAGE_WIDTH_FRACTION: f32 = 0.95;

/// JPEG quality for encoded pages.
pub const JPEG_QUALITY: u8 = 90;

/// Viewport-derived target width for page images: 95% of the stage,
/// capped at [`MAX_TARGET_WIDTH`].
pub fn target_page_width(stage_width: f32) -> f32 {
    (stage_width * STAGE_WIDTH_FRACTION).min(MAX_TARGET_WIDTH)
}

/// One rendered page: JPEG bytes plus pixel dimensions. Immutable once
/// produced; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct PageImage {
    jpeg: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl PageImage {
    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn encode(raster: RgbaImage) -> Result<Self, RasterizeError> {
        let (width, height) = raster.dimensions();

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(raster).to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|err| RasterizeError::Encode(err.to_string()))?;

        Ok(Self { jpeg: jpeg.into(), width, height })
    }
}

/// A progress notification emitted during rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Completion fraction in `0.0..=1.0`.
    pub fraction: f32,
    /// Human-readable status line.
    pub message: String,
}

/// Progress callback invoked before each page render and once at the end.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("invalid document source: {0}")]
    InvalidSource(&'static str),
    #[error("target width must be positive (got {0})")]
    InvalidTargetWidth(f32),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("JPEG encoding failed: {0}")]
    Encode(String),
    #[error("document has no pages")]
    EmptyDocument,
    #[error("rasterization was cancelled")]
    Cancelled,
}

/// Rasterize every page of `source` at a common pixel width.
///
/// Pages are rendered in document order; each page's scale is
/// `target_width_hint / native_page_width`, so all output images share
/// the same (rounded) width while height follows the page's aspect ratio.
/// Before page `i` (1-based) a progress update with fraction `i / (N+1)`
/// is emitted, and a final update at 1.0 announces flipbook preparation.
///
/// On any failure no partial sequence is returned.
pub fn rasterize(
    decoder: &mut dyn PdfDecoder,
    source: DocumentSource,
    target_width_hint: f32,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> Result<Vec<PageImage>, RasterizeError> {
    validate_source(&source)?;
    if !(target_width_hint > 0.0) {
        return Err(RasterizeError::InvalidTargetWidth(target_width_hint));
    }

    let handle = decoder.open(source)?;
    let result = rasterize_pages(decoder, handle, target_width_hint, progress, cancel);
    // The handle is released regardless of how the render loop ended.
    let _ = decoder.close(handle);
    result
}

fn validate_source(source: &DocumentSource) -> Result<(), RasterizeError> {
    match source {
        DocumentSource::Bytes(bytes) if bytes.is_empty() => {
            Err(RasterizeError::InvalidSource("document bytes are empty"))
        }
        DocumentSource::Url(url) if url.trim().is_empty() => {
            Err(RasterizeError::InvalidSource("URL is empty"))
        }
        DocumentSource::Url(url)
            if !(url.starts_with("http://") || url.starts_with("https://")) =>
        {
            Err(RasterizeError::InvalidSource("URL must start with http:// or https://"))
        }
        _ => Ok(()),
    }
}

fn rasterize_pages(
    decoder: &mut dyn PdfDecoder,
    handle: DocumentHandle,
    target_width_hint: f32,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> Result<Vec<PageImage>, RasterizeError> {
    let page_count = decoder.page_count(handle)?;
    if page_count == 0 {
        return Err(RasterizeError::EmptyDocument);
    }

    let notify = |fraction: f32, message: String| {
        if let Some(ref callback) = progress {
            callback(Progress { fraction, message });
        }
    };

    let mut images = Vec::with_capacity(page_count as usize);

    for index in 0..page_count {
        if cancel.is_cancelled() {
            return Err(RasterizeError::Cancelled);
        }

        notify(
            (index + 1) as f32 / (page_count + 1) as f32,
            format!("Rendering page {} of {}…", index + 1, page_count),
        );

        let size = decoder.page_size(handle, index)?;
        let scale = target_width_hint / size.width_pt;
        let raster = decoder.render_page(handle, RenderRequest { page_index: index, scale })?;

        images.push(PageImage::encode(raster)?);
    }

    notify(1.0, "Preparing flipbook…".to_owned());

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafthrough_engine::{LopdfDecoder, PageSize};
    use std::sync::Mutex;

    fn collect_progress() -> (ProgressCallback, Arc<Mutex<Vec<Progress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback =
            Arc::new(move |progress| sink.lock().unwrap().push(progress));
        (callback, seen)
    }

    #[test]
    fn target_width_uses_95_percent_of_stage() {
        assert_eq!(target_page_width(1000.0), 950.0);
    }

    #[test]
    fn target_width_is_capped() {
        assert_eq!(target_page_width(2000.0), 1400.0);
    }

    #[test]
    fn five_page_document_rasterizes_at_uniform_width() {
        // 5 pages of 600x800 pt with a 1000 px stage: target width 950,
        // heights follow the 4:3 aspect ratio (round(800 * 950 / 600)).
        let bytes = leafthrough_engine::test_pdf::synthetic_pdf(5, 600.0, 800.0);
        let mut decoder = LopdfDecoder::new();

        let images = rasterize(
            &mut decoder,
            DocumentSource::Bytes(bytes),
            target_page_width(1000.0),
            None,
            &CancelToken::new(),
        )
        .expect("rasterize should succeed");

        assert_eq!(images.len(), 5);
        for image in &images {
            assert_eq!(image.width(), 950);
            assert_eq!(image.height(), 1267);
            // JPEG SOI marker
            assert_eq!(&image.jpeg_bytes()[..2], &[0xFF, 0xD8]);
        }
    }

    #[test]
    fn progress_is_emitted_before_each_page_and_once_at_the_end() {
        let bytes = leafthrough_engine::test_pdf::synthetic_pdf(3, 600.0, 800.0);
        let mut decoder = LopdfDecoder::new();
        let (callback, seen) = collect_progress();

        rasterize(
            &mut decoder,
            DocumentSource::Bytes(bytes),
            950.0,
            Some(callback),
            &CancelToken::new(),
        )
        .expect("rasterize should succeed");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].fraction, 1.0 / 4.0);
        assert_eq!(seen[0].message, "Rendering page 1 of 3…");
        assert_eq!(seen[2].fraction, 3.0 / 4.0);
        assert_eq!(seen[3].fraction, 1.0);
        assert_eq!(seen[3].message, "Preparing flipbook…");
    }

    #[test]
    fn empty_bytes_are_rejected_before_decoding() {
        let mut decoder = LopdfDecoder::new();
        let err = rasterize(
            &mut decoder,
            DocumentSource::Bytes(Vec::new()),
            950.0,
            None,
            &CancelToken::new(),
        )
        .expect_err("empty bytes should fail");

        assert!(matches!(err, RasterizeError::InvalidSource(_)));
    }

    #[test]
    fn blank_and_malformed_urls_are_rejected() {
        let mut decoder = LopdfDecoder::new();

        let err = rasterize(
            &mut decoder,
            DocumentSource::Url("   ".to_owned()),
            950.0,
            None,
            &CancelToken::new(),
        )
        .expect_err("blank URL should fail");
        assert!(matches!(err, RasterizeError::InvalidSource(_)));

        let err = rasterize(
            &mut decoder,
            DocumentSource::url("ftp://example.com/book.pdf"),
            950.0,
            None,
            &CancelToken::new(),
        )
        .expect_err("non-http URL should fail");
        assert!(matches!(err, RasterizeError::InvalidSource(_)));
    }

    #[test]
    fn corrupt_bytes_fail_with_no_partial_output() {
        let mut decoder = LopdfDecoder::new();
        let (callback, seen) = collect_progress();

        let err = rasterize(
            &mut decoder,
            DocumentSource::Bytes(b"%PDF-garbage".to_vec()),
            950.0,
            Some(callback),
            &CancelToken::new(),
        )
        .expect_err("corrupt bytes should fail");

        assert!(matches!(err, RasterizeError::Decode(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn non_positive_target_width_is_rejected() {
        let bytes = leafthrough_engine::test_pdf::synthetic_pdf(1, 600.0, 800.0);
        let mut decoder = LopdfDecoder::new();

        let err = rasterize(
            &mut decoder,
            DocumentSource::Bytes(bytes),
            0.0,
            None,
            &CancelToken::new(),
        )
        .expect_err("zero target width should fail");

        assert!(matches!(err, RasterizeError::InvalidTargetWidth(_)));
    }

    #[test]
    fn cancelled_token_aborts_before_any_page() {
        let bytes = leafthrough_engine::test_pdf::synthetic_pdf(4, 600.0, 800.0);
        let mut decoder = LopdfDecoder::new();
        let token = CancelToken::new();
        token.cancel();

        let err = rasterize(&mut decoder, DocumentSource::Bytes(bytes), 950.0, None, &token)
            .expect_err("cancelled load should fail");

        assert!(matches!(err, RasterizeError::Cancelled));
    }

    /// Decoder stub exercising the seam without lopdf: reports pages but
    /// renders nothing, letting tests drive page counts directly.
    struct StubDecoder {
        pages: Vec<PageSize>,
    }

    impl PdfDecoder for StubDecoder {
        fn open(&mut self, _source: DocumentSource) -> Result<DocumentHandle, DecodeError> {
            Ok(DocumentHandle::default())
        }

        fn page_count(&self, _handle: DocumentHandle) -> Result<u32, DecodeError> {
            Ok(self.pages.len() as u32)
        }

        fn page_size(
            &self,
            _handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, DecodeError> {
            self.pages.get(page_index as usize).copied().ok_or(DecodeError::PageOutOfRange {
                page: page_index,
                page_count: self.pages.len() as u32,
            })
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, DecodeError> {
            let size = self.page_size(handle, request.page_index)?;
            let width = (size.width_pt * request.scale).round().max(1.0) as u32;
            let height = (size.height_pt * request.scale).round().max(1.0) as u32;
            Ok(RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255])))
        }

        fn close(&mut self, _handle: DocumentHandle) -> Result<(), DecodeError> {
            Ok(())
        }
    }

    #[test]
    fn zero_page_document_is_an_error() {
        let mut decoder = StubDecoder { pages: Vec::new() };

        let err = rasterize(
            &mut decoder,
            DocumentSource::Bytes(b"stub".to_vec()),
            950.0,
            None,
            &CancelToken::new(),
        )
        .expect_err("zero pages should fail");

        assert!(matches!(err, RasterizeError::EmptyDocument));
    }

    #[test]
    fn mixed_page_sizes_still_share_one_width() {
        let mut decoder = StubDecoder {
            pages: vec![
                PageSize { width_pt: 600.0, height_pt: 800.0 },
                PageSize { width_pt: 300.0, height_pt: 500.0 },
                PageSize { width_pt: 1200.0, height_pt: 900.0 },
            ],
        };

        let images = rasterize(
            &mut decoder,
            DocumentSource::Bytes(b"stub".to_vec()),
            950.0,
            None,
            &CancelToken::new(),
        )
        .expect("rasterize should succeed");

        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|image| image.width() == 950));
    }
}
