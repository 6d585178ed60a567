//! Derived-data observations: rendered PDF pages and recognized text.
//!
//! The recognition and rendering engines are supplied by the caller through
//! [`OcrEngine`] and [`PageRenderer`]. The store's side of the contract is
//! fixed: page images go into the object store, results are written once
//! as sibling documents of the manifest, and each document is announced by
//! one event.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fdl_store::{canonical, ObjectStore};
use fdl_types::{
    EngineInfo, EventType, OcrDocument, OcrObserved, OcrPage, PageImage, PdfPage,
    PdfPagesDocument, ReceiptId, Timestamp,
};
use tracing::debug;

use crate::error::{SdkError, SdkResult};
use crate::vault::ReceiptVault;

/// Recognition language used when none is given.
pub const DEFAULT_LANG: &str = "por";
/// Engine name recorded for precomputed text.
pub const DEFAULT_OCR_ENGINE: &str = "tesseract";
/// Separator placed between page texts of a multi-page receipt.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";
/// Image extensions that can be recognized directly.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

const PDF_MEDIA_TYPE: &str = "application/pdf";
const PAGE_MEDIA_TYPE: &str = "image/png";

/// Optical character recognition over a single image file.
pub trait OcrEngine {
    fn name(&self) -> &str;
    fn version(&self) -> String;
    fn recognize(&self, image: &Path, lang: &str) -> SdkResult<String>;
}

/// Renders every page of a PDF to PNG bytes, in page order.
pub trait PageRenderer {
    fn name(&self) -> &str;
    fn version(&self) -> String;
    fn render(&self, pdf: &Path) -> SdkResult<Vec<Vec<u8>>>;
}

/// Where recognized text comes from.
pub enum OcrSource<'a> {
    /// Run the engine on the input object.
    Engine(&'a dyn OcrEngine),
    /// Text recognized elsewhere. `engine_version` is required.
    Precomputed {
        text: String,
        engine_version: Option<String>,
    },
}

/// Optional settings for [`ReceiptVault::write_ocr_observed`].
#[derive(Clone, Debug)]
pub struct OcrOptions {
    pub lang: String,
    pub pages: Option<Vec<OcrPage>>,
    pub created_at: Option<Timestamp>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            pages: None,
            created_at: None,
        }
    }
}

/// Result of a once-only observation write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationWrite {
    pub path: PathBuf,
    /// `false` when the document already existed and nothing was done.
    pub created: bool,
}

/// What [`ReceiptVault::observe_receipt`] produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObserveOutcome {
    pub ocr: ObservationWrite,
    /// Present for PDF receipts.
    pub pdf_pages: Option<ObservationWrite>,
}

impl ReceiptVault {
    /// Render a PDF object's pages, store each image and record the result
    /// in `observations/pdf_pages.v1.json`.
    ///
    /// If the document is present it is left alone; only its event is
    /// appended, which the log ignores when already recorded.
    pub fn write_pdf_pages_observed(
        &self,
        receipt_id: &ReceiptId,
        pdf_object: &Path,
        renderer: &dyn PageRenderer,
        created_at: Option<Timestamp>,
    ) -> SdkResult<ObservationWrite> {
        let path = self.layout().pdf_pages_path(receipt_id);
        if path.exists() {
            debug!(receipt_id = %receipt_id, "pdf pages already observed");
            return self.already_observed(
                receipt_id,
                EventType::pdf_pages_observed(),
                "pdf_pages_path",
                path,
            );
        }

        let images = renderer.render(pdf_object)?;
        let mut pages = Vec::with_capacity(images.len());
        for (idx, bytes) in images.iter().enumerate() {
            let put = self.objects().put_bytes(bytes, Some(".png"))?;
            pages.push(PdfPage {
                page: page_number(idx),
                image: PageImage {
                    sha256: put.digest,
                    object_path: self.layout().to_ref(&put.path),
                    media_type: PAGE_MEDIA_TYPE.to_string(),
                    byte_size: bytes.len() as u64,
                },
            });
        }

        let document = PdfPagesDocument::new(
            receipt_id.clone(),
            created_at.unwrap_or_else(Timestamp::now),
            self.layout().to_ref(pdf_object),
            EngineInfo {
                name: renderer.name().to_string(),
                version: renderer.version(),
                lang: None,
            },
            pages,
        );
        let created = canonical::write_document_new(&path, &document, self.config().sync_mode)?;
        self.record_observation(
            receipt_id,
            EventType::pdf_pages_observed(),
            "pdf_pages_path",
            &path,
        )?;
        Ok(ObservationWrite { path, created })
    }

    /// Record recognized text for an object in `observations/ocr.v1.json`.
    ///
    /// If the document is present it is left alone; only its event is
    /// appended, which the log ignores when already recorded.
    /// Precomputed text without an engine version is rejected with
    /// [`SdkError::InvalidInput`].
    pub fn write_ocr_observed(
        &self,
        receipt_id: &ReceiptId,
        object: &Path,
        source: OcrSource<'_>,
        options: OcrOptions,
    ) -> SdkResult<ObservationWrite> {
        let path = self.layout().ocr_path(receipt_id);
        if path.exists() {
            debug!(receipt_id = %receipt_id, "ocr already observed");
            return self.already_observed(receipt_id, EventType::ocr_observed(), "ocr_path", path);
        }

        let recognized = match source {
            OcrSource::Engine(engine) => Recognized {
                text: engine.recognize(object, &options.lang)?,
                engine: engine.name().to_string(),
                version: engine.version(),
            },
            OcrSource::Precomputed {
                text,
                engine_version,
            } => {
                let version = engine_version.ok_or_else(|| {
                    SdkError::InvalidInput(
                        "engine_version is required when text is provided".to_string(),
                    )
                })?;
                Recognized {
                    text,
                    engine: DEFAULT_OCR_ENGINE.to_string(),
                    version,
                }
            }
        };
        self.store_ocr(receipt_id, object, recognized, options)
    }

    /// Run OCR for a stored receipt.
    ///
    /// PDFs are rendered with `renderer` and each page is recognized; the
    /// page texts are joined with [`PAGE_SEPARATOR`]. Images with a
    /// supported extension are recognized directly. Anything else is
    /// [`SdkError::UnsupportedMedia`].
    pub fn observe_receipt(
        &self,
        receipt_id: &ReceiptId,
        engine: &dyn OcrEngine,
        renderer: Option<&dyn PageRenderer>,
        lang: &str,
    ) -> SdkResult<ObserveOutcome> {
        let manifest = self
            .manifests()
            .read(receipt_id)?
            .ok_or_else(|| SdkError::ReceiptNotFound(receipt_id.to_string()))?;
        let object = self.layout().resolve(&manifest.content.object_path);
        let media_type = manifest.source.media_type.clone();
        let options = OcrOptions {
            lang: lang.to_string(),
            ..OcrOptions::default()
        };

        let is_pdf = media_type.as_deref() == Some(PDF_MEDIA_TYPE);
        match (is_pdf, renderer) {
            (true, Some(renderer)) => {
                let pages_write =
                    self.write_pdf_pages_observed(receipt_id, &object, renderer, None)?;
                let ocr_path = self.layout().ocr_path(receipt_id);
                let ocr = if ocr_path.exists() {
                    self.already_observed(receipt_id, EventType::ocr_observed(), "ocr_path", ocr_path)?
                } else {
                    let (text, pages) = self.recognize_pages(&pages_write.path, engine, lang)?;
                    self.store_ocr(
                        receipt_id,
                        &object,
                        Recognized {
                            text,
                            engine: engine.name().to_string(),
                            version: engine.version(),
                        },
                        OcrOptions {
                            pages: Some(pages),
                            ..options
                        },
                    )?
                };
                Ok(ObserveOutcome {
                    ocr,
                    pdf_pages: Some(pages_write),
                })
            }
            _ if !is_pdf && has_image_extension(&manifest.source.original_filename) => {
                let ocr =
                    self.write_ocr_observed(receipt_id, &object, OcrSource::Engine(engine), options)?;
                Ok(ObserveOutcome {
                    ocr,
                    pdf_pages: None,
                })
            }
            _ => Err(SdkError::UnsupportedMedia {
                receipt_id: receipt_id.to_string(),
                media_type,
            }),
        }
    }

    /// Recognize every page listed in a pdf_pages document.
    fn recognize_pages(
        &self,
        pages_doc: &Path,
        engine: &dyn OcrEngine,
        lang: &str,
    ) -> SdkResult<(String, Vec<OcrPage>)> {
        let document: PdfPagesDocument = serde_json::from_str(&fs::read_to_string(pages_doc)?)?;
        let mut pages = Vec::with_capacity(document.observed.pages.len());
        for page in &document.observed.pages {
            let image = self.layout().resolve(&page.image.object_path);
            pages.push(OcrPage {
                page: page.page,
                object_path: page.image.object_path.clone(),
                text: engine.recognize(&image, lang)?,
            });
        }
        let text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);
        Ok((text, pages))
    }

    fn store_ocr(
        &self,
        receipt_id: &ReceiptId,
        object: &Path,
        recognized: Recognized,
        options: OcrOptions,
    ) -> SdkResult<ObservationWrite> {
        let path = self.layout().ocr_path(receipt_id);
        let document = OcrDocument::new(
            receipt_id.clone(),
            options.created_at.unwrap_or_else(Timestamp::now),
            self.layout().to_ref(object),
            EngineInfo {
                name: recognized.engine,
                version: recognized.version,
                lang: Some(options.lang),
            },
            OcrObserved {
                text: recognized.text,
                pages: options.pages,
            },
        );
        let created = canonical::write_document_new(&path, &document, self.config().sync_mode)?;
        self.record_observation(receipt_id, EventType::ocr_observed(), "ocr_path", &path)?;
        Ok(ObservationWrite { path, created })
    }

    /// The document is already on disk. Its event may still be missing if
    /// an earlier writer stopped between the rename and the append.
    fn already_observed(
        &self,
        receipt_id: &ReceiptId,
        event_type: EventType,
        ref_name: &str,
        path: PathBuf,
    ) -> SdkResult<ObservationWrite> {
        self.record_observation(receipt_id, event_type, ref_name, &path)?;
        Ok(ObservationWrite {
            path,
            created: false,
        })
    }

    fn record_observation(
        &self,
        receipt_id: &ReceiptId,
        event_type: EventType,
        ref_name: &str,
        document: &Path,
    ) -> SdkResult<bool> {
        let refs = BTreeMap::from([(ref_name.to_string(), self.layout().to_ref(document))]);
        Ok(self.events().append(receipt_id, &event_type, refs, None)?)
    }
}

/// Text plus the engine that produced it.
struct Recognized {
    text: String,
    engine: String,
    version: String,
}

fn page_number(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

fn has_image_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
