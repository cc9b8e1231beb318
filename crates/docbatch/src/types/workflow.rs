//! Workflow definitions: ordered remote operations applied to every file

use serde::{Deserialize, Serialize};

/// PDF conformance level requested from the remote service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfVersion {
    /// Keep whatever version the input already has
    RetainExisting,
    #[serde(rename = "PDF14")]
    Pdf14,
    #[default]
    #[serde(rename = "PDF15")]
    Pdf15,
    #[serde(rename = "PDF16")]
    Pdf16,
    #[serde(rename = "PDF17")]
    Pdf17,
}

impl PdfVersion {
    /// Conformance string sent with a load request.
    ///
    /// The load endpoint has no notion of "retain", so it falls back to PDF 1.5.
    pub fn load_conformance(self) -> &'static str {
        match self {
            PdfVersion::Pdf14 => "PDF14",
            PdfVersion::Pdf16 => "PDF16",
            PdfVersion::Pdf17 => "PDF17",
            PdfVersion::Pdf15 | PdfVersion::RetainExisting => "PDF15",
        }
    }
}

/// Image quality trade-off for recompression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageQuality {
    Low,
    #[default]
    Medium,
    High,
}

/// Compression used for color images when converting an image to PDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorImageCompression {
    #[default]
    Jpeg,
    Jpeg2000,
}

/// Compression used for bitonal images when converting an image to PDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitonalImageCompression {
    Ccitt,
    #[default]
    Jbig2,
}

/// Size-reduction action configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    pub output_version: PdfVersion,
    pub image_quality: ImageQuality,
    pub recompress_images: bool,
    pub enable_color_detection: bool,
    pub pack_document: bool,
    pub pack_fonts: bool,
    pub downscale_images: bool,
    /// Target resolution in DPI when downscaling
    pub downscale_resolution: u32,
    /// Linearize the output (fast web view)
    pub fast_web_view: bool,
    pub remove_annotations: bool,
    pub remove_bookmarks: bool,
    pub remove_embedded_files: bool,
    pub remove_form_fields: bool,
    pub remove_hyperlinks: bool,
    pub remove_javascript: bool,
    pub remove_metadata: bool,
    pub remove_page_thumbnails: bool,
    pub remove_page_piece_info: bool,
    pub enable_jpeg2000: bool,
    pub enable_jbig2: bool,
    pub enable_char_repair: bool,
    pub enable_mrc: bool,
    pub mrc_preserve_smoothing: bool,
    pub mrc_downscale_resolution: u32,
    pub jbig2_pms_threshold: f32,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            output_version: PdfVersion::Pdf15,
            image_quality: ImageQuality::Medium,
            recompress_images: true,
            enable_color_detection: true,
            pack_document: true,
            pack_fonts: true,
            downscale_images: true,
            downscale_resolution: 150,
            fast_web_view: false,
            remove_annotations: false,
            remove_bookmarks: false,
            remove_embedded_files: false,
            remove_form_fields: false,
            remove_hyperlinks: false,
            remove_javascript: false,
            remove_metadata: false,
            remove_page_thumbnails: false,
            remove_page_piece_info: true,
            enable_jpeg2000: true,
            enable_jbig2: true,
            enable_char_repair: false,
            enable_mrc: false,
            mrc_preserve_smoothing: true,
            mrc_downscale_resolution: 100,
            jbig2_pms_threshold: 0.75,
        }
    }
}

/// OCR action configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language code understood by the service
    pub language: String,
    /// Leave pages that already contain text untouched
    pub skip_pages_with_text: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            skip_pages_with_text: true,
        }
    }
}

/// Image-to-PDF (MRC) save configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageToPdfConfig {
    pub conformance: PdfVersion,
    pub color_image_compression: ColorImageCompression,
    pub bitonal_image_compression: BitonalImageCompression,
    /// JPEG quality, 1-100
    pub image_quality: u8,
    pub downscale_images: bool,
    pub downscale_resolution: u32,
    pub preserve_smoothing: bool,
    pub fast_web_view: bool,
}

impl Default for ImageToPdfConfig {
    fn default() -> Self {
        Self {
            conformance: PdfVersion::Pdf15,
            color_image_compression: ColorImageCompression::Jpeg,
            bitonal_image_compression: BitonalImageCompression::Jbig2,
            image_quality: 55,
            downscale_images: true,
            downscale_resolution: 150,
            preserve_smoothing: true,
            fast_web_view: false,
        }
    }
}

/// One remote operation in a workflow
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Upload a PDF and open it server-side
    LoadDocument { output_version: PdfVersion },
    /// Upload an image and open it server-side
    LoadImage,
    Reduce(ReduceConfig),
    Ocr(OcrConfig),
    /// Download the current document
    SaveDocument,
    /// Render the loaded image into a PDF and download it
    SaveImageAsPdf(ImageToPdfConfig),
}

impl Operation {
    /// Short action name used in messages and logs
    pub fn action_name(&self) -> &'static str {
        match self {
            Operation::LoadDocument { .. } | Operation::LoadImage => "Load",
            Operation::Reduce(_) => "Reduce",
            Operation::Ocr(_) => "OCR",
            Operation::SaveDocument => "Save",
            Operation::SaveImageAsPdf(_) => "SaveImageAsPDF",
        }
    }

    /// Whether this step produces the downloadable artifact
    pub fn is_save(&self) -> bool {
        matches!(
            self,
            Operation::SaveDocument | Operation::SaveImageAsPdf(_)
        )
    }
}

/// Ordered operations applied to each file of a batch.
///
/// Built once per run and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    steps: Vec<Operation>,
}

impl WorkflowDefinition {
    pub fn new(steps: Vec<Operation>) -> Self {
        Self { steps }
    }

    /// Load, reduce and save a PDF
    pub fn pdf_reduction(config: ReduceConfig) -> Self {
        Self::new(vec![
            Operation::LoadDocument {
                output_version: config.output_version,
            },
            Operation::Reduce(config),
            Operation::SaveDocument,
        ])
    }

    /// Load a PDF keeping its version, make it searchable and save it
    pub fn pdf_ocr(config: OcrConfig) -> Self {
        Self::new(vec![
            Operation::LoadDocument {
                output_version: PdfVersion::RetainExisting,
            },
            Operation::Ocr(config),
            Operation::SaveDocument,
        ])
    }

    /// Convert an image to a compressed PDF
    pub fn image_to_pdf(config: ImageToPdfConfig) -> Self {
        Self::new(vec![
            Operation::LoadImage,
            Operation::SaveImageAsPdf(config),
        ])
    }

    pub fn steps(&self) -> &[Operation] {
        &self.steps
    }

    /// The terminal save step, if the workflow has one
    pub fn save_step(&self) -> Option<&Operation> {
        self.steps.iter().rev().find(|step| step.is_save())
    }

    /// True when any step is a size reduction
    pub fn is_file_size_reduction_intended(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, Operation::Reduce(_)))
    }
}
