//! Human-readable text for service result, reduce error and warning codes

use super::api::{ReduceErrorCode, ReduceErrorInfo, ReduceWarning, ResultCode, WarningCode};

/// Synthetic warning emitted when a reduced file is discarded
pub const FILE_SIZE_REDUCTION_FAILED: &str =
    "file size reduction failed: the original file was kept";

pub fn result_code_message(code: ResultCode) -> &'static str {
    match code {
        ResultCode::Ok => "OK",
        ResultCode::ActionTimedOut => "Action timed out",
        ResultCode::EmptyParameter => "A required parameter is empty",
        ResultCode::InvalidApiKey => "Invalid API key",
        ResultCode::NotEnoughTokens => "Not enough tokens",
        ResultCode::GenericError => "Generic error",
        ResultCode::InvalidParameter => "Invalid parameter",
        ResultCode::OutOfMemory => "Out of memory",
        ResultCode::NotImplemented => "Not implemented",
        ResultCode::FileNotFound => "File not found",
        ResultCode::AccessDenied => "Access denied",
        ResultCode::CanNotImportFileToPdf => "File can not be imported to PDF",
        ResultCode::PdfCanNotBeDecrypted => "PDF can not be decrypted",
        ResultCode::PdfOperationNotAllowed => "Operation not allowed on this PDF",
        ResultCode::PdfCanNotOpenFile => "PDF can not be opened",
        ResultCode::PdfCanNotSaveFile => "PDF can not be saved",
        ResultCode::CanNotCreateFile => "File can not be created",
        ResultCode::NoDocumentProvided => "No document provided",
        ResultCode::CanNotRemovePage => "Page can not be removed",
        ResultCode::CanNotSwapPages => "Pages can not be swapped",
        ResultCode::InvalidPageRange => "Invalid page range",
        ResultCode::CanNotReducePdf => "PDF can not be reduced",
        ResultCode::CanNotExportMoreThan2GigabyteFile => {
            "Files larger than 2 GB can not be exported"
        }
        ResultCode::Unknown => "Unknown error",
    }
}

pub fn reduce_error_message(info: &ReduceErrorInfo) -> String {
    let page = info
        .page
        .map(|page| format!(" on page {}", page))
        .unwrap_or_default();
    let base = match info.error_code {
        ReduceErrorCode::Ok => "OK".to_string(),
        ReduceErrorCode::GetPageImagesCount => format!("could not count images{}", page),
        ReduceErrorCode::MrcPostOperationsFailure => {
            format!("MRC post-processing failed{}", page)
        }
        ReduceErrorCode::PageConversionFailure => format!("page conversion failed{}", page),
        ReduceErrorCode::DocumentEncrypted => "document is encrypted".to_string(),
        ReduceErrorCode::UnexpectedError => "unexpected reduce error".to_string(),
        ReduceErrorCode::Unknown => "Unknown reduce error".to_string(),
    };
    match &info.ext_error_message {
        Some(ext) if !ext.is_empty() => format!("{} ({})", base, ext),
        _ => base,
    }
}

fn warning_code_message(code: WarningCode) -> &'static str {
    match code {
        WarningCode::ImageExtractionFailure => "image extraction failed",
        WarningCode::ColorDetectionFailure => "color detection failed",
        WarningCode::ImageResizeFailure => "image resize failed",
        WarningCode::ImageCropFailure => "image crop failed",
        WarningCode::ImageResolutionObtentionFailure => "image resolution could not be read",
        WarningCode::ImageReplacementFailure => "image replacement failed",
        WarningCode::MrcImageReplacementFailure => "MRC image replacement failed",
        WarningCode::PageSelectionFailure => "page selection failed",
        WarningCode::ImageObtentionFailure => "image could not be read",
        WarningCode::FileSizeReductionFailure => "file size reduction failed",
        WarningCode::BlankPageRemovalFailure => "blank page removal failed",
        WarningCode::Unknown => "Unknown warning",
    }
}

/// Warning text prefixed with the file it concerns
pub fn warning_message(file: &str, warning: &ReduceWarning) -> String {
    let mut message = format!("{}: {}", file, warning_code_message(warning.code));
    if let Some(page) = warning.page {
        message.push_str(&format!(" (page {}", page));
        if let Some(image) = warning.page_image {
            message.push_str(&format!(", image {}", image));
        }
        message.push(')');
    }
    if let Some(ext) = warning.ext_warning_message.as_deref().filter(|e| !e.is_empty()) {
        message.push_str(&format!(" - {}", ext));
    }
    message
}
