use std::fs;
use std::path::Path;

use crate::analysis::{AnalysisRequest, ContentCategory};

/// Characters of extracted text forwarded as the preview snippet.
pub const DEFAULT_SNIPPET_CHARS: usize = 4000;

/// Map a local file into an analysis request: text formats become a preview
/// snippet, media and PDFs travel as an inline binary payload. With
/// `text_only` set, PDFs are reduced to extracted text instead of bytes.
pub fn prepare_file(
    path: &Path,
    text_only: bool,
    snippet_chars: usize,
) -> Result<AnalysisRequest, String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" | "md" | "markdown" => {
            let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
            Ok(AnalysisRequest {
                file_name,
                text_content: truncate_snippet(&content, snippet_chars).to_string(),
                category: ContentCategory::Document,
                binary: None,
                mime_type: None,
            })
        }
        "pdf" => {
            let bytes = fs::read(path).map_err(|e| e.to_string())?;
            if text_only {
                let content = pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| format!("PDF parse error: {}", e))?;
                Ok(AnalysisRequest {
                    file_name,
                    text_content: truncate_snippet(&content, snippet_chars).to_string(),
                    category: ContentCategory::Document,
                    binary: None,
                    mime_type: None,
                })
            } else {
                Ok(AnalysisRequest {
                    file_name,
                    text_content: String::new(),
                    category: ContentCategory::Document,
                    binary: Some(bytes),
                    mime_type: Some("application/pdf".to_string()),
                })
            }
        }
        "mp3" | "wav" | "m4a" | "ogg" | "flac" => {
            media_request(path, file_name, ContentCategory::Audio, &ext, text_only)
        }
        "mp4" | "mov" | "webm" => {
            media_request(path, file_name, ContentCategory::Video, &ext, text_only)
        }
        _ => Err(format!("Unsupported file type: .{}", ext)),
    }
}

fn media_request(
    path: &Path,
    file_name: String,
    category: ContentCategory,
    ext: &str,
    text_only: bool,
) -> Result<AnalysisRequest, String> {
    if text_only {
        return Err(format!("No text to extract from .{} media", ext));
    }
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    Ok(AnalysisRequest {
        file_name,
        text_content: String::new(),
        category,
        binary: Some(bytes),
        mime_type: Some(mime_for(ext).to_string()),
    })
}

fn mime_for(ext: &str) -> &'static str {
    match ext {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Truncate text to the snippet budget (UTF-8 safe).
pub fn truncate_snippet(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
