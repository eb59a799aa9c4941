use std::path::Path;
use tracing::{debug, warn};

/// Extensions decoded as plain text
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "log", "csv"];

/// Extract the text content of a file
///
/// Extraction never fails: any unreadable or unsupported file degrades to an
/// empty string, which the search pipeline treats as "skip this file".
pub fn extract(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        extract_text_file(path)
    } else if ext == "pdf" {
        extract_pdf(path)
    } else {
        // The walker should have filtered these out already
        String::new()
    }
}

/// Read a plain-text file, trying a fixed list of encodings in order
///
/// UTF-8 strict first, then Windows-1252 (rejects the handful of bytes it
/// leaves unmapped), then Latin-1 as the lossless last resort.
fn extract_text_file(path: &Path) -> String {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed to read {}: {}", path.display(), err);
            return String::new();
        }
    };

    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            debug!("{} is not valid UTF-8, trying fallbacks", path.display());

            if let Some(text) = encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(&bytes)
            {
                return text.into_owned();
            }

            // Latin-1 maps every byte, so this always succeeds
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Extract text from a PDF, page text joined with newlines
fn extract_pdf(path: &Path) -> String {
    match pdf_extract::extract_text(path) {
        Ok(text) => text,
        Err(err) => {
            warn!("Failed to extract PDF {}: {}", path.display(), err);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reads_utf8_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "invoice Q3 budget ação").unwrap();

        assert_eq!(extract(&path), "invoice Q3 budget ação");
    }

    #[test]
    fn test_falls_back_on_non_utf8_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.txt");
        // "orçamento" in Latin-1/Windows-1252: ç = 0xE7
        fs::write(&path, b"or\xE7amento").unwrap();

        assert_eq!(extract(&path), "orçamento");
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let path = Path::new("/nonexistent/filesage-test/a.txt");
        assert_eq!(extract(path), "");
    }

    #[test]
    fn test_corrupt_pdf_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();

        assert_eq!(extract(&path), "");
    }

    #[test]
    fn test_unsupported_extension_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.exe");
        fs::write(&path, "plenty of content").unwrap();

        assert_eq!(extract(&path), "");
    }

    #[test]
    fn test_empty_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "").unwrap();

        assert_eq!(extract(&path), "");
    }
}
