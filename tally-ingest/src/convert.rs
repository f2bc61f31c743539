//! PDF statement to text conversion by shelling out to `pdftotext`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

pub const DEFAULT_CONVERTER: &str = "pdftotext";

pub fn converter_available(converter: &str) -> bool {
    which::which(converter).is_ok()
}

/// Files in `dir` whose extension matches `ext` (case-insensitive), sorted.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("listing {}", dir.display()))?.path();
        let matches = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Convert every PDF in `dir` to a sibling `.txt` with `<converter> -layout`.
///
/// Returns the text files this call created. A PDF that fails to convert is
/// logged and left out, and so is one whose `.txt` sibling already exists:
/// that file is never overwritten.
pub fn convert_pdfs(dir: &Path, converter: &str) -> Result<Vec<PathBuf>> {
    let pdfs = files_with_extension(dir, "pdf")?;
    let mut written = Vec::with_capacity(pdfs.len());

    for pdf in pdfs {
        let txt = pdf.with_extension("txt");
        if txt.exists() {
            tracing::warn!(
                pdf = %pdf.display(),
                txt = %txt.display(),
                "text file already present, skipping conversion"
            );
            continue;
        }
        let status = Command::new(converter)
            .arg("-layout")
            .arg(&pdf)
            .arg(&txt)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => {
                tracing::info!(pdf = %pdf.display(), txt = %txt.display(), "converted statement");
                written.push(txt);
            }
            Ok(s) => {
                tracing::warn!(pdf = %pdf.display(), status = %s, "statement conversion failed");
            }
            Err(e) => {
                tracing::warn!(pdf = %pdf.display(), error = %e, "could not run {converter}");
            }
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_with_extension_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.TXT", "c.pdf", "notes.md"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("folder.txt")).unwrap();

        let txt = files_with_extension(dir.path(), "txt").unwrap();
        let names: Vec<_> = txt
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn test_missing_converter_is_not_available() {
        assert!(!converter_available("tally-no-such-converter-binary"));
    }

    #[test]
    fn test_existing_text_is_not_converted_over() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stmt.pdf"), "%PDF").unwrap();
        std::fs::write(dir.path().join("stmt.txt"), "mine").unwrap();

        // `cp` would succeed if it were ever invoked
        let written = convert_pdfs(dir.path(), "cp").unwrap();
        assert!(written.is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("stmt.txt")).unwrap(), "mine");
    }

    #[test]
    fn test_failed_conversion_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stmt.pdf"), "%PDF").unwrap();
        let written = convert_pdfs(dir.path(), "tally-no-such-converter-binary").unwrap();
        assert!(written.is_empty());
    }
}
