/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;
use yaptwai::file_utils::{FileManager, FileType};
use crate::common;

/// Test that generate_output_path creates the correct path
#[test]
fn test_generate_output_path_withValidInputs_shouldCreateCorrectPath() {
    let output_path = FileManager::generate_output_path(
        Path::new("/tmp/input/paper.pdf"),
        Path::new("/tmp/output"),
        "fa",
        "pdf",
    );
    assert_eq!(output_path, Path::new("/tmp/output/paper.fa.pdf"));
}

/// Test that ensure_dir creates directories as needed
#[test]
fn test_ensure_dir_withNonExistentDir_shouldCreateDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b");
    FileManager::ensure_dir(&nested)?;
    assert!(FileManager::dir_exists(&nested));
    Ok(())
}

/// Test that a file with the PDF marker is detected regardless of its name
#[test]
fn test_detect_file_type_withPdfMagic_shouldReturnPdf() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::write_test_file(temp_dir.path(), "document.bin", &common::pdf_with_pages(&["Hi"]))?;
    assert_eq!(FileManager::detect_file_type(&path)?, FileType::Pdf);
    Ok(())
}

/// Test that a .pdf file without the marker is reported as corrupt
#[test]
fn test_detect_file_type_withPdfExtensionOnly_shouldReturnCorrupt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let fake = common::write_test_file(temp_dir.path(), "fake.pdf", b"hello")?;
    let text = common::write_test_file(temp_dir.path(), "notes.txt", b"hello")?;
    assert_eq!(FileManager::detect_file_type(&fake)?, FileType::Corrupt);
    assert_eq!(FileManager::detect_file_type(&text)?, FileType::Unknown);
    assert!(FileManager::detect_file_type(temp_dir.path().join("missing.pdf")).is_err());
    Ok(())
}

/// Test that an atomic write replaces the whole file
#[test]
fn test_write_atomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("result.pdf");
    FileManager::write_atomic(&path, b"first version")?;
    FileManager::write_atomic(&path, b"second")?;
    assert_eq!(std::fs::read(&path)?, b"second");

    let leftovers = std::fs::read_dir(path.parent().unwrap())?.count();
    assert_eq!(leftovers, 1);
    Ok(())
}

/// Test that log appends keep earlier entries and add a timestamp
#[test]
fn test_append_to_log_file_withTwoEntries_shouldKeepBoth() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("run.issues.log");
    FileManager::append_to_log_file(&path, "first")?;
    FileManager::append_to_log_file(&path, "second")?;

    let content = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));
    Ok(())
}

/// Test the PDF marker check on raw bytes
#[test]
fn test_has_pdf_magic_withLeadingJunk_shouldStillMatch() {
    assert!(FileManager::has_pdf_magic(b"%PDF-1.7\n"));
    assert!(FileManager::has_pdf_magic(b"\x00\x00junk%PDF-1.4"));
    assert!(!FileManager::has_pdf_magic(b"PK\x03\x04"));
}
