use anyhow::{Result, Context};
use chrono::Local;
use std::fs;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

// @module: File and directory utilities

/// Every PDF starts with this marker (possibly after a little junk)
const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into the file the marker may appear
const PDF_MAGIC_WINDOW: usize = 1024;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for the translated document
    // @params: input_file, output_dir, target_language, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        extension: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let output_dir = output_dir.as_ref();

        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('.');
        output_filename.push_str(target_language);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.join(output_filename)
    }

    /// Read a whole file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write bytes so that the destination either keeps its old content or
    /// holds the complete new content, never a partial file
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut staging = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        staging
            .write_all(content)
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        staging.flush()?;
        staging
            .persist(path)
            .map_err(|e| anyhow::anyhow!("Failed to move output into place at {:?}: {}", path, e.error))?;
        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect whether a file is a PDF by extension, then by content
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        let mut head = Vec::with_capacity(PDF_MAGIC_WINDOW);
        fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?
            .take(PDF_MAGIC_WINDOW as u64)
            .read_to_end(&mut head)?;

        if Self::has_pdf_magic(&head) {
            return Ok(FileType::Pdf);
        }

        let has_pdf_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if has_pdf_extension {
            // Named like a PDF but the header is missing
            return Ok(FileType::Corrupt);
        }

        Ok(FileType::Unknown)
    }

    /// Whether the buffer carries the `%PDF-` marker near its start
    pub fn has_pdf_magic(bytes: &[u8]) -> bool {
        let window = &bytes[..bytes.len().min(PDF_MAGIC_WINDOW)];
        window
            .windows(PDF_MAGIC.len())
            .any(|w| w == PDF_MAGIC)
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// A PDF document
    Pdf,
    /// Has a .pdf extension but no PDF header
    Corrupt,
    /// Unknown file type
    Unknown,
}
