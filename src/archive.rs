//! DOCX zip container access.
//!
//! Entries are kept as an ordered list of `(entry_name, bytes)` so the
//! output archive keeps the template's entry order.

use crate::error::{MergeError, Result};
use std::io::{Cursor, Read, Write};
use std::path::Path;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// In-memory DOCX archive.
#[derive(Debug, Clone, Default)]
pub struct DocxArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxArchive {
    /// Read a DOCX zip from bytes, preserving entry order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((name, data));
        }
        log::debug!("Loaded archive with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn read_bytes(&self, name: &str) -> Result<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
            .ok_or_else(|| MergeError::MissingEntry(name.to_string()))
    }

    /// Read an entry as UTF-8 text. A leading byte-order mark is dropped.
    pub fn read_text(&self, name: &str) -> Result<String> {
        let bytes = self.read_bytes(name)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        String::from_utf8(bytes.to_vec()).map_err(|_| MergeError::Utf8(name.to_string()))
    }

    /// Replace an entry, or append it when absent.
    pub fn write_entry(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    /// Write the entries back to a DOCX zip.
    /// Uses STORED for media files (images) and DEFLATED for everything else,
    /// matching the typical DOCX layout that Word expects.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in &self.entries {
            let opts = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocxArchive {
        let mut archive = DocxArchive::default();
        archive.write_entry(CONTENT_TYPES_PART, b"<Types/>".to_vec());
        archive.write_entry(DOCUMENT_PART, b"<w:document/>".to_vec());
        archive.write_entry("word/media/image1.png", vec![0x89, b'P', b'N', b'G']);
        archive
    }

    #[test]
    fn test_zip_round_trip_keeps_order() {
        let bytes = sample().to_bytes().unwrap();
        let archive = DocxArchive::from_bytes(&bytes).unwrap();
        let names: Vec<&str> = archive.entry_names().collect();
        assert_eq!(
            names,
            vec![CONTENT_TYPES_PART, DOCUMENT_PART, "word/media/image1.png"]
        );
        assert_eq!(archive.read_text(DOCUMENT_PART).unwrap(), "<w:document/>");
        assert_eq!(
            archive.read_bytes("word/media/image1.png").unwrap(),
            &[0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn test_write_entry_replaces_existing() {
        let mut archive = sample();
        archive.write_entry(DOCUMENT_PART, b"<new/>".to_vec());
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.read_text(DOCUMENT_PART).unwrap(), "<new/>");
    }

    #[test]
    fn test_missing_entry() {
        let err = sample().read_text(DOCUMENT_RELS_PART).unwrap_err();
        assert!(matches!(err, MergeError::MissingEntry(ref n) if n == DOCUMENT_RELS_PART));
    }

    #[test]
    fn test_read_text_strips_bom() {
        let mut archive = DocxArchive::default();
        archive.write_entry("a.xml", b"\xEF\xBB\xBF<a/>".to_vec());
        assert_eq!(archive.read_text("a.xml").unwrap(), "<a/>");
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            DocxArchive::from_bytes(b"definitely not a zip"),
            Err(MergeError::Zip(_))
        ));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        sample().save(&path).unwrap();
        let reopened = DocxArchive::open(&path).unwrap();
        assert_eq!(reopened.len(), 3);
    }
}
