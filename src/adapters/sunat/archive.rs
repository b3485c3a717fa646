//! Single-entry zip containers

use crate::domain::TransmissionError;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn archive_error(e: impl std::fmt::Display) -> TransmissionError {
    TransmissionError::Archive(e.to_string())
}

/// Zip `content` as the only entry `entry_name`
///
/// Entry timestamps are fixed so equal input yields equal bytes.
pub fn pack(entry_name: &str, content: &[u8]) -> Result<Vec<u8>, TransmissionError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    writer.start_file(entry_name, options).map_err(archive_error)?;
    writer.write_all(content).map_err(archive_error)?;
    let cursor = writer.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}

/// Largest receipt entry accepted, whatever the archive header declares
pub const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

/// First `.xml` file entry of an archive, by name and content
pub fn first_xml_entry(bytes: &[u8]) -> Result<(String, Vec<u8>), TransmissionError> {
    first_xml_entry_within(bytes, MAX_ENTRY_BYTES)
}

fn first_xml_entry_within(
    bytes: &[u8],
    limit: u64,
) -> Result<(String, Vec<u8>), TransmissionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(".xml") {
            continue;
        }
        let name = entry.name().to_string();
        let mut content = Vec::new();
        (&mut entry)
            .take(limit + 1)
            .read_to_end(&mut content)
            .map_err(archive_error)?;
        if content.len() as u64 > limit {
            return Err(TransmissionError::Archive(format!(
                "{name} exceeds {limit} bytes"
            )));
        }
        return Ok((name, content));
    }

    Err(TransmissionError::MissingReceiptEntry(format!(
        "{} entries, none of them XML",
        archive.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_deterministic_and_readable() {
        let first = pack("20123456789-01-F001-1.XML", b"<Invoice/>").unwrap();
        let second = pack("20123456789-01-F001-1.XML", b"<Invoice/>").unwrap();
        assert_eq!(first, second);

        let (name, content) = first_xml_entry(&first).unwrap();
        assert_eq!(name, "20123456789-01-F001-1.XML");
        assert_eq!(content, b"<Invoice/>");
    }

    #[test]
    fn test_skips_directories_and_other_files() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        writer.add_directory("dummy/", options).unwrap();
        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(b"text").unwrap();
        writer.start_file("R-20123456789-01-F001-1.xml", options).unwrap();
        writer.write_all(b"<ApplicationResponse/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let (name, content) = first_xml_entry(&bytes).unwrap();
        assert_eq!(name, "R-20123456789-01-F001-1.xml");
        assert_eq!(content, b"<ApplicationResponse/>");
    }

    #[test]
    fn test_missing_xml_entry() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.add_directory("dummy/", FileOptions::default()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            first_xml_entry(&bytes),
            Err(TransmissionError::MissingReceiptEntry(_))
        ));
    }

    #[test]
    fn test_garbage_is_an_archive_error() {
        assert!(matches!(
            first_xml_entry(b"not a zip"),
            Err(TransmissionError::Archive(_))
        ));
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let zip = pack("R-20123456789-01-F001-1.XML", &[b' '; 2048]).unwrap();
        assert!(first_xml_entry_within(&zip, 4096).is_ok());
        assert!(matches!(
            first_xml_entry_within(&zip, 1024),
            Err(TransmissionError::Archive(_))
        ));
    }
}
