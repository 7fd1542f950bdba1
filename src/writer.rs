//! Object-file and raw-segment-dump writers (spec §6.3, §6.4).
//!
//! These are the "external collaborators" spec.md describes only by the
//! interface they expose to the core; this crate ships them as the
//! thinnest possible layer over [`SegmentImage`] so the binary is runnable
//! end to end.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::segment::{SegmentImage, SEGMENT_COUNT};

const MAGIC: &[u8; 4] = b"mips";
const VERSION: u8 = 0x01;

/// `1 = little-endian host, 2 = big-endian host`, determined by writing
/// `0x0201u16` in the host's native order and reading its first byte
/// (spec §6: "determined by writing 0x0201 as 16-bit and reading its first
/// byte").
fn endianness_byte() -> u8 {
    let probe: u16 = 0x0201;
    if probe.to_ne_bytes()[0] == 0x01 {
        1
    } else {
        2
    }
}

/// Writes the file header, one section header + payload per non-empty
/// segment (in [`Segment::ALL`] order), to `path`. Section header fields
/// and payload bytes are little-endian unconditionally regardless of host
/// endianness (spec §9's suggestion, to keep reader tools simple); only
/// the header's own endianness byte reports the host that produced the
/// file.
pub fn write_object_file(path: &Path, segments: &[SegmentImage; SEGMENT_COUNT]) -> io::Result<()> {
    let present: Vec<&SegmentImage> = segments.iter().filter(|s| s.high_water() > 0).collect();

    let mut file = File::create(path)?;
    file.write_all(MAGIC)?;
    file.write_all(&[endianness_byte(), VERSION, present.len() as u8, 0])?;

    let header_total = 8 + present.len() * 12;
    let mut offset = header_total as u32;
    let mut headers = Vec::with_capacity(present.len());
    for image in &present {
        headers.push((image.segment, offset, image.high_water()));
        offset += image.high_water();
    }

    for (segment, file_offset, size) in &headers {
        file.write_all(&[segment.index() as u8, 0, 0, 0])?;
        file.write_all(&file_offset.to_le_bytes())?;
        file.write_all(&size.to_le_bytes())?;
    }

    for image in &present {
        file.write_all(image.bytes())?;
    }

    Ok(())
}

/// Raw byte-for-byte dump of one segment's image up to its high-water
/// mark. No header (spec §6.4).
pub fn dump_segment(path: &Path, image: &SegmentImage) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(image.bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;
    use tempfile::tempdir;

    #[test]
    fn header_carries_magic_version_and_section_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.obj");
        let mut text = SegmentImage::new(Segment::UserText);
        text.write(&[0x01, 0x02, 0x03, 0x04], Default::default()).unwrap();
        let segments = [text, SegmentImage::new(Segment::UserData), SegmentImage::new(Segment::KernelText), SegmentImage::new(Segment::KernelData)];

        write_object_file(&path, &segments).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        assert_eq!(&bytes[0..4], b"mips");
        assert_eq!(bytes[5], VERSION);
        assert_eq!(bytes[6], 1, "only one non-empty segment");
    }

    #[test]
    fn empty_segments_are_skipped_in_the_section_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.obj");
        let segments = [
            SegmentImage::new(Segment::UserText),
            SegmentImage::new(Segment::UserData),
            SegmentImage::new(Segment::KernelText),
            SegmentImage::new(Segment::KernelData),
        ];
        write_object_file(&path, &segments).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8, "header only, no sections, no payload");
        assert_eq!(bytes[6], 0);
    }

    #[test]
    fn dump_segment_writes_raw_bytes_with_no_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("text.bin");
        let mut img = SegmentImage::new(Segment::UserText);
        img.write(&[0xDE, 0xAD, 0xBE, 0xEF], Default::default()).unwrap();
        dump_segment(&path, &img).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
