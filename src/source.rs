use crate::bmp::{self, BMP_SIGNATURE};
use crate::container::IconContainer;
use crate::raster::{Raster, PNG_SIGNATURE};
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

//===========================================================================//

/// The image formats accepted as input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceFormat {
    /// A Windows icon (ICO) file.
    Icon,
    /// A Windows cursor (CUR) file.
    Cursor,
    /// A PNG file.
    Png,
    /// A standalone BMP file.
    Bmp,
}

impl SourceFormat {
    /// Identifies the format from the first bytes of a file.
    pub fn sniff(data: &[u8]) -> Option<SourceFormat> {
        if data.starts_with(b"\x00\x00\x01\x00") {
            Some(SourceFormat::Icon)
        } else if data.starts_with(b"\x00\x00\x02\x00") {
            Some(SourceFormat::Cursor)
        } else if data.starts_with(PNG_SIGNATURE) {
            Some(SourceFormat::Png)
        } else if data.starts_with(BMP_SIGNATURE) {
            Some(SourceFormat::Bmp)
        } else {
            None
        }
    }
}

//===========================================================================//

/// Reads an image file into memory.  The file is closed before decoding
/// starts.
pub fn read_source(path: &Path) -> io::Result<Raster> {
    let data = fs::read(path)?;
    decode_source(&data)
}

/// Decodes an in-memory image.  For icon and cursor containers this is the
/// largest frame.
pub fn decode_source(data: &[u8]) -> io::Result<Raster> {
    let format = match SourceFormat::sniff(data) {
        Some(format) => format,
        None => invalid_data!("Unrecognized image format"),
    };
    log::debug!("Source format is {:?}", format);
    match format {
        SourceFormat::Icon | SourceFormat::Cursor => {
            let container = IconContainer::read(Cursor::new(data))?;
            let frame = match container.largest_frame() {
                Some(frame) => frame,
                None => invalid_data!("Icon file contains no images"),
            };
            log::debug!(
                "Using the {}x{} frame of {}",
                frame.width(),
                frame.height(),
                container.frames().len()
            );
            frame.decode()
        }
        SourceFormat::Png => Raster::read_png(data),
        SourceFormat::Bmp => bmp::decode_bmp_file(data),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{decode_source, SourceFormat};
    use crate::container::{Frame, IconContainer};
    use crate::raster::Raster;
    use std::io;

    fn solid(side: u32, value: u8) -> Raster {
        let rgba = vec![value; (side * side * 4) as usize];
        Raster::from_rgba_data(side, side, rgba)
    }

    #[test]
    fn sniff_formats() {
        assert_eq!(
            SourceFormat::sniff(b"\x00\x00\x01\x00\x03\x00"),
            Some(SourceFormat::Icon)
        );
        assert_eq!(
            SourceFormat::sniff(b"\x00\x00\x02\x00"),
            Some(SourceFormat::Cursor)
        );
        assert_eq!(
            SourceFormat::sniff(b"\x89PNG\r\n\x1a\n"),
            Some(SourceFormat::Png)
        );
        assert_eq!(SourceFormat::sniff(b"BM\x00"), Some(SourceFormat::Bmp));
        assert_eq!(SourceFormat::sniff(b"GIF89a"), None);
        assert_eq!(SourceFormat::sniff(b""), None);
    }

    #[test]
    fn icon_source_uses_largest_frame() {
        let mut container = IconContainer::new();
        container.add_frame(Frame::encode_bmp(&solid(16, 10)).unwrap());
        container.add_frame(Frame::encode_png(&solid(48, 20)).unwrap());
        container.add_frame(Frame::encode_bmp(&solid(32, 30)).unwrap());
        let mut file = Vec::new();
        container.write(&mut file).unwrap();
        let raster = decode_source(&file).unwrap();
        assert_eq!(raster, solid(48, 20));
    }

    #[test]
    fn png_source() {
        let mut file = Vec::new();
        solid(5, 99).write_png(&mut file).unwrap();
        assert_eq!(decode_source(&file).unwrap(), solid(5, 99));
    }

    #[test]
    fn reject_unknown_and_empty_sources() {
        let error = decode_source(b"hello world").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        let error = decode_source(b"\x00\x00\x01\x00\x00\x00").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}

//===========================================================================//
