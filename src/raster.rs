use std::collections::BTreeSet;
use std::io::{self, Read, Write};

//===========================================================================//

// The signature that all PNG files start with.
pub(crate) const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

// The largest palette a DIB can carry.
pub(crate) const MAX_PALETTE_LEN: usize = 256;

//===========================================================================//

/// A decoded image: 8-bit RGBA pixels in row-major order, top row first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    rgba_data: Vec<u8>,
}

impl Raster {
    /// Creates a raster from RGBA data.  Panics if either dimension is zero
    /// or if `rgba_data` is not exactly `4 * width * height` bytes.
    pub fn from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> Raster {
        match Raster::try_from_rgba_data(width, height, rgba_data) {
            Ok(raster) => raster,
            Err(error) => panic!("{}", error),
        }
    }

    pub(crate) fn try_from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> io::Result<Raster> {
        if width == 0 || height == 0 {
            invalid_data!("Invalid image size {}x{}", width, height);
        }
        let expected_len = (width as u64) * (height as u64) * 4;
        if rgba_data.len() as u64 != expected_len {
            invalid_data!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_len,
                width,
                height
            );
        }
        Ok(Raster { width, height, rgba_data })
    }

    /// Returns the width, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data, top row first.
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }

    /// Consumes the raster and returns its RGBA data.
    pub fn into_rgba_data(self) -> Vec<u8> {
        self.rgba_data
    }

    /// Reads only the PNG header and returns the image dimensions.
    pub(crate) fn read_png_size<R: Read>(
        reader: R,
    ) -> io::Result<(u32, u32)> {
        let png_reader = match png::Decoder::new(reader).read_info() {
            Ok(png_reader) => png_reader,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        let info = png_reader.info();
        Ok((info.width, info.height))
    }

    /// Decodes a PNG.  Palette, low bit depth, and 16-bit images are
    /// normalized to 8 bits per channel.
    pub fn read_png<R: Read>(reader: R) -> io::Result<Raster> {
        let mut decoder = png::Decoder::new(reader);
        decoder
            .set_transformations(png::Transformations::normalize_to_color8());
        let mut png_reader = match decoder.read_info() {
            Ok(png_reader) => png_reader,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        let mut buffer = vec![0u8; png_reader.output_buffer_size()];
        let frame = match png_reader.next_frame(&mut buffer) {
            Ok(frame) => frame,
            Err(error) => invalid_data!("Malformed PNG data: {}", error),
        };
        buffer.truncate(frame.buffer_size());
        let channels = match frame.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                invalid_data!("PNG palette was not expanded");
            }
        };
        let rgba_data = if channels == 4 {
            buffer
        } else {
            let mut rgba = Vec::with_capacity(buffer.len() / channels * 4);
            for pixel in buffer.chunks_exact(channels) {
                let expanded = match *pixel {
                    [gray] => [gray, gray, gray, u8::MAX],
                    [gray, alpha] => [gray, gray, gray, alpha],
                    [red, green, blue] => [red, green, blue, u8::MAX],
                    _ => unreachable!(),
                };
                rgba.extend_from_slice(&expanded);
            }
            rgba
        };
        Raster::try_from_rgba_data(frame.width, frame.height, rgba_data)
    }

    /// Encodes the raster as a PNG.
    pub fn write_png<W: Write>(&self, writer: W) -> io::Result<()> {
        self.write_png_with_stats(&self.color_stats(), writer)?;
        Ok(())
    }

    /// Encodes the raster as a PNG and returns the bits-per-pixel written.
    /// Opaque images are stored as RGB, everything else as RGBA.
    pub(crate) fn write_png_with_stats<W: Write>(
        &self,
        stats: &ColorStats,
        writer: W,
    ) -> io::Result<u16> {
        let result = if stats.has_alpha {
            self.encode_png(writer, png::ColorType::Rgba, &self.rgba_data)
                .map(|()| 32)
        } else {
            let rgb: Vec<u8> = self
                .rgba_data
                .chunks_exact(4)
                .flat_map(|pixel| pixel[..3].iter().copied())
                .collect();
            self.encode_png(writer, png::ColorType::Rgb, &rgb).map(|()| 24)
        };
        match result {
            Ok(bits_per_pixel) => Ok(bits_per_pixel),
            Err(png::EncodingError::IoError(error)) => Err(error),
            Err(error) => invalid_input!("PNG encoding failed: {}", error),
        }
    }

    fn encode_png<W: Write>(
        &self,
        writer: W,
        color_type: png::ColorType,
        data: &[u8],
    ) -> Result<(), png::EncodingError> {
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(data)?;
        writer.finish()
    }

    /// Scans the pixels for transparency and palette size.
    pub(crate) fn color_stats(&self) -> ColorStats {
        let mut colors = BTreeSet::<(u8, u8, u8)>::new();
        let mut has_alpha = false;
        let mut has_nonbinary_alpha = false;
        for pixel in self.rgba_data.chunks_exact(4) {
            match pixel[3] {
                u8::MAX => {}
                0 => has_alpha = true,
                _ => {
                    has_alpha = true;
                    has_nonbinary_alpha = true;
                }
            }
            if colors.len() <= MAX_PALETTE_LEN {
                colors.insert((pixel[0], pixel[1], pixel[2]));
            }
        }
        ColorStats {
            has_alpha,
            has_nonbinary_alpha,
            palette: if colors.len() <= MAX_PALETTE_LEN {
                Some(colors)
            } else {
                None
            },
        }
    }
}

//===========================================================================//

/// What the encoders need to know to pick a compact representation.
pub(crate) struct ColorStats {
    /// True if any pixel is not fully opaque.
    pub(crate) has_alpha: bool,
    /// True if any pixel is neither fully opaque nor fully transparent.
    pub(crate) has_nonbinary_alpha: bool,
    /// The distinct RGB colors, or `None` if there are more than 256.
    pub(crate) palette: Option<BTreeSet<(u8, u8, u8)>>,
}

//===========================================================================//


//===========================================================================//
