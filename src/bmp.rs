//! Device-independent bitmaps, both as ICO frames (with a trailing AND-mask
//! and a doubled height field) and as standalone `.bmp` files.

use crate::raster::{ColorStats, Raster, MAX_PALETTE_LEN};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{self, Read};

//===========================================================================//

// The size of a BITMAPINFOHEADER struct, in bytes.
const INFO_HEADER_LEN: u32 = 40;
// BITMAPV4HEADER and BITMAPV5HEADER extend the info header, starting with
// the four channel masks; the color space fields after those are skipped.
const V4_HEADER_LEN: u32 = 108;
const V5_HEADER_LEN: u32 = 124;

// The size of the BITMAPFILEHEADER that precedes the DIB in a .bmp file.
const FILE_HEADER_LEN: usize = 14;
pub(crate) const BMP_SIGNATURE: &[u8] = b"BM";

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

// Above this many pixels, an 8 bpp palette is smaller than 24 bpp pixels.
const MIN_PIXELS_FOR_PALETTE_8: u32 = 512;

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Depth {
    /// 1, 4, or 8 bits of palette index per pixel.
    Indexed(u16),
    /// 16 bpp, 5 bits per channel.
    Rgb555,
    /// 24 bpp, stored blue-green-red.
    Bgr,
    /// 32 bpp, stored blue-green-red-alpha.
    Bgra,
}

impl Depth {
    fn from_bits_per_pixel(bits_per_pixel: u16) -> Option<Depth> {
        match bits_per_pixel {
            1 | 4 | 8 => Some(Depth::Indexed(bits_per_pixel)),
            16 => Some(Depth::Rgb555),
            24 => Some(Depth::Bgr),
            32 => Some(Depth::Bgra),
            _ => None,
        }
    }

    fn bits_per_pixel(&self) -> u16 {
        match *self {
            Depth::Indexed(bits) => bits,
            Depth::Rgb555 => 16,
            Depth::Bgr => 24,
            Depth::Bgra => 32,
        }
    }

    fn max_palette_len(&self) -> usize {
        match *self {
            Depth::Indexed(bits) => 1 << bits,
            _ => 0,
        }
    }
}

// Rows of a DIB are padded to a multiple of four bytes.
fn row_stride(width: u32, bits_per_pixel: u16) -> u64 {
    (width as u64 * bits_per_pixel as u64 + 31) / 32 * 4
}

fn take<'a>(data: &mut &'a [u8], len: u64) -> io::Result<&'a [u8]> {
    if (data.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Truncated bitmap data",
        ));
    }
    let (head, tail) = data.split_at(len as usize);
    *data = tail;
    Ok(head)
}

//===========================================================================//

/// Where each channel lives within a 16 or 32 bpp pixel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ChannelMasks {
    red: u32,
    green: u32,
    blue: u32,
    alpha: u32,
}

impl ChannelMasks {
    fn unpack(&self, value: u32, pixel: &mut [u8]) {
        pixel[0] = extract_channel(value, self.red);
        pixel[1] = extract_channel(value, self.green);
        pixel[2] = extract_channel(value, self.blue);
        if self.alpha != 0 {
            pixel[3] = extract_channel(value, self.alpha);
        }
    }
}

// Scales the masked bits of `value` to the full 0-255 range.
fn extract_channel(value: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let max = (mask >> mask.trailing_zeros()) as u64;
    let bits = ((value & mask) >> mask.trailing_zeros()) as u64;
    ((bits * 255 + max / 2) / max) as u8
}

struct DibHeader {
    header_len: u32,
    width: u32,
    height: u32,
    top_down: bool,
    depth: Depth,
    colors_used: u32,
    masks: Option<ChannelMasks>,
    // Masks stored between an info header and the palette.
    trailing_masks_len: u32,
}

impl DibHeader {
    /// Parses a BITMAPINFOHEADER (or V4/V5).  In an icon frame the height
    /// field counts the rows of both the color data and the AND-mask.
    fn read<R: Read>(
        mut reader: R,
        icon_frame: bool,
    ) -> io::Result<DibHeader> {
        let header_len = reader.read_u32::<LittleEndian>()?;
        if header_len != INFO_HEADER_LEN
            && header_len != V4_HEADER_LEN
            && header_len != V5_HEADER_LEN
        {
            invalid_data!("Unsupported BMP header size ({})", header_len);
        }
        let width = reader.read_i32::<LittleEndian>()?;
        if width < 1 {
            invalid_data!(
                "Invalid BMP width (was {}, but must be at least 1)",
                width
            );
        }
        let mut height = reader.read_i32::<LittleEndian>()?;
        let top_down = height < 0 && !icon_frame;
        if icon_frame {
            if height % 2 != 0 {
                invalid_data!(
                    "Invalid height field in BMP header \
                     (was {}, but must be divisible by 2)",
                    height
                );
            }
            height /= 2;
        } else if top_down {
            height = height.checked_neg().unwrap_or(0);
        }
        if height < 1 {
            invalid_data!(
                "Invalid BMP height (was {}, but must be at least 1)",
                height
            );
        }
        let _planes = reader.read_u16::<LittleEndian>()?;
        let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
        let depth = match Depth::from_bits_per_pixel(bits_per_pixel) {
            Some(depth) => depth,
            None => invalid_data!(
                "Unsupported BMP bits-per-pixel ({})",
                bits_per_pixel
            ),
        };
        let compression = reader.read_u32::<LittleEndian>()?;
        let has_masks = match compression {
            BI_RGB => false,
            BI_BITFIELDS | BI_ALPHABITFIELDS
                if depth == Depth::Rgb555 || depth == Depth::Bgra =>
            {
                true
            }
            _ => invalid_data!(
                "Unsupported BMP compression ({}) at {} bpp",
                compression,
                bits_per_pixel
            ),
        };
        let _image_size = reader.read_u32::<LittleEndian>()?;
        let _horz_ppm = reader.read_i32::<LittleEndian>()?;
        let _vert_ppm = reader.read_i32::<LittleEndian>()?;
        let colors_used = reader.read_u32::<LittleEndian>()?;
        let _colors_important = reader.read_u32::<LittleEndian>()?;
        let mut masks = None;
        let mut trailing_masks_len = 0;
        if has_masks {
            let has_alpha_mask = header_len != INFO_HEADER_LEN
                || compression == BI_ALPHABITFIELDS;
            let red = reader.read_u32::<LittleEndian>()?;
            let green = reader.read_u32::<LittleEndian>()?;
            let blue = reader.read_u32::<LittleEndian>()?;
            let alpha = if has_alpha_mask {
                reader.read_u32::<LittleEndian>()?
            } else {
                0
            };
            if header_len == INFO_HEADER_LEN {
                trailing_masks_len = if has_alpha_mask { 16 } else { 12 };
            }
            masks = Some(ChannelMasks { red, green, blue, alpha });
        }
        Ok(DibHeader {
            header_len,
            width: width as u32,
            height: height as u32,
            top_down,
            depth,
            colors_used,
            masks,
            trailing_masks_len,
        })
    }

    // Offset of the palette from the start of the header.
    fn palette_offset(&self) -> u64 {
        self.header_len as u64 + self.trailing_masks_len as u64
    }

    /// True if pixels carry their own alpha values.
    fn has_alpha_channel(&self) -> bool {
        match self.masks {
            Some(masks) => masks.alpha != 0,
            None => self.depth == Depth::Bgra,
        }
    }

    fn palette_len(&self) -> usize {
        let max = self.depth.max_palette_len();
        if self.colors_used == 0 || self.colors_used as usize > max {
            max
        } else {
            self.colors_used as usize
        }
    }
}

//===========================================================================//

/// Reads just enough of an icon frame's DIB to determine its size.
pub(crate) fn read_icon_frame_size(data: &[u8]) -> io::Result<(u32, u32)> {
    let header = DibHeader::read(data, true)?;
    Ok((header.width, header.height))
}

/// Decodes the DIB stored in an ICO/CUR directory entry.
pub(crate) fn decode_icon_frame(data: &[u8]) -> io::Result<Raster> {
    let header = DibHeader::read(data, true)?;
    let mut rest = data;
    take(&mut rest, header.palette_offset())?;
    let palette = read_palette(&mut rest, header.palette_len())?;
    let mut rgba = decode_pixels(&header, &palette, &mut rest, true)?;
    // Some writers leave the alpha channel of a 32 bpp frame zeroed and rely
    // on the AND-mask alone.
    let alpha_unused = header.has_alpha_channel()
        && rgba.chunks_exact(4).all(|pixel| pixel[3] == 0);
    if alpha_unused {
        for pixel in rgba.chunks_exact_mut(4) {
            pixel[3] = u8::MAX;
        }
    }
    if !header.has_alpha_channel() || alpha_unused {
        apply_and_mask(&header, &mut rest, &mut rgba)?;
    }
    Raster::try_from_rgba_data(header.width, header.height, rgba)
}

/// Decodes a standalone `.bmp` file.
pub(crate) fn decode_bmp_file(data: &[u8]) -> io::Result<Raster> {
    let mut dib = data;
    let file_header = take(&mut dib, FILE_HEADER_LEN as u64)?;
    if !file_header.starts_with(BMP_SIGNATURE) {
        invalid_data!("Missing BMP file signature");
    }
    let pixel_offset =
        (&file_header[10..]).read_u32::<LittleEndian>()? as usize;
    let header = DibHeader::read(dib, false)?;
    let mut rest = dib;
    take(&mut rest, header.palette_offset())?;
    let palette = read_palette(&mut rest, header.palette_len())?;
    if pixel_offset < FILE_HEADER_LEN || pixel_offset > data.len() {
        invalid_data!("Invalid BMP pixel data offset ({})", pixel_offset);
    }
    let mut pixels = &data[pixel_offset..];
    let rgba = decode_pixels(&header, &palette, &mut pixels, false)?;
    Raster::try_from_rgba_data(header.width, header.height, rgba)
}

fn read_palette(
    data: &mut &[u8],
    len: usize,
) -> io::Result<Vec<(u8, u8, u8)>> {
    let table = take(data, 4 * len as u64)?;
    Ok(table
        .chunks_exact(4)
        .map(|entry| (entry[2], entry[1], entry[0]))
        .collect())
}

fn decode_pixels(
    header: &DibHeader,
    palette: &[(u8, u8, u8)],
    data: &mut &[u8],
    use_alpha: bool,
) -> io::Result<Vec<u8>> {
    let width = header.width as usize;
    let height = header.height as usize;
    let stride = row_stride(header.width, header.depth.bits_per_pixel());
    // Check the data is all there before allocating anything sized by the
    // header.
    let pixel_data = take(data, stride * header.height as u64)?;
    let mut rgba = vec![u8::MAX; width * height * 4];
    for (stored_row, row) in
        pixel_data.chunks_exact(stride as usize).enumerate()
    {
        let dest_row =
            if header.top_down { stored_row } else { height - 1 - stored_row };
        let dest = &mut rgba[dest_row * width * 4..][..width * 4];
        for (col, pixel) in dest.chunks_exact_mut(4).enumerate() {
            if let Some(masks) = header.masks {
                let value = if header.depth == Depth::Rgb555 {
                    (&row[2 * col..]).read_u16::<LittleEndian>()? as u32
                } else {
                    (&row[4 * col..]).read_u32::<LittleEndian>()?
                };
                masks.unpack(value, pixel);
                continue;
            }
            match header.depth {
                Depth::Indexed(bits) => {
                    let bits = bits as usize;
                    let bit_offset = col * bits;
                    let shift = 8 - bits - bit_offset % 8;
                    let mask = ((1u16 << bits) - 1) as u8;
                    let index = (row[bit_offset / 8] >> shift) & mask;
                    let color = palette.get(index as usize);
                    let (red, green, blue) = match color {
                        Some(&color) => color,
                        None => invalid_data!(
                            "BMP palette index {} out of range (palette has \
                             {} colors)",
                            index,
                            palette.len()
                        ),
                    };
                    pixel[..3].copy_from_slice(&[red, green, blue]);
                }
                Depth::Rgb555 => {
                    let color =
                        u16::from_le_bytes([row[2 * col], row[2 * col + 1]]);
                    let expand = |value: u16| ((value & 0x1f) * 255 + 15) / 31;
                    pixel[0] = expand(color >> 10) as u8;
                    pixel[1] = expand(color >> 5) as u8;
                    pixel[2] = expand(color) as u8;
                }
                Depth::Bgr => {
                    let bgr = &row[3 * col..][..3];
                    pixel[..3].copy_from_slice(&[bgr[2], bgr[1], bgr[0]]);
                }
                Depth::Bgra => {
                    let bgra = &row[4 * col..][..4];
                    pixel[..3].copy_from_slice(&[bgra[2], bgra[1], bgra[0]]);
                    if use_alpha {
                        pixel[3] = bgra[3];
                    }
                }
            }
        }
    }
    Ok(rgba)
}

// The AND-mask is one bit per pixel, bottom row first; a set bit marks a
// transparent pixel.
fn apply_and_mask(
    header: &DibHeader,
    data: &mut &[u8],
    rgba: &mut [u8],
) -> io::Result<()> {
    let width = header.width as usize;
    let height = header.height as usize;
    let stride = row_stride(header.width, 1);
    let mask = take(data, stride * header.height as u64)?;
    for (stored_row, row) in mask.chunks_exact(stride as usize).enumerate() {
        let dest_row = height - 1 - stored_row;
        let dest = &mut rgba[dest_row * width * 4..][..width * 4];
        for (col, pixel) in dest.chunks_exact_mut(4).enumerate() {
            if (row[col / 8] >> (7 - col % 8)) & 0x1 == 1 {
                pixel[3] = 0;
            }
        }
    }
    Ok(())
}

//===========================================================================//

/// An encoded icon frame DIB plus the values its ICONDIRENTRY needs.
pub(crate) struct EncodedDib {
    pub(crate) num_colors: u8,
    pub(crate) bits_per_pixel: u16,
    pub(crate) data: Vec<u8>,
}

/// Encodes a raster as an icon frame DIB, choosing the smallest color depth
/// that represents it exactly.
pub(crate) fn encode_icon_frame(
    raster: &Raster,
    stats: &ColorStats,
) -> io::Result<EncodedDib> {
    let width = raster.width();
    let height = raster.height();
    let palette: Vec<(u8, u8, u8)> = match stats.palette {
        Some(ref colors) if !stats.has_nonbinary_alpha => {
            colors.iter().copied().collect()
        }
        _ => Vec::new(),
    };
    // Only 32 bpp can carry alpha values between 0 and 255, since palette
    // entries have no alpha.
    let depth = if stats.has_nonbinary_alpha {
        Depth::Bgra
    } else if palette.is_empty() {
        Depth::Bgr
    } else if palette.len() <= 2 {
        Depth::Indexed(1)
    } else if palette.len() <= 16 {
        Depth::Indexed(4)
    } else if width.saturating_mul(height) >= MIN_PIXELS_FOR_PALETTE_8 {
        Depth::Indexed(8)
    } else {
        Depth::Bgr
    };
    let palette_len = depth.max_palette_len();
    debug_assert!(palette_len <= MAX_PALETTE_LEN);
    let bits_per_pixel = depth.bits_per_pixel();
    let color_stride = row_stride(width, bits_per_pixel) as usize;
    let mask_stride = row_stride(width, 1) as usize;
    let data_len = INFO_HEADER_LEN as usize
        + 4 * palette_len
        + height as usize * (color_stride + mask_stride);
    let mut data = Vec::<u8>::with_capacity(data_len);

    data.write_u32::<LittleEndian>(INFO_HEADER_LEN)?;
    data.write_i32::<LittleEndian>(width as i32)?;
    data.write_i32::<LittleEndian>(2 * height as i32)?;
    data.write_u16::<LittleEndian>(1)?; // planes
    data.write_u16::<LittleEndian>(bits_per_pixel)?;
    data.write_u32::<LittleEndian>(BI_RGB)?;
    data.write_u32::<LittleEndian>(0)?; // image size
    data.write_i32::<LittleEndian>(0)?; // horz ppm
    data.write_i32::<LittleEndian>(0)?; // vert ppm
    data.write_u32::<LittleEndian>(0)?; // colors used
    data.write_u32::<LittleEndian>(0)?; // colors important

    let mut color_index = HashMap::<(u8, u8, u8), u8>::new();
    if palette_len > 0 {
        for (index, &(red, green, blue)) in palette.iter().enumerate() {
            color_index.insert((red, green, blue), index as u8);
            data.extend_from_slice(&[blue, green, red, 0]);
        }
        data.resize(data.len() + 4 * (palette_len - palette.len()), 0);
    }

    let rows: Vec<&[u8]> =
        raster.rgba_data().chunks_exact(4 * width as usize).rev().collect();
    for row in rows.iter() {
        let start = data.len();
        match depth {
            Depth::Indexed(bits) => {
                let indices = row
                    .chunks_exact(4)
                    .map(|pixel| color_index[&(pixel[0], pixel[1], pixel[2])]);
                pack_bits(&mut data, bits, indices);
            }
            Depth::Rgb555 => {
                // Never chosen above.
                invalid_input!("Encoding 16 bpp BMPs is not supported");
            }
            Depth::Bgr => {
                for pixel in row.chunks_exact(4) {
                    data.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
                }
            }
            Depth::Bgra => {
                for pixel in row.chunks_exact(4) {
                    data.extend_from_slice(&[
                        pixel[2], pixel[1], pixel[0], pixel[3],
                    ]);
                }
            }
        }
        data.resize(start + color_stride, 0);
    }
    for row in rows.iter() {
        let start = data.len();
        pack_bits(
            &mut data,
            1,
            row.chunks_exact(4).map(|pixel| (pixel[3] == 0) as u8),
        );
        data.resize(start + mask_stride, 0);
    }

    debug_assert_eq!(data.len(), data_len);
    let num_colors =
        if palette_len < MAX_PALETTE_LEN { palette_len as u8 } else { 0 };
    Ok(EncodedDib { num_colors, bits_per_pixel, data })
}

// Packs values of `bits` bits each into bytes, most significant bits first.
fn pack_bits<I>(out: &mut Vec<u8>, bits: u16, values: I)
where
    I: Iterator<Item = u8>,
{
    let mut byte = 0u8;
    let mut used = 0;
    for value in values {
        byte |= value << (8 - bits - used);
        used += bits;
        if used == 8 {
            out.push(byte);
            byte = 0;
            used = 0;
        }
    }
    if used > 0 {
        out.push(byte);
    }
}

//===========================================================================//


//===========================================================================//
