use crate::bmp;
use crate::config::FrameEncoding;
use crate::raster::{ColorStats, Raster, PNG_SIGNATURE};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek, SeekFrom, Write};

//===========================================================================//

// ICONDIR is 6 bytes; each ICONDIRENTRY is 16.
const ICONDIR_LEN: u32 = 6;
const ICONDIRENTRY_LEN: u32 = 16;

// `FrameEncoding::Auto` stores frames larger than this as PNG.
const MAX_AUTO_BMP_PIXELS: u32 = 64 * 64;

//===========================================================================//

/// The kind of container: an icon (`.ico`) or a cursor (`.cur`).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResourceType {
    /// Plain images (ICO files)
    Icon,
    /// Images with cursor hotspots (CUR files)
    Cursor,
}

impl ResourceType {
    pub(crate) fn from_number(number: u16) -> Option<ResourceType> {
        match number {
            1 => Some(ResourceType::Icon),
            2 => Some(ResourceType::Cursor),
            _ => None,
        }
    }

    pub(crate) fn number(&self) -> u16 {
        match *self {
            ResourceType::Icon => 1,
            ResourceType::Cursor => 2,
        }
    }
}

//===========================================================================//

/// A set of independently encoded frames; the contents of one ICO or CUR
/// file.
#[derive(Clone, Debug)]
pub struct IconContainer {
    restype: ResourceType,
    frames: Vec<Frame>,
}

impl IconContainer {
    /// Creates an empty icon (not cursor) container.
    pub fn new() -> IconContainer {
        IconContainer { restype: ResourceType::Icon, frames: Vec::new() }
    }

    /// Returns whether this container holds icons or cursors.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the frames, in file order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Appends a frame.
    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Returns the frame with the most pixels, preferring the deeper color
    /// depth and then the earlier frame on ties.  Returns `None` if the
    /// container is empty.
    pub fn largest_frame(&self) -> Option<&Frame> {
        let mut best: Option<&Frame> = None;
        for frame in self.frames.iter() {
            let is_better = match best {
                None => true,
                Some(best) => {
                    let area = frame.width as u64 * frame.height as u64;
                    let best_area = best.width as u64 * best.height as u64;
                    area > best_area
                        || (area == best_area
                            && self.depth_of(frame) > self.depth_of(best))
                }
            };
            if is_better {
                best = Some(frame);
            }
        }
        best
    }

    // CUR entries store the hotspot where ICO entries store the depth.
    fn depth_of(&self, frame: &Frame) -> u16 {
        match self.restype {
            ResourceType::Icon => frame.bits_per_pixel,
            ResourceType::Cursor => 0,
        }
    }

    /// Reads an ICO or CUR file into memory.
    pub fn read<R: Read + Seek>(mut reader: R) -> io::Result<IconContainer> {
        let reserved = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 {
            invalid_data!(
                "Invalid reserved field value in ICONDIR \
                 (was {}, but must be 0)",
                reserved
            );
        }
        let restype = reader.read_u16::<LittleEndian>()?;
        let restype = match ResourceType::from_number(restype) {
            Some(restype) => restype,
            None => invalid_data!("Invalid resource type ({})", restype),
        };
        let num_frames = reader.read_u16::<LittleEndian>()? as usize;
        let mut frames = Vec::<Frame>::with_capacity(num_frames);
        let mut spans = Vec::<(u32, u32)>::with_capacity(num_frames);
        for _ in 0..num_frames {
            let width_byte = reader.read_u8()?;
            let height_byte = reader.read_u8()?;
            let num_colors = reader.read_u8()?;
            let reserved = reader.read_u8()?;
            if reserved != 0 {
                log::warn!(
                    "Ignoring nonzero reserved byte ({}) in ICONDIRENTRY",
                    reserved
                );
            }
            let color_planes = reader.read_u16::<LittleEndian>()?;
            let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
            let data_size = reader.read_u32::<LittleEndian>()?;
            let data_offset = reader.read_u32::<LittleEndian>()?;
            spans.push((data_offset, data_size));
            // A size byte of zero means 256 (or more, for PNG frames); the
            // embedded image header has the real size, filled in below.
            frames.push(Frame {
                width: if width_byte == 0 { 256 } else { width_byte as u32 },
                height: if height_byte == 0 {
                    256
                } else {
                    height_byte as u32
                },
                num_colors,
                color_planes,
                bits_per_pixel,
                data: Vec::new(),
            });
        }
        for (frame, &(data_offset, data_size)) in
            frames.iter_mut().zip(spans.iter())
        {
            reader.seek(SeekFrom::Start(data_offset as u64))?;
            // Bounded by what the file actually holds, so a bogus size field
            // can't force a huge allocation.
            reader
                .by_ref()
                .take(data_size as u64)
                .read_to_end(&mut frame.data)?;
            if frame.data.len() != data_size as usize {
                invalid_data!(
                    "Frame data at offset {} is truncated \
                     (has {} bytes, but should have {})",
                    data_offset,
                    frame.data.len(),
                    data_size
                );
            }
            // Malformed frames keep the directory's size and only fail when
            // decoded.
            if let Ok((width, height)) = frame.decode_size() {
                frame.width = width;
                frame.height = height;
            }
        }
        Ok(IconContainer { restype, frames })
    }

    /// Writes the container out as an ICO or CUR file.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        if self.frames.len() > (u16::MAX as usize) {
            invalid_input!(
                "Too many frames in IconContainer (was {}, but max is {})",
                self.frames.len(),
                u16::MAX
            );
        }
        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u16::<LittleEndian>(self.restype.number())?;
        writer.write_u16::<LittleEndian>(self.frames.len() as u16)?;
        let mut data_offset =
            ICONDIR_LEN + ICONDIRENTRY_LEN * (self.frames.len() as u32);
        for frame in self.frames.iter() {
            writer.write_u8(size_byte(frame.width))?;
            writer.write_u8(size_byte(frame.height))?;
            writer.write_u8(frame.num_colors)?;
            writer.write_u8(0)?; // reserved
            writer.write_u16::<LittleEndian>(frame.color_planes)?;
            writer.write_u16::<LittleEndian>(frame.bits_per_pixel)?;
            let data_size = frame.data.len() as u32;
            writer.write_u32::<LittleEndian>(data_size)?;
            writer.write_u32::<LittleEndian>(data_offset)?;
            data_offset = match data_offset.checked_add(data_size) {
                Some(offset) => offset,
                None => invalid_input!("IconContainer exceeds 4 GiB"),
            };
        }
        for frame in self.frames.iter() {
            writer.write_all(&frame.data)?;
        }
        Ok(())
    }
}

impl Default for IconContainer {
    fn default() -> IconContainer {
        IconContainer::new()
    }
}

// A size byte of zero stands for 256 or more.
fn size_byte(size: u32) -> u8 {
    if size > 255 {
        0
    } else {
        size as u8
    }
}

//===========================================================================//

/// One encoded image within an icon container.
#[derive(Clone, Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    num_colors: u8,
    color_planes: u16,
    bits_per_pixel: u16,
    data: Vec<u8>,
}

impl Frame {
    /// Returns the width of the frame, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the frame, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the bits-per-pixel recorded in the directory entry.
    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    /// Returns true if the frame is stored as a PNG, or false if it is a DIB.
    pub fn is_png(&self) -> bool {
        self.data.starts_with(PNG_SIGNATURE)
    }

    /// Returns the raw encoded data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn decode_size(&self) -> io::Result<(u32, u32)> {
        if self.is_png() {
            Raster::read_png_size(self.data.as_slice())
        } else {
            bmp::read_icon_frame_size(&self.data)
        }
    }

    /// Decodes the frame.  Fails if the data is malformed or its size
    /// disagrees with the directory entry.
    pub fn decode(&self) -> io::Result<Raster> {
        let raster = if self.is_png() {
            Raster::read_png(self.data.as_slice())?
        } else {
            bmp::decode_icon_frame(&self.data)?
        };
        if raster.width() != self.width || raster.height() != self.height {
            invalid_data!(
                "Encoded image has wrong dimensions \
                 (was {}x{}, but should be {}x{})",
                raster.width(),
                raster.height(),
                self.width,
                self.height
            );
        }
        Ok(raster)
    }

    /// Encodes a raster with the given storage format.
    pub fn encode(
        raster: &Raster,
        encoding: FrameEncoding,
    ) -> io::Result<Frame> {
        let stats = raster.color_stats();
        let use_png = match encoding {
            FrameEncoding::Png => true,
            FrameEncoding::Bmp => false,
            // PNG compresses large or smoothly translucent images much
            // better; small simple ones stay DIB for older readers.
            FrameEncoding::Auto => {
                stats.has_nonbinary_alpha
                    || raster.width() * raster.height() > MAX_AUTO_BMP_PIXELS
            }
        };
        if use_png {
            Frame::encode_png_with_stats(raster, &stats)
        } else {
            Frame::encode_bmp_with_stats(raster, &stats)
        }
    }

    /// Encodes a raster as an embedded PNG.
    pub fn encode_png(raster: &Raster) -> io::Result<Frame> {
        Frame::encode_png_with_stats(raster, &raster.color_stats())
    }

    /// Encodes a raster as a DIB with an AND-mask.
    pub fn encode_bmp(raster: &Raster) -> io::Result<Frame> {
        Frame::encode_bmp_with_stats(raster, &raster.color_stats())
    }

    fn encode_png_with_stats(
        raster: &Raster,
        stats: &ColorStats,
    ) -> io::Result<Frame> {
        let mut data = Vec::new();
        let bits_per_pixel = raster.write_png_with_stats(stats, &mut data)?;
        Ok(Frame {
            width: raster.width(),
            height: raster.height(),
            num_colors: 0,
            color_planes: 0,
            bits_per_pixel,
            data,
        })
    }

    fn encode_bmp_with_stats(
        raster: &Raster,
        stats: &ColorStats,
    ) -> io::Result<Frame> {
        let dib = bmp::encode_icon_frame(raster, stats)?;
        Ok(Frame {
            width: raster.width(),
            height: raster.height(),
            num_colors: dib.num_colors,
            color_planes: 1,
            bits_per_pixel: dib.bits_per_pixel,
            data: dib.data,
        })
    }
}

//===========================================================================//


//===========================================================================//
