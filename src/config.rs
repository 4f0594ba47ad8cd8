use crate::error::IconResizeError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

//===========================================================================//

/// Where the input icon is read from unless overridden.
pub const DEFAULT_INPUT_PATH: &str = "./icons/icon.ico";

/// Where the resized icon is written unless overridden.
pub const DEFAULT_OUTPUT_PATH: &str = "./icons/icon_fixed.ico";

/// The resolutions embedded in the output icon unless overridden, largest
/// first.
pub const DEFAULT_SIZES: [IconSize; 6] = [
    IconSize::square(256),
    IconSize::square(128),
    IconSize::square(64),
    IconSize::square(48),
    IconSize::square(32),
    IconSize::square(16),
];

// An ICONDIRENTRY stores each dimension in one byte, with 0 meaning 256.
const MIN_DIMENSION: u32 = 1;
const MAX_DIMENSION: u32 = 256;

//===========================================================================//

/// The pixel dimensions of one frame in the output icon.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IconSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IconSize {
    /// Creates a size with the given width and height.
    pub const fn new(width: u32, height: u32) -> IconSize {
        IconSize { width, height }
    }

    /// Creates a square size.
    pub const fn square(side: u32) -> IconSize {
        IconSize { width: side, height: side }
    }

    fn is_in_range(&self) -> bool {
        (MIN_DIMENSION..=MAX_DIMENSION).contains(&self.width)
            && (MIN_DIMENSION..=MAX_DIMENSION).contains(&self.height)
    }
}

impl fmt::Display for IconSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for IconSize {
    type Err = String;

    /// Parses either `"WxH"` or a single number for a square size.
    fn from_str(text: &str) -> Result<IconSize, String> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|error| format!("Invalid size {:?}: {}", text, error))
        };
        match text.split_once(&['x', 'X'][..]) {
            Some((width, height)) => {
                Ok(IconSize::new(parse(width)?, parse(height)?))
            }
            None => Ok(IconSize::square(parse(text)?)),
        }
    }
}

//===========================================================================//

/// How each resampled frame is stored inside the icon container.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum FrameEncoding {
    /// Every frame as an embedded PNG.
    #[default]
    Png,
    /// Every frame as an uncompressed DIB with an AND-mask.
    Bmp,
    /// PNG for large frames or frames with partial transparency, DIB
    /// otherwise.
    Auto,
}

impl FromStr for FrameEncoding {
    type Err = String;

    fn from_str(text: &str) -> Result<FrameEncoding, String> {
        match text.to_ascii_lowercase().as_str() {
            "png" => Ok(FrameEncoding::Png),
            "bmp" => Ok(FrameEncoding::Bmp),
            "auto" => Ok(FrameEncoding::Auto),
            _ => Err(format!("Unknown frame encoding {:?}", text)),
        }
    }
}

/// The resampling kernel used to produce each frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResampleFilter {
    /// Nearest neighbor.
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with a window of 3.
    #[default]
    Lanczos3,
}

impl FromStr for ResampleFilter {
    type Err = String;

    fn from_str(text: &str) -> Result<ResampleFilter, String> {
        match text.to_ascii_lowercase().as_str() {
            "nearest" => Ok(ResampleFilter::Nearest),
            "triangle" | "bilinear" => Ok(ResampleFilter::Triangle),
            "catmullrom" | "bicubic" => Ok(ResampleFilter::CatmullRom),
            "gaussian" => Ok(ResampleFilter::Gaussian),
            "lanczos3" | "lanczos" => Ok(ResampleFilter::Lanczos3),
            _ => Err(format!("Unknown resample filter {:?}", text)),
        }
    }
}

//===========================================================================//

/// Everything `resize_icon` needs to know: where to read, where to write,
/// and which frames to produce.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ResizeConfig {
    /// The icon (or PNG/BMP image) to read.
    pub input_path: PathBuf,
    /// The icon file to create or replace.
    pub output_path: PathBuf,
    /// One output frame per entry, in this order.
    pub sizes: Vec<IconSize>,
    /// Resampling kernel.
    pub filter: ResampleFilter,
    /// Storage format of each frame.
    pub encoding: FrameEncoding,
}

impl Default for ResizeConfig {
    fn default() -> ResizeConfig {
        ResizeConfig {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            sizes: DEFAULT_SIZES.to_vec(),
            filter: ResampleFilter::default(),
            encoding: FrameEncoding::default(),
        }
    }
}

impl ResizeConfig {
    /// Replaces the input path.
    pub fn with_input_path<P: AsRef<Path>>(mut self, path: P) -> ResizeConfig {
        self.input_path = path.as_ref().to_path_buf();
        self
    }

    /// Replaces the output path.
    pub fn with_output_path<P: AsRef<Path>>(
        mut self,
        path: P,
    ) -> ResizeConfig {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    /// Replaces the size list.
    pub fn with_sizes<I>(mut self, sizes: I) -> ResizeConfig
    where
        I: IntoIterator<Item = IconSize>,
    {
        self.sizes = sizes.into_iter().collect();
        self
    }

    /// Replaces the resampling filter.
    pub fn with_filter(mut self, filter: ResampleFilter) -> ResizeConfig {
        self.filter = filter;
        self
    }

    /// Replaces the frame encoding.
    pub fn with_encoding(mut self, encoding: FrameEncoding) -> ResizeConfig {
        self.encoding = encoding;
        self
    }

    /// Checks that the size list can be represented in an icon container:
    /// non-empty, no duplicates, and every dimension in `1..=256`.
    pub fn validate(&self) -> Result<(), IconResizeError> {
        if self.sizes.is_empty() {
            return Err(IconResizeError::InvalidConfig(
                "Size list is empty".to_string(),
            ));
        }
        if self.sizes.len() > (u16::MAX as usize) {
            return Err(IconResizeError::InvalidConfig(format!(
                "Too many sizes (was {}, but max is {})",
                self.sizes.len(),
                u16::MAX
            )));
        }
        let mut seen = HashSet::with_capacity(self.sizes.len());
        for size in self.sizes.iter() {
            if !size.is_in_range() {
                return Err(IconResizeError::InvalidConfig(format!(
                    "Invalid size {} (each dimension must be {} to {})",
                    size, MIN_DIMENSION, MAX_DIMENSION
                )));
            }
            if !seen.insert(*size) {
                return Err(IconResizeError::InvalidConfig(format!(
                    "Duplicate size {}",
                    size
                )));
            }
        }
        Ok(())
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{FrameEncoding, IconSize, ResampleFilter, ResizeConfig};
    use std::path::Path;

    #[test]
    fn default_config_matches_fixed_values() {
        let config = ResizeConfig::default();
        assert_eq!(config.input_path, Path::new("./icons/icon.ico"));
        assert_eq!(config.output_path, Path::new("./icons/icon_fixed.ico"));
        let sides: Vec<u32> = config.sizes.iter().map(|s| s.width).collect();
        assert_eq!(sides, vec![256, 128, 64, 48, 32, 16]);
        assert!(config.sizes.iter().all(|s| s.width == s.height));
        assert_eq!(config.filter, ResampleFilter::Lanczos3);
        assert_eq!(config.encoding, FrameEncoding::Png);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_icon_sizes() {
        assert_eq!("48".parse::<IconSize>(), Ok(IconSize::square(48)));
        assert_eq!("64x32".parse::<IconSize>(), Ok(IconSize::new(64, 32)));
        assert_eq!("20X10".parse::<IconSize>(), Ok(IconSize::new(20, 10)));
        assert!("x32".parse::<IconSize>().is_err());
        assert!("big".parse::<IconSize>().is_err());
        assert_eq!(IconSize::new(48, 32).to_string(), "48x32");
    }

    #[test]
    fn parse_encodings_and_filters() {
        assert_eq!("PNG".parse::<FrameEncoding>(), Ok(FrameEncoding::Png));
        assert_eq!("auto".parse::<FrameEncoding>(), Ok(FrameEncoding::Auto));
        assert!("gif".parse::<FrameEncoding>().is_err());
        assert_eq!(
            "bicubic".parse::<ResampleFilter>(),
            Ok(ResampleFilter::CatmullRom)
        );
        assert!("sinc".parse::<ResampleFilter>().is_err());
    }

    #[test]
    fn reject_empty_size_list() {
        let config = ResizeConfig::default().with_sizes(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_out_of_range_sizes() {
        for &size in &[IconSize::square(0), IconSize::new(257, 16)] {
            let config = ResizeConfig::default().with_sizes(vec![size]);
            assert!(config.validate().is_err(), "{} was accepted", size);
        }
        let config =
            ResizeConfig::default().with_sizes(vec![IconSize::new(256, 1)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reject_duplicate_sizes() {
        let config = ResizeConfig::default()
            .with_sizes(vec![IconSize::square(32), IconSize::square(32)]);
        assert!(config.validate().is_err());
    }
}

//===========================================================================//
