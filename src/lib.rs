//! Resamples an icon into a multi-resolution ICO file.
//!
//! The whole job is one call:
//!
//! ```no_run
//! let config = icofix::ResizeConfig::default();
//! icofix::resize_icon(&config)?;
//! println!("{}", icofix::confirmation_message(&config));
//! # Ok::<(), icofix::IconResizeError>(())
//! ```
//!
//! By default this reads `./icons/icon.ico` and writes
//! `./icons/icon_fixed.ico` with 256, 128, 64, 48, 32 and 16 pixel frames.
//! The input may also be a cursor, PNG or BMP file.

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bmp;
mod config;
mod container;
mod error;
mod raster;
mod resample;
mod resizer;
mod source;

pub use crate::config::{
    FrameEncoding, IconSize, ResampleFilter, ResizeConfig, DEFAULT_INPUT_PATH,
    DEFAULT_OUTPUT_PATH, DEFAULT_SIZES,
};
pub use crate::container::{Frame, IconContainer, ResourceType};
pub use crate::error::IconResizeError;
pub use crate::raster::Raster;
pub use crate::resample::resample;
pub use crate::resizer::{confirmation_message, resize_icon};
pub use crate::source::{decode_source, read_source, SourceFormat};
