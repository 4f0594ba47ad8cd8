use std::io;
use std::path::PathBuf;
use thiserror::Error;

//===========================================================================//

/// The ways `resize_icon` can fail.
#[derive(Debug, Error)]
pub enum IconResizeError {
    /// The input could not be read or is not a decodable image.
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        /// The input path.
        path: PathBuf,
        /// The underlying I/O or format error.
        #[source]
        source: io::Error,
    },
    /// A frame could not be encoded, or the output could not be written.
    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O or format error.
        #[source]
        source: io::Error,
    },
    /// The configuration was rejected before any file was touched.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IconResizeError {
    pub(crate) fn decode<P: Into<PathBuf>>(
        path: P,
        source: io::Error,
    ) -> IconResizeError {
        IconResizeError::Decode { path: path.into(), source }
    }

    pub(crate) fn encode<P: Into<PathBuf>>(
        path: P,
        source: io::Error,
    ) -> IconResizeError {
        IconResizeError::Encode { path: path.into(), source }
    }

    /// Returns true if this error came from reading the input.
    pub fn is_decode(&self) -> bool {
        matches!(self, IconResizeError::Decode { .. })
    }

    /// Returns true if this error came from producing the output.
    pub fn is_encode(&self) -> bool {
        matches!(self, IconResizeError::Encode { .. })
    }
}

//===========================================================================//


//===========================================================================//
