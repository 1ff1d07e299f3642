use core::{
    error::Error,
    fmt::{self, Debug},
};
use std::io;

/// The error returned when the length of a value or input is not in the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthOutOfRange {
    /// The length of the provided value.
    len: usize,
    /// The minimum supported length.
    min: u32,
    /// The maximum supported length.
    max: u32,
}

impl LengthOutOfRange {
    #[inline]
    pub(crate) const fn check_u32<T>(slice: &[T], min: u32, max: u32) -> Result<u32, Self> {
        let len = slice.len();
        #[allow(clippy::cast_possible_truncation)]
        if min as usize <= len && len <= max as usize {
            Ok(len as u32)
        } else {
            Err(Self { len, min, max })
        }
    }

    /// The length of the rejected input.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }
}

impl fmt::Display for LengthOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { len, min, max } = *self;
        if min == 0 {
            write!(
                f,
                "got an input with length {len} which is above the maximum {max}",
            )
        } else {
            write!(
                f,
                "got an input with length {len} which is not in the supported range of {min}..={max}",
            )
        }
    }
}

impl Error for LengthOutOfRange {}

/// The error returned when a [`BitmapData`](crate::BitmapData) could not be created, bound to a
/// palette, or persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BitmapError {
    /// Width or height is zero.
    InvalidDimensions {
        /// The provided width.
        width: u32,
        /// The provided height.
        height: u32,
    },
    /// The stride is smaller than the bytes needed by one row of pixels.
    StrideTooSmall {
        /// The provided stride in bytes.
        stride: usize,
        /// The minimum stride in bytes.
        min: usize,
    },
    /// The stride is not a multiple of the buffer's element size.
    StrideNotMultipleOfElement {
        /// The provided stride in bytes.
        stride: usize,
        /// The size of one buffer element in bytes.
        element_size: usize,
    },
    /// The buffer is too short for the requested height and stride.
    BufferTooSmall {
        /// The buffer length in bytes.
        len: usize,
        /// The required length in bytes.
        required: usize,
    },
    /// The bit width of an indexed custom format exceeds the index type of its accessors.
    IndexTypeTooSmall {
        /// The bits per pixel of the format.
        bits_per_pixel: u8,
        /// The number of bits of the index type.
        index_bits: u32,
    },
    /// The accessor functions do not match the format, e.g. index functions for a
    /// non-indexed format.
    FormatMismatch,
    /// A palette has more entries than the indexed format can address.
    OversizedPalette {
        /// The number of palette entries.
        len: usize,
        /// The maximum number of entries of the format.
        max: usize,
    },
    /// The operation is not supported for custom pixel formats.
    UnsupportedFormat,
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidDimensions { width, height } => {
                write!(f, "bitmap dimensions of ({width}, {height}) must both be at least 1")
            }
            Self::StrideTooSmall { stride, min } => {
                write!(f, "stride of {stride} bytes is below the row size of {min} bytes")
            }
            Self::StrideNotMultipleOfElement { stride, element_size } => write!(
                f,
                "stride of {stride} bytes is not a multiple of the element size of {element_size} bytes",
            ),
            Self::BufferTooSmall { len, required } => {
                write!(f, "buffer of {len} bytes is shorter than the required {required} bytes")
            }
            Self::IndexTypeTooSmall { bits_per_pixel, index_bits } => write!(
                f,
                "a {bits_per_pixel} bit indexed format cannot be accessed through a {index_bits} bit index",
            ),
            Self::FormatMismatch => f.write_str("pixel accessors do not match the pixel format"),
            Self::OversizedPalette { len, max } => write!(
                f,
                "palette of {len} entries is larger than the {max} entries the format can address",
            ),
            Self::UnsupportedFormat => {
                f.write_str("the operation is not supported for custom pixel formats")
            }
        }
    }
}

impl Error for BitmapError {}

/// The error returned when loading or saving a bitmap fails.
#[derive(Debug)]
#[non_exhaustive]
pub enum PersistError {
    /// The underlying reader or writer failed.
    Io(io::Error),
    /// The data does not start with the expected magic bytes.
    InvalidMagic,
    /// The data was written by an unsupported version.
    UnsupportedVersion(u8),
    /// A header field holds an unknown value.
    InvalidHeader(&'static str),
    /// The described bitmap could not be created.
    Bitmap(BitmapError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::InvalidMagic => f.write_str("data is not a persisted bitmap"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported persisted bitmap version {version}")
            }
            Self::InvalidHeader(field) => write!(f, "invalid {field} in persisted bitmap header"),
            Self::Bitmap(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Bitmap(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    #[inline]
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<BitmapError> for PersistError {
    #[inline]
    fn from(err: BitmapError) -> Self {
        Self::Bitmap(err)
    }
}
