//! A self describing binary layout for one bitmap.
//!
//! | field | size |
//! |---|---|
//! | magic `PXQB` | 4 |
//! | version | 1 |
//! | pixel format | 1 |
//! | working color space | 1 |
//! | alpha threshold | 1 |
//! | width, height | 4 + 4 |
//! | back color (ARGB) | 4 |
//! | palette length, 0 if none | 4 |
//! | palette entries (ARGB) | 4 each |
//! | rows, packed without padding | `height` × row bytes |
//!
//! Multi-byte values are little-endian. Rows hold the raw pixels of the format, so loading a saved
//! bitmap reproduces its pixels bit for bit.

use super::{BitmapData, PixelLayout, RawRow, codec};
use crate::{BitmapError, Color32, KnownPixelFormat, Palette, PersistError, WorkingColorSpace};
use alloc::{vec, vec::Vec};
use core::sync::atomic::AtomicU8;
use std::io::{self, Read, Write};

const MAGIC: [u8; 4] = *b"PXQB";
const VERSION: u8 = 1;

fn read_array<const N: usize>(reader: &mut impl Read) -> Result<[u8; N], PersistError> {
    let mut bytes = [0; N];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_u32(reader: &mut impl Read) -> Result<u32, PersistError> {
    read_array(reader).map(u32::from_le_bytes)
}

impl BitmapData {
    /// Write this bitmap, or the visible part of a clipped view, to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Bitmap`] with [`BitmapError::UnsupportedFormat`] for custom pixel
    /// formats, or [`PersistError::Io`] if writing fails.
    pub fn save(&self, mut writer: impl Write) -> Result<(), PersistError> {
        let PixelLayout::Known(format) = &self.layout else {
            return Err(BitmapError::UnsupportedFormat.into());
        };

        let mut header = Vec::with_capacity(24);
        header.extend_from_slice(&MAGIC);
        header.extend_from_slice(&[
            VERSION,
            format.to_id(),
            self.working_color_space.to_id(),
            self.alpha_threshold,
        ]);
        header.extend_from_slice(&self.width.to_le_bytes());
        header.extend_from_slice(&self.height.to_le_bytes());
        header.extend_from_slice(&self.back_color.to_argb_u32().to_le_bytes());
        let entries = self.palette().map(Palette::entries).unwrap_or_default();
        #[allow(clippy::cast_possible_truncation)]
        header.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for entry in entries {
            header.extend_from_slice(&entry.to_argb_u32().to_le_bytes());
        }
        writer.write_all(&header)?;

        // every pixel is rewritten per row, and trailing padding bits stay zero
        let bpp = self.info.bits_per_pixel();
        let len = self.info.row_bytes(self.width);
        let scratch: Vec<_> = (0..len).map(|_| AtomicU8::new(0)).collect();
        let mut packed = vec![0u8; len];
        for y in 0..self.height {
            let (source, dest) = (self.backing_row(y), RawRow::new(&scratch));
            for x in 0..self.width {
                let raw = codec::read_raw(source, (self.left + x) as usize, bpp);
                codec::write_raw(dest, x as usize, bpp, raw);
            }
            dest.copy_to_slice(&mut packed);
            writer.write_all(&packed)?;
        }
        log::debug!("saved {}x{} bitmap ({format:?})", self.width, self.height);
        Ok(())
    }

    /// Read a bitmap written by [`BitmapData::save`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidMagic`], [`PersistError::UnsupportedVersion`], or
    /// [`PersistError::InvalidHeader`] if the data is not a saved bitmap, [`PersistError::Bitmap`]
    /// if the described bitmap is invalid, or [`PersistError::Io`] if reading fails.
    pub fn load(mut reader: impl Read) -> Result<Self, PersistError> {
        if read_array::<4>(&mut reader)? != MAGIC {
            return Err(PersistError::InvalidMagic);
        }
        let [version, format, space, alpha_threshold] = read_array(&mut reader)?;
        if version != VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        let format =
            KnownPixelFormat::from_id(format).ok_or(PersistError::InvalidHeader("pixel format"))?;
        let space =
            WorkingColorSpace::from_id(space).ok_or(PersistError::InvalidHeader("color space"))?;
        let width = read_u32(&mut reader)?;
        let height = read_u32(&mut reader)?;
        let back_color = Color32::from_argb_u32(read_u32(&mut reader)?);

        let palette_len = read_u32(&mut reader)? as usize;
        let palette = if palette_len == 0 {
            None
        } else {
            if palette_len > Palette::MAX_LEN {
                return Err(PersistError::InvalidHeader("palette length"));
            }
            let entries = (0..palette_len)
                .map(|_| read_u32(&mut reader).map(Color32::from_argb_u32))
                .collect::<Result<Vec<_>, _>>()?;
            let palette = Palette::new(entries, space, back_color, alpha_threshold)
                .map_err(|_| PersistError::InvalidHeader("palette length"))?;
            Some(palette)
        };

        // the buffer only grows as row data arrives, so a header alone cannot claim memory
        let row_bytes = format.info().row_bytes(width);
        let len = u64::try_from(row_bytes)
            .ok()
            .and_then(|row_bytes| row_bytes.checked_mul(u64::from(height)))
            .filter(|&len| usize::try_from(len).is_ok())
            .ok_or(PersistError::InvalidHeader("dimensions"))?;
        let mut data = Vec::new();
        reader.by_ref().take(len).read_to_end(&mut data)?;
        if (data.len() as u64) < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let mut bitmap = Self::from_buffer(data, width, height, row_bytes, format)?
            .with_back_color(back_color)
            .with_alpha_threshold(alpha_threshold)
            .with_working_color_space(space);
        if let Some(palette) = palette {
            bitmap = bitmap.with_palette(palette)?;
        }
        log::debug!("loaded {width}x{height} bitmap ({format:?})");
        Ok(bitmap)
    }
}
