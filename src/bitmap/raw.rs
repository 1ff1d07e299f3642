use bytemuck::Pod;
use core::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Byte and bit level access to the memory of one bitmap row.
///
/// Bits within a byte are numbered from the most significant bit, so bit offset `0` is the
/// top bit of the first byte. Multi-byte typed values use the machine's byte order.
///
/// All accesses are bounds checked against the row length and panic when out of range. Writes
/// of sub-byte values only modify the addressed bits, even when other threads write
/// neighboring bits of the same byte.
#[derive(Clone, Copy)]
pub struct RawRow<'a> {
    bytes: &'a [AtomicU8],
}

impl<'a> RawRow<'a> {
    #[inline]
    pub(crate) fn new(bytes: &'a [AtomicU8]) -> Self {
        Self { bytes }
    }

    /// The length of the row in bytes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the row has no accessible bytes.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read the byte at `offset`.
    #[must_use]
    #[inline]
    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset].load(Ordering::Relaxed)
    }

    /// Write the byte at `offset`.
    #[inline]
    pub fn write_u8(&self, offset: usize, value: u8) {
        self.bytes[offset].store(value, Ordering::Relaxed);
    }

    /// Read the `index`-th element of type `T`.
    #[must_use]
    pub fn read<T: Pod>(&self, index: usize) -> T {
        let size = size_of::<T>();
        let src = &self.bytes[index * size..(index + 1) * size];
        let mut value = T::zeroed();
        for (dst, src) in bytemuck::bytes_of_mut(&mut value).iter_mut().zip(src) {
            *dst = src.load(Ordering::Relaxed);
        }
        value
    }

    /// Write the `index`-th element of type `T`.
    pub fn write<T: Pod>(&self, index: usize, value: T) {
        let size = size_of::<T>();
        let dst = &self.bytes[index * size..(index + 1) * size];
        for (dst, &src) in dst.iter().zip(bytemuck::bytes_of(&value)) {
            dst.store(src, Ordering::Relaxed);
        }
    }

    /// Read `count` bits (at most 128) starting at `bit_offset`. The first bit read becomes the
    /// most significant bit of the result.
    #[must_use]
    pub fn read_bits(&self, bit_offset: usize, count: u32) -> u128 {
        assert!(count <= u128::BITS, "cannot read more than 128 bits");
        let mut value = 0u128;
        let mut remaining = count;
        let mut pos = bit_offset;
        while remaining > 0 {
            let byte = self.read_u8(pos / 8);
            #[allow(clippy::cast_possible_truncation)]
            let available = 8 - (pos % 8) as u32;
            let take = available.min(remaining);
            let bits = (u32::from(byte) >> (available - take)) & ((1 << take) - 1);
            value = value << take | u128::from(bits);
            remaining -= take;
            pos += take as usize;
        }
        value
    }

    /// Write the low `count` bits (at most 128) of `value` starting at `bit_offset`, most
    /// significant bit first.
    pub fn write_bits(&self, bit_offset: usize, count: u32, value: u128) {
        assert!(count <= u128::BITS, "cannot write more than 128 bits");
        let mut remaining = count;
        let mut pos = bit_offset;
        while remaining > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let available = 8 - (pos % 8) as u32;
            let take = available.min(remaining);
            let shift = available - take;
            #[allow(clippy::cast_possible_truncation)]
            let mask = (((1u32 << take) - 1) << shift) as u8;
            #[allow(clippy::cast_possible_truncation)]
            let bits = (((value >> (remaining - take)) as u32 & ((1 << take) - 1)) << shift) as u8;
            let byte = &self.bytes[pos / 8];
            if mask == u8::MAX {
                byte.store(bits, Ordering::Relaxed);
            } else {
                let _ = byte.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
                    Some((old & !mask) | bits)
                });
            }
            remaining -= take;
            pos += take as usize;
        }
    }

    /// Read an unsigned little-endian integer of `len` bytes (at most 16) at byte `offset`.
    #[must_use]
    pub(crate) fn read_le(&self, offset: usize, len: usize) -> u128 {
        self.bytes[offset..offset + len]
            .iter()
            .rev()
            .fold(0, |acc, b| acc << 8 | u128::from(b.load(Ordering::Relaxed)))
    }

    /// Write the low `len` bytes (at most 16) of `value` little-endian at byte `offset`.
    pub(crate) fn write_le(&self, offset: usize, len: usize, value: u128) {
        for (i, byte) in self.bytes[offset..offset + len].iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            byte.store((value >> (i * 8)) as u8, Ordering::Relaxed);
        }
    }

    /// A sub-range of the row.
    #[must_use]
    pub(crate) fn slice(&self, offset: usize, len: usize) -> Self {
        Self { bytes: &self.bytes[offset..offset + len] }
    }

    /// Copy the row into `out`, which must have the same length.
    pub fn copy_to_slice(&self, out: &mut [u8]) {
        assert_eq!(out.len(), self.len(), "slice length must match the row length");
        for (dst, src) in out.iter_mut().zip(self.bytes) {
            *dst = src.load(Ordering::Relaxed);
        }
    }

    /// Overwrite the row with `data`, which must have the same length.
    pub fn copy_from_slice(&self, data: &[u8]) {
        assert_eq!(data.len(), self.len(), "slice length must match the row length");
        for (dst, &src) in self.bytes.iter().zip(data) {
            dst.store(src, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for RawRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRow").field("len", &self.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(len: usize) -> alloc::vec::Vec<AtomicU8> {
        (0..len).map(|_| AtomicU8::new(0)).collect()
    }

    #[test]
    fn bits_are_msb_first() {
        let bytes = row(2);
        let raw = RawRow::new(&bytes);
        raw.write_bits(0, 1, 1);
        assert_eq!(raw.read_u8(0), 0b1000_0000);
        raw.write_bits(5, 6, 0b10_1101);
        assert_eq!(raw.read_u8(0), 0b1000_0101);
        assert_eq!(raw.read_u8(1), 0b1010_0000);
        assert_eq!(raw.read_bits(5, 6), 0b10_1101);
        assert_eq!(raw.read_bits(0, 16), 0b1000_0101_1010_0000);
    }

    #[test]
    fn sub_byte_writes_keep_neighbors() {
        let bytes = row(1);
        let raw = RawRow::new(&bytes);
        raw.write_u8(0, 0xFF);
        raw.write_bits(2, 3, 0);
        assert_eq!(raw.read_u8(0), 0b1100_0111);
    }

    #[test]
    fn odd_widths_round_trip() {
        let bytes = row(32);
        let raw = RawRow::new(&bytes);
        for (i, width) in [3u32, 9, 17, 33, 65, 127, 128].into_iter().enumerate() {
            let value = u128::MAX >> (128 - width);
            let offset = i * 3;
            raw.write_bits(offset, width, value);
            assert_eq!(raw.read_bits(offset, width), value, "width {width}");
            raw.write_bits(offset, width, 0);
            assert_eq!(raw.read_bits(offset, width), 0);
        }
    }

    #[test]
    fn typed_elements() {
        let bytes = row(8);
        let raw = RawRow::new(&bytes);
        raw.write::<u16>(1, 0xBEEF);
        assert_eq!(raw.read::<u16>(1), 0xBEEF);
        if cfg!(target_endian = "little") {
            assert_eq!(raw.read_le(2, 2), 0xBEEF);
        }
        raw.write_le(4, 3, 0x0A0B0C);
        assert_eq!(raw.read_u8(4), 0x0C);
        assert_eq!(raw.read_le(4, 3), 0x0A0B0C);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn reads_are_bounds_checked() {
        let bytes = row(2);
        let _ = RawRow::new(&bytes).read::<u32>(0);
    }
}
