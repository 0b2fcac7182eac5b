//! Bit-granular reader over a byte slice.
//!
//! Reads are served from a 32-bit register that is refilled four bytes at a
//! time, so a byte of the source is touched exactly once no matter how the
//! caller splits its reads. Bit order is big-endian (MSB first), which is the
//! wire order of both Annex-B NAL headers and ADTS headers.

use crate::utils::errors::BitReaderError;

const RESERVOIR_BITS: usize = u32::BITS as usize;

/// Reader serving arbitrary-width reads from a 32-bit lookahead register.
///
/// # Example
///
/// ```rust
/// use esframe::utils::bit_reader::BitReservoir;
///
/// let mut reader = BitReservoir::new(&[0xFF, 0xF1, 0x50]);
/// assert_eq!(reader.get_bits(12)?, 0xFFF);
/// assert_eq!(reader.get_bits(1)?, 0);
/// reader.skip_bits(3)?;
/// assert_eq!(reader.num_bits_left(), 8);
/// # Ok::<(), esframe::utils::errors::BitReaderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BitReservoir<'a> {
    data: &'a [u8],
    origin_len: usize,
    reservoir: u32,
    bits_left: usize,
}

impl<'a> BitReservoir<'a> {
    /// Binds a reader to `data`, starting with an empty reservoir.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            origin_len: data.len(),
            reservoir: 0,
            bits_left: 0,
        }
    }

    fn fill_reservoir(&mut self) {
        self.reservoir = 0;

        let count = self.data.len().min(4);
        let (head, tail) = self.data.split_at(count);
        for &byte in head {
            self.reservoir = (self.reservoir << 8) | byte as u32;
        }
        self.data = tail;

        self.bits_left = 8 * count;
        if self.bits_left < RESERVOIR_BITS {
            // checked_shl: a refill that loaded nothing must not shift by 32
            self.reservoir = self
                .reservoir
                .checked_shl((RESERVOIR_BITS - self.bits_left) as u32)
                .unwrap_or(0);
        }
    }

    /// Takes up to `n` bits off the top of the register, `n <= bits_left`.
    #[inline(always)]
    fn take(&mut self, n: usize) -> u32 {
        debug_assert!(n > 0 && n <= self.bits_left);

        let value = self.reservoir >> (RESERVOIR_BITS - n);
        self.reservoir = self.reservoir.checked_shl(n as u32).unwrap_or(0);
        self.bits_left -= n;

        value
    }

    fn ensure_available(&self, requested: usize) -> Result<(), BitReaderError> {
        let available = self.num_bits_left();
        if requested > available {
            return Err(BitReaderError::OutOfData {
                requested,
                available,
            });
        }

        Ok(())
    }

    /// Reads the next `n` bits MSB-first.
    ///
    /// `n` is not limited by the register width; the read is split into
    /// register-sized chunks. Only the last 64 bits survive when `n > 64`.
    ///
    /// Fails without consuming anything when fewer than `n` bits remain.
    pub fn get_bits(&mut self, n: usize) -> Result<u64, BitReaderError> {
        self.ensure_available(n)?;

        let mut result = 0u64;
        let mut n = n;
        while n > 0 {
            if self.bits_left == 0 {
                self.fill_reservoir();
            }

            let m = n.min(self.bits_left);
            result = result.checked_shl(m as u32).unwrap_or(0) | self.take(m) as u64;
            n -= m;
        }

        Ok(result)
    }

    /// Reads one bit as a flag.
    #[inline(always)]
    pub fn get_bit(&mut self) -> Result<bool, BitReaderError> {
        self.get_bits(1).map(|bit| bit == 1)
    }

    /// Discards `n` bits.
    pub fn skip_bits(&mut self, n: usize) -> Result<(), BitReaderError> {
        self.ensure_available(n)?;

        let mut n = n;
        while n > RESERVOIR_BITS {
            self.get_bits(RESERVOIR_BITS)?;
            n -= RESERVOIR_BITS;
        }
        if n > 0 {
            self.get_bits(n)?;
        }

        Ok(())
    }

    /// Unsigned Exp-Golomb code, `ue(v)`.
    pub fn get_ue(&mut self) -> Result<u32, BitReaderError> {
        let mut leading_zeros = 0usize;
        while !self.get_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(BitReaderError::InvalidExpGolomb);
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.get_bits(leading_zeros)?;
        Ok(((1u64 << leading_zeros) - 1 + info) as u32)
    }

    /// Signed Exp-Golomb code, `se(v)`.
    pub fn get_se(&mut self) -> Result<i32, BitReaderError> {
        let k = self.get_ue()? as i64;
        let magnitude = (k + 1) >> 1;
        let value = if k & 1 == 1 { magnitude } else { -magnitude };

        Ok(value as i32)
    }

    /// Total unread bits, loaded and not yet loaded.
    #[inline(always)]
    pub fn num_bits_left(&self) -> usize {
        self.data.len() * 8 + self.bits_left
    }

    /// Byte offset into the original slice that the reader currently points
    /// at: bytes handed to the register minus the whole bytes still buffered
    /// in it.
    ///
    /// On a byte boundary this is the byte holding the next unread bit. In
    /// the middle of a byte it is the following byte, the first one with all
    /// of its bits unread.
    pub fn current_position(&self) -> usize {
        let consumed = self.origin_len - self.data.len();
        consumed - self.bits_left / 8
    }

    /// Whether the next read starts on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bits_left % 8 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn bit_at(data: &[u8], index: usize) -> u64 {
        ((data[index / 8] >> (7 - index % 8)) & 1) as u64
    }

    #[test]
    fn reads_across_reservoir_refills() {
        let data = [0b1011_0011, 0b0101_1010, 0xFF, 0x00, 0b1000_0001];
        let mut reader = BitReservoir::new(&data);

        assert_eq!(reader.get_bits(3).unwrap(), 0b101);
        assert_eq!(reader.get_bits(8).unwrap(), 0b1001_1010);
        assert_eq!(reader.get_bits(21).unwrap(), 0b1_1010_1111_1111_0000_0000);
        // served by the second register load
        assert_eq!(reader.get_bits(8).unwrap(), 0b1000_0001);
        assert_eq!(reader.num_bits_left(), 0);
    }

    #[test]
    fn wide_reads_keep_msb_order() {
        let data = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let mut reader = BitReservoir::new(&data);
        assert_eq!(reader.get_bits(64).unwrap(), 0x0123_4567_89AB_CDEF);

        let mut reader = BitReservoir::new(&data);
        reader.skip_bits(4).unwrap();
        assert_eq!(reader.get_bits(40).unwrap(), 0x12_3456_789A);
    }

    #[test]
    fn zero_bit_read_is_a_no_op() {
        let mut reader = BitReservoir::new(&[0xAA]);
        assert_eq!(reader.get_bits(0).unwrap(), 0);
        assert_eq!(reader.num_bits_left(), 8);
        assert_eq!(reader.current_position(), 0);
    }

    #[test]
    fn over_read_fails_without_consuming() {
        let mut reader = BitReservoir::new(&[0b1011_0011]);
        reader.get_bits(6).unwrap();

        assert_eq!(
            reader.get_bits(8),
            Err(BitReaderError::OutOfData {
                requested: 8,
                available: 2
            })
        );
        assert!(reader.skip_bits(3).is_err());
        assert_eq!(reader.get_bits(2).unwrap(), 0b11);

        let mut empty = BitReservoir::new(&[]);
        assert!(empty.get_bit().is_err());
    }

    #[test]
    fn current_position_tracks_whole_bytes() {
        let data = [0u8; 10];
        let mut reader = BitReservoir::new(&data);

        reader.skip_bits(16).unwrap();
        assert_eq!(reader.current_position(), 2);
        assert!(reader.is_byte_aligned());

        reader.skip_bits(4).unwrap();
        assert_eq!(reader.current_position(), 3);
        assert!(!reader.is_byte_aligned());

        reader.skip_bits(44).unwrap();
        assert_eq!(reader.current_position(), 8);
        assert_eq!(reader.num_bits_left(), 16);
    }

    #[test]
    fn exp_golomb_code_words() {
        // 1 | 010 | 011 | 00100 | 00111 | 0001000
        let data = [0b1010_0110, 0b0100_0011, 0b1000_1000];
        let mut reader = BitReservoir::new(&data);

        assert_eq!(reader.get_ue().unwrap(), 0);
        assert_eq!(reader.get_ue().unwrap(), 1);
        assert_eq!(reader.get_ue().unwrap(), 2);
        assert_eq!(reader.get_ue().unwrap(), 3);
        assert_eq!(reader.get_ue().unwrap(), 6);
        assert_eq!(reader.get_ue().unwrap(), 7);

        // se: 1 -> 0, 010 -> 1, 011 -> -1, 00100 -> 2, 00101 -> -2
        let data = [0b1010_0110, 0b0100_0010, 0b1000_0000];
        let mut reader = BitReservoir::new(&data);
        assert_eq!(reader.get_se().unwrap(), 0);
        assert_eq!(reader.get_se().unwrap(), 1);
        assert_eq!(reader.get_se().unwrap(), -1);
        assert_eq!(reader.get_se().unwrap(), 2);
        assert_eq!(reader.get_se().unwrap(), -2);
    }

    #[test]
    fn exp_golomb_rejects_long_prefix() {
        let data = [0u8, 0, 0, 0, 0x80];
        let mut reader = BitReservoir::new(&data);
        assert_eq!(reader.get_ue(), Err(BitReaderError::InvalidExpGolomb));
    }

    #[quickcheck]
    fn reads_match_direct_bit_indexing(data: Vec<u8>, schedule: Vec<u8>) -> bool {
        let data = &data[..data.len().min(64)];
        let mut reader = BitReservoir::new(data);
        let mut cursor = 0usize;

        for width in schedule {
            let width = (width % 65) as usize;
            if cursor + width > data.len() * 8 {
                break;
            }

            let expected = (cursor..cursor + width).fold(0u64, |acc, i| {
                acc.checked_shl(1).unwrap_or(0) | bit_at(data, i)
            });
            if reader.get_bits(width) != Ok(expected) {
                return false;
            }
            cursor += width;

            if reader.num_bits_left() != data.len() * 8 - cursor {
                return false;
            }
        }

        true
    }

    #[quickcheck]
    fn skip_then_read_matches_read_then_read(data: Vec<u8>, n: u16, m: u8) -> bool {
        let data = &data[..data.len().min(64)];
        let total = data.len() * 8;
        let n = n as usize % (total + 1);
        let m = (m as usize % 65).min(total - n);

        let mut skipping = BitReservoir::new(data);
        skipping.skip_bits(n).unwrap();

        let mut reading = BitReservoir::new(data);
        let mut rest = n;
        while rest > 0 {
            let chunk = rest.min(64);
            reading.get_bits(chunk).unwrap();
            rest -= chunk;
        }

        skipping.get_bits(m) == reading.get_bits(m)
            && skipping.num_bits_left() == reading.num_bits_left()
    }
}
