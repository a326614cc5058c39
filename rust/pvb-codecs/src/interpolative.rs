//! Binary interpolative coding of a run through its prefix sums.
//!
//! The prefix sums `s_0 <= s_1 <= ... <= s_{n-1}` are non-decreasing. The last sum
//! is either written up front as a [`TightVByte`] or supplied by the caller as a
//! hint. The remaining sums are written by recursive bisection: the middle element
//! of a range `[low, high]` is coded in truncated binary over `high - low + 1`
//! symbols, then both halves are coded within the narrowed ranges. A range with a
//! single symbol costs nothing, so runs of zeros are free.

use pvb_common::{Error, Result};

use crate::{BlockCodec, BlockCodecKind, TightVByte, byte_at};

pub struct InterpolativeBlock;

impl InterpolativeBlock {
    pub fn encode_with_sum(values: &[u32], sum_hint: Option<u32>, out: &mut Vec<u8>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut prefix = Vec::with_capacity(values.len());
        let mut sum = 0u64;
        for &v in values {
            sum += v as u64;
            if sum > u32::MAX as u64 {
                return Err(Error::codec_overflow(BlockCodecKind::Interpolative.name(), sum));
            }
            prefix.push(sum as u32);
        }
        let sum = sum as u32;
        match sum_hint {
            Some(hint) if hint != sum => {
                return Err(Error::invalid_arg(
                    "sum_hint",
                    format!("hint {hint} does not match the run sum {sum}"),
                ));
            }
            Some(_) => {}
            None => TightVByte::encode_one(sum, out),
        }
        let mut writer = BitWriter::new(out);
        write_interpolative(&mut writer, &prefix[..prefix.len() - 1], 0, sum);
        writer.finish();
        Ok(())
    }

    pub fn decode_with_sum(input: &[u8], out: &mut [u32], sum_hint: Option<u32>) -> Result<usize> {
        let n = out.len();
        if n == 0 {
            return Ok(0);
        }
        let mut pos = 0;
        let sum = match sum_hint {
            Some(hint) => hint,
            None => TightVByte::decode_one(input, &mut pos)?,
        };
        let mut reader = BitReader::new(&input[pos..]);
        read_interpolative(&mut reader, &mut out[..n - 1], 0, sum)?;
        out[n - 1] = sum;
        for i in (1..n).rev() {
            out[i] -= out[i - 1];
        }
        Ok(pos + reader.consumed())
    }
}

impl BlockCodec for InterpolativeBlock {
    const KIND: BlockCodecKind = BlockCodecKind::Interpolative;
    const FALLBACK_THRESHOLD: usize = 0;

    #[inline]
    fn posting_cost(value: u64, base: u64) -> u64 {
        debug_assert!(value >= base);
        let x = value - base;
        (64 - x.leading_zeros()) as u64 + 1
    }

    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        Self::encode_with_sum(values, None, out)
    }

    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize> {
        Self::decode_with_sum(input, out, None)
    }

    fn encode(values: &[u32], sum_hint: Option<u32>, out: &mut Vec<u8>) -> Result<()> {
        Self::encode_with_sum(values, sum_hint, out)
    }

    fn decode(input: &[u8], out: &mut [u32], sum_hint: Option<u32>) -> Result<usize> {
        Self::decode_with_sum(input, out, sum_hint)
    }
}

fn write_interpolative(writer: &mut BitWriter, sums: &[u32], low: u32, high: u32) {
    if sums.is_empty() || low == high {
        return;
    }
    let h = sums.len() / 2;
    let val = sums[h];
    writer.write_truncated((val - low) as u64, (high - low) as u64 + 1);
    write_interpolative(writer, &sums[..h], low, val);
    write_interpolative(writer, &sums[h + 1..], val, high);
}

fn read_interpolative(reader: &mut BitReader, out: &mut [u32], low: u32, high: u32) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    if low == high {
        out.fill(low);
        return Ok(());
    }
    let h = out.len() / 2;
    let val = low + reader.read_truncated((high - low) as u64 + 1)? as u32;
    out[h] = val;
    let (left, right) = out.split_at_mut(h);
    read_interpolative(reader, left, low, val)?;
    read_interpolative(reader, &mut right[1..], val, high)
}

#[inline]
fn symbol_bits(range: u64) -> u32 {
    64 - (range - 1).leading_zeros()
}

/// LSB-first bit packer appending whole bytes to the output.
struct BitWriter<'a> {
    out: &'a mut Vec<u8>,
    acc: u64,
    filled: u32,
}

impl<'a> BitWriter<'a> {
    fn new(out: &'a mut Vec<u8>) -> BitWriter<'a> {
        BitWriter {
            out,
            acc: 0,
            filled: 0,
        }
    }

    #[inline]
    fn write(&mut self, bits: u64, len: u32) {
        debug_assert!(len <= 32);
        self.acc |= bits << self.filled;
        self.filled += len;
        while self.filled >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.filled -= 8;
        }
    }

    /// Writes `x < range` using `b - 1` bits for the short codewords and `b` bits for
    /// the rest, where `b = ceil(log2(range))`. Long codewords share their first
    /// `b - 1` bits pairwise, which keeps the code prefix free in LSB-first order.
    fn write_truncated(&mut self, x: u64, range: u64) {
        debug_assert!(x < range);
        if range <= 1 {
            return;
        }
        let b = symbol_bits(range);
        let short = (1u64 << b) - range;
        if x < short {
            self.write(x, b - 1);
        } else {
            let k = x - short;
            self.write(short + (k >> 1), b - 1);
            self.write(k & 1, 1);
        }
    }

    fn finish(mut self) {
        if self.filled > 0 {
            self.out.push(self.acc as u8);
            self.acc = 0;
            self.filled = 0;
        }
    }
}

struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    acc: u64,
    filled: u32,
}

impl<'a> BitReader<'a> {
    fn new(input: &'a [u8]) -> BitReader<'a> {
        BitReader {
            input,
            pos: 0,
            acc: 0,
            filled: 0,
        }
    }

    #[inline]
    fn read(&mut self, len: u32) -> Result<u64> {
        while self.filled < len {
            let b = byte_at(self.input, self.pos, BlockCodecKind::Interpolative)?;
            self.acc |= (b as u64) << self.filled;
            self.filled += 8;
            self.pos += 1;
        }
        let value = self.acc & ((1u64 << len) - 1);
        self.acc >>= len;
        self.filled -= len;
        Ok(value)
    }

    fn read_truncated(&mut self, range: u64) -> Result<u64> {
        if range <= 1 {
            return Ok(0);
        }
        let b = symbol_bits(range);
        let short = (1u64 << b) - range;
        let y = self.read(b - 1)?;
        if y < short {
            Ok(y)
        } else {
            let e = self.read(1)?;
            Ok(short + (((y - short) << 1) | e))
        }
    }

    /// Bytes pulled from the input so far.
    fn consumed(&self) -> usize {
        self.pos
    }
}
