//! Length-prefixed binary records.
//!
//! Integers are big-endian. Byte strings carry a leading size written in
//! 7-bit groups, most significant group first, with `0x80` set on every group
//! except the last. At most four groups are allowed, so sizes are capped at
//! `0x0fff_ffff`.

use crate::error::{CodecError, Result};

/// Largest size a prefix can carry.
pub const MAX_SIZE: u32 = 0x0fff_ffff;

const MAX_SIZE_GROUPS: usize = 4;

#[derive(Debug, Default, Clone)]
pub struct SimpleEncoder {
    buf: Vec<u8>,
}

impl SimpleEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a size prefix.
    ///
    /// Callers only ever pass lengths of in-memory buffers; a length above
    /// [`MAX_SIZE`] is rejected.
    pub fn write_size(&mut self, size: usize) -> Result<()> {
        let size = u32::try_from(size)
            .ok()
            .filter(|s| *s <= MAX_SIZE)
            .ok_or(CodecError::SizeTooLarge(size as u64))?;

        let mut groups = [0u8; MAX_SIZE_GROUPS];
        let mut used = 0usize;
        let mut rest = size;
        loop {
            groups[used] = (rest & 0x7f) as u8;
            used = used.saturating_add(1);
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        for i in (0..used).rev() {
            let group = groups[i];
            self.buf.push(if i > 0 { group | 0x80 } else { group });
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_size(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Appends bytes without a size prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct SimpleDecoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> SimpleDecoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.input.len().saturating_sub(self.pos)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails with [`CodecError::TrailingBytes`] unless every byte was consumed.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining,
            });
        }
        let start = self.pos;
        self.pos = start.saturating_add(n);
        Ok(&self.input[start..self.pos])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_size(&mut self) -> Result<usize> {
        let mut size = 0u32;
        for _ in 0..MAX_SIZE_GROUPS {
            let group = self.read_u8()?;
            size = (size << 7) | u32::from(group & 0x7f);
            if group & 0x80 == 0 {
                return Ok(size as usize);
            }
        }
        Err(CodecError::MalformedSize)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let size = self.read_size()?;
        Ok(self.take(size)?.to_vec())
    }

    /// Reads a size-prefixed field that must be exactly `N` bytes long.
    pub fn read_fixed<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let size = self.read_size()?;
        if size != N {
            return Err(CodecError::InvalidLength {
                field,
                expected: N,
                actual: size,
            });
        }
        self.take_array()
    }

    pub fn read_string(&mut self) -> Result<String> {
        String::from_utf8(self.read_bytes()?).map_err(|_| CodecError::InvalidUtf8)
    }
}
