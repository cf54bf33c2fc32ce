//! MSB-first bit packing over fixed byte buffers.
//!
//! Callers pass field widths that sum to at most the buffer length; both
//! records in this crate use fixed layouts that satisfy this.

pub(crate) struct BitWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BitWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Append the low `width` bits of `value`.
    pub(crate) fn put(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            if (value >> i) & 1 == 1 {
                self.buf[self.pos / 8] |= 0x80 >> (self.pos % 8);
            }
            self.pos += 1;
        }
    }

    pub(crate) fn put_bool(&mut self, value: bool) {
        self.put(value as u64, 1);
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

pub(crate) struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read the next `width` bits as an unsigned value.
    pub(crate) fn take(&mut self, width: u32) -> u64 {
        let mut value = 0u64;
        for _ in 0..width {
            let bit = (self.buf[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | bit as u64;
            self.pos += 1;
        }
        value
    }

    pub(crate) fn take_u8(&mut self, width: u32) -> u8 {
        self.take(width) as u8
    }

    pub(crate) fn take_bool(&mut self) -> bool {
        self.take(1) == 1
    }

    pub(crate) fn skip(&mut self, width: u32) {
        self.pos += width as usize;
    }
}
