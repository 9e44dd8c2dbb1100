//! Byte cursors handed to state components
//!
//! Each component gets a cursor over exactly the window of the element state
//! section it owns. Multi-byte values are little-endian.

/// Write cursor over one component's state window
#[derive(Debug)]
pub struct StateWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    overrun: bool,
}

impl<'a> StateWriter<'a> {
    /// Create a writer over `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            overrun: false,
        }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left in the window
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// A write did not fit the window
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Write raw bytes
    ///
    /// Bytes that do not fit are dropped and the overrun flag is raised.
    pub fn write_bytes(&mut self, data: &[u8]) {
        if data.len() > self.remaining() {
            self.overrun = true;
            return;
        }
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    /// Write a `u8`
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Write an `i8`
    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a `bool` as one byte
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    /// Write a `u16`
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write an `i16`
    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write an `i32`
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a `u64`
    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write an `i64`
    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write an `f32`
    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }
}

/// Read cursor over one component's state window
#[derive(Debug)]
pub struct StateReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    /// Create a reader over `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left in the window
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read `N` raw bytes, or `None` past the end of the window
    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    /// Borrow the next `len` bytes, or `None` past the end of the window
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let buf: &'a [u8] = self.buf;
        let bytes = &buf[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    /// Read a `u8`
    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|b| b[0])
    }

    /// Read an `i8`
    pub fn read_i8(&mut self) -> Option<i8> {
        self.read_array().map(i8::from_le_bytes)
    }

    /// Read a `bool` (any non-zero byte is `true`)
    pub fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    /// Read a `u16`
    pub fn read_u16(&mut self) -> Option<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read an `i16`
    pub fn read_i16(&mut self) -> Option<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read an `i32`
    pub fn read_i32(&mut self) -> Option<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a `u64`
    pub fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read an `i64`
    pub fn read_i64(&mut self) -> Option<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read an `f32`
    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_array().map(f32::from_le_bytes)
    }
}
