/// A DC byte buffer meant for reading packed field data.
///
/// Every scalar is fixed width and little-endian. Reads never panic; running
/// past the end of the data returns `Err(())` and leaves the index unchanged.
///
/// ```
/// let mut bb = dclass_schema::ByteBuffer::new(&[0x2a, 0x00, 0x03, 0x00, 0x61, 0x62, 0x63]);
/// assert_eq!(bb.read_u16(), Ok(42));
/// assert_eq!(bb.read_sized_bytes(), Ok(&b"abc"[..]));
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, ()> {
        if self.index >= self.data.len() {
            Err(())
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ()> {
        if self.index + len > self.data.len() {
            Err(())
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ()> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_i8(&mut self) -> Result<i8, ()> {
        Ok(self.read_byte()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, ()> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ()> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ()> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, ()> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ()> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ()> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, ()> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Try to read a `uint16` length prefix followed by that many bytes. The
    /// returned slice aliases the underlying memory.
    pub fn read_sized_bytes(&mut self) -> Result<&'a [u8], ()> {
        let start = self.index;
        let len = self.read_u16()? as usize;
        self.read_bytes(len).map_err(|_| {
            self.index = start;
        })
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(()));
    assert_eq!(bb.remaining(), 0);
}

#[test]
fn read_fixed_width() {
    assert_eq!(ByteBuffer::new(&[0xff]).read_i8(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[0x34, 0x12]).read_u16(), Ok(0x1234));
    assert_eq!(ByteBuffer::new(&[0xfe, 0xff]).read_i16(), Ok(-2));
    assert_eq!(ByteBuffer::new(&[0x78, 0x56, 0x34, 0x12]).read_u32(), Ok(0x1234_5678));
    assert_eq!(ByteBuffer::new(&[0xff, 0xff, 0xff, 0x7f]).read_i32(), Ok(i32::MAX));
    assert_eq!(
        ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0, 0x80]).read_u64(),
        Ok(0x8000_0000_0000_0001)
    );
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0, 0x80]).read_i64(), Ok(i64::MIN));
    assert_eq!(ByteBuffer::new(&1.5f64.to_le_bytes()).read_f64(), Ok(1.5));
    assert_eq!(ByteBuffer::new(&[0x34]).read_u16(), Err(()));
}

#[test]
fn read_sized_bytes() {
    let read = |bytes| ByteBuffer::new(bytes).read_sized_bytes();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0, 0]), Ok(&[][..]));
    assert_eq!(read(&[2, 0, 97, 98]), Ok(&b"ab"[..]));
    assert_eq!(read(&[3, 0, 97, 98]), Err(()));

    let mut bb = ByteBuffer::new(&[3, 0, 97]);
    assert_eq!(bb.read_sized_bytes(), Err(()));
    assert_eq!(bb.index(), 0);
}

/// A DC byte buffer meant for writing packed field data.
///
/// ```
/// let mut bb = dclass_schema::ByteBufferMut::new();
/// bb.write_u16(42);
/// bb.write_sized_bytes(b"abc").unwrap();
/// assert_eq!(bb.data(), [0x2a, 0x00, 0x03, 0x00, 0x61, 0x62, 0x63]);
/// ```
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a `uint16` length prefix followed by the bytes. Fails without
    /// writing anything if the run does not fit the prefix.
    pub fn write_sized_bytes(&mut self, value: &[u8]) -> Result<(), ()> {
        let len = u16::try_from(value.len()).map_err(|_| ())?;
        self.write_u16(len);
        self.write_bytes(value);
        Ok(())
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_fixed_width() {
    assert_eq!(write_once(|bb| bb.write_i8(-1)), [0xff]);
    assert_eq!(write_once(|bb| bb.write_u16(0x1234)), [0x34, 0x12]);
    assert_eq!(write_once(|bb| bb.write_i16(-2)), [0xfe, 0xff]);
    assert_eq!(write_once(|bb| bb.write_u32(0x1234_5678)), [0x78, 0x56, 0x34, 0x12]);
    assert_eq!(write_once(|bb| bb.write_i32(-1)), [0xff, 0xff, 0xff, 0xff]);
    assert_eq!(
        write_once(|bb| bb.write_u64(0x8000_0000_0000_0001)),
        [1, 0, 0, 0, 0, 0, 0, 0x80]
    );
    assert_eq!(write_once(|bb| bb.write_f64(1.5)), 1.5f64.to_le_bytes());
}

#[test]
fn write_sized_bytes() {
    assert_eq!(write_once(|bb| bb.write_sized_bytes(b"").unwrap()), [0, 0]);
    assert_eq!(write_once(|bb| bb.write_sized_bytes(b"ab").unwrap()), [2, 0, 97, 98]);

    let mut bb = ByteBufferMut::new();
    assert_eq!(bb.write_sized_bytes(&vec![0u8; 70_000]), Err(()));
    assert!(bb.is_empty());
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_byte(7);
    bb.write_sized_bytes(b"hi").unwrap();
    bb.write_i16(-1);
    assert_eq!(bb.len(), 7);
    assert_eq!(bb.data(), [7, 2, 0, 104, 105, 0xff, 0xff]);
}
