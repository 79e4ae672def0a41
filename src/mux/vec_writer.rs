//! Little-endian field writers for building RIFF chunks in a `Vec<u8>`.

/// Extension trait for writing container fields to a `Vec<u8>`.
pub(crate) trait VecWriter {
    /// Append a slice to the buffer.
    fn write_all(&mut self, data: &[u8]);

    /// Write a u16 in little-endian.
    fn write_u16_le(&mut self, v: u16);

    /// Write a u24 (3 bytes) in little-endian.
    fn write_u24_le(&mut self, v: u32);

    /// Write a u32 in little-endian.
    fn write_u32_le(&mut self, v: u32);
}

impl VecWriter for Vec<u8> {
    #[inline]
    fn write_all(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }

    #[inline]
    fn write_u16_le(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    fn write_u24_le(&mut self, v: u32) {
        let bytes = v.to_le_bytes();
        self.extend_from_slice(&bytes[..3]);
    }

    #[inline]
    fn write_u32_le(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }
}

/// Size a chunk occupies in the RIFF payload: 8-byte header plus padded data.
pub(crate) fn chunk_size(payload_len: usize) -> u32 {
    (8 + payload_len + (payload_len & 1)) as u32
}

/// Write a chunk header, its payload, and the pad byte for odd sizes.
pub(crate) fn write_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], payload: &[u8]) {
    out.write_all(fourcc);
    out.write_u32_le(payload.len() as u32);
    out.write_all(payload);
    if payload.len() & 1 == 1 {
        out.push(0);
    }
}
