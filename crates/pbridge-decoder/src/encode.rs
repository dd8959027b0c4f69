//! Minimal wire writer for building fixtures.

use pbridge_core::WireType;

/// Builds encoded messages field by field.
///
/// ```
/// use pbridge_decoder::Encoder;
///
/// let bytes = Encoder::new()
///     .string(1, "Al")
///     .message(4, |m| m.string(1, "Oslo"))
///     .finish();
/// assert_eq!(bytes[..4], [0x0a, 2, b'A', b'l']);
/// ```
#[derive(Clone, Default, Debug)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn raw_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn key(&mut self, number: u32, wire: WireType) {
        self.raw_varint((u64::from(number) << 3) | wire as u64);
    }

    /// A varint field with the value's raw bits.
    pub fn varint(mut self, number: u32, v: u64) -> Self {
        self.key(number, WireType::Varint);
        self.raw_varint(v);
        self
    }

    pub fn int32(self, number: u32, v: i32) -> Self {
        self.varint(number, i64::from(v) as u64)
    }

    pub fn int64(self, number: u32, v: i64) -> Self {
        self.varint(number, v as u64)
    }

    pub fn sint32(self, number: u32, v: i32) -> Self {
        self.varint(number, u64::from(((v << 1) ^ (v >> 31)) as u32))
    }

    pub fn sint64(self, number: u32, v: i64) -> Self {
        self.varint(number, ((v << 1) ^ (v >> 63)) as u64)
    }

    pub fn bool(self, number: u32, v: bool) -> Self {
        self.varint(number, u64::from(v))
    }

    pub fn fixed32(mut self, number: u32, v: u32) -> Self {
        self.key(number, WireType::Fixed32);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn fixed64(mut self, number: u32, v: u64) -> Self {
        self.key(number, WireType::Fixed64);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn float(self, number: u32, v: f32) -> Self {
        self.fixed32(number, v.to_bits())
    }

    pub fn double(self, number: u32, v: f64) -> Self {
        self.fixed64(number, v.to_bits())
    }

    pub fn bytes(mut self, number: u32, v: &[u8]) -> Self {
        self.key(number, WireType::LengthDelimited);
        self.raw_varint(v.len() as u64);
        self.buf.extend_from_slice(v);
        self
    }

    pub fn string(self, number: u32, v: &str) -> Self {
        self.bytes(number, v.as_bytes())
    }

    /// A length-delimited submessage built by `body`.
    pub fn message(self, number: u32, body: impl FnOnce(Encoder) -> Encoder) -> Self {
        let inner = body(Encoder::new()).finish();
        self.bytes(number, &inner)
    }

    /// A group: start tag, fields built by `body`, end tag.
    pub fn group(mut self, number: u32, body: impl FnOnce(Encoder) -> Encoder) -> Self {
        self.key(number, WireType::StartGroup);
        let mut this = body(self);
        this.key(number, WireType::EndGroup);
        this
    }

    /// Packed repeated varints.
    pub fn packed_varints(self, number: u32, values: &[u64]) -> Self {
        let mut payload = Encoder::new();
        for &v in values {
            payload.raw_varint(v);
        }
        self.bytes(number, &payload.finish())
    }
}
