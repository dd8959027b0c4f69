//! Low-level wire reads over a byte slice.

use pbridge_core::{MAX_FIELD_NUMBER, WireType};

use crate::error::DecodeError;

/// Cursor over one length-delimited region of the input.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Offset of `buf[0]` in the top-level input.
    base: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub(crate) fn varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset();
        let mut value = 0u64;
        for i in 0..10 {
            let Some(&byte) = self.buf.get(self.pos) else {
                return Err(DecodeError::Truncated {
                    offset: self.offset(),
                });
            };
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::MalformedVarint { offset: start })
    }

    pub(crate) fn fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.bytes(8)?;
        let mut le = [0u8; 8];
        le.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(le))
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(DecodeError::Truncated {
                offset: self.base + self.buf.len(),
            })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Read a length prefix and the bytes it covers.
    pub(crate) fn delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Truncated {
            offset: self.base + self.buf.len(),
        })?;
        self.bytes(len)
    }

    /// Read a length prefix and return a reader over the bytes it covers.
    pub(crate) fn sub_reader(&mut self) -> Result<Reader<'a>, DecodeError> {
        let buf = self.delimited()?;
        Ok(Reader {
            buf,
            pos: 0,
            base: self.offset() - buf.len(),
        })
    }

    /// Read a tag, returning the field number and wire type.
    pub(crate) fn tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let offset = self.offset();
        let tag = self.varint()?;
        let wire_type = (tag & 0x7) as u8;
        let wire = WireType::from_u8(wire_type)
            .ok_or(DecodeError::InvalidWireType { wire_type, offset })?;
        let number = tag >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(DecodeError::InvalidFieldNumber { number, offset });
        }
        Ok((number as u32, wire))
    }

    /// Read one scalar of the given wire type as raw bits.
    pub(crate) fn scalar(&mut self, wire: WireType) -> Result<u64, DecodeError> {
        match wire {
            WireType::Varint => self.varint(),
            WireType::Fixed32 => self.fixed32().map(u64::from),
            WireType::Fixed64 => self.fixed64(),
            WireType::LengthDelimited | WireType::StartGroup | WireType::EndGroup => {
                unreachable!("scalar read with wire type {wire:?}")
            }
        }
    }

    /// Skip the value of a field whose tag was just read.
    ///
    /// Groups are skipped through their matching end tag, nested up to
    /// `depth_left` levels.
    pub(crate) fn skip(
        &mut self,
        number: u32,
        wire: WireType,
        depth_left: u32,
        limit: u32,
    ) -> Result<(), DecodeError> {
        match wire {
            WireType::Varint | WireType::Fixed32 | WireType::Fixed64 => {
                self.scalar(wire)?;
            }
            WireType::LengthDelimited => {
                self.delimited()?;
            }
            WireType::StartGroup => {
                if depth_left == 0 {
                    return Err(DecodeError::DepthLimitExceeded { limit });
                }
                loop {
                    if self.is_empty() {
                        return Err(DecodeError::UnterminatedGroup { number });
                    }
                    let offset = self.offset();
                    let (inner, inner_wire) = self.tag()?;
                    if inner_wire == WireType::EndGroup {
                        if inner == number {
                            return Ok(());
                        }
                        return Err(DecodeError::UnexpectedEndGroup {
                            number: inner,
                            offset,
                        });
                    }
                    self.skip(inner, inner_wire, depth_left - 1, limit)?;
                }
            }
            WireType::EndGroup => {
                unreachable!("end-group tags are handled by the caller")
            }
        }
        Ok(())
    }
}
