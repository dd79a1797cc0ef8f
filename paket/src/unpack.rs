//! Decoding runs as an explicit state machine instead of stack recursion, because the input may
//! arrive in arbitrary chunks: the [`Unpacker`](Unpacker) has to stop mid-value when bytes run
//! out and continue exactly where it left off once more are fed. The state is a stack of
//! in-progress container frames plus a pending slot for a tag whose payload has not fully
//! arrived. Bytes leave the buffer only once their interpretation is recorded in that state, so
//! a retry never re-reads or re-interprets anything.

use crate::buffer::Buffer;
use crate::error::{DecodeError, DecoderError};
use crate::marker::Marker;
use crate::value::{Sign, Value};
use crate::DEFAULT_MAX_DEPTH;

/// Decode exactly one value from the buffer with the default nesting limit. A buffer that ends
/// mid-value is an [`Eof`](DecodeError::Eof) error, bytes left over after the value are a
/// [`Trailing`](DecodeError::Trailing) error; streams of concatenated values belong to
/// [`Unpacker`](Unpacker) instead.
pub fn unpack<B: ?Sized + AsRef<[u8]>>(buf: &B) -> Result<Value, DecoderError> {
    unpack_bounded(buf, DEFAULT_MAX_DEPTH)
}

/// Like [`unpack`](unpack) with an explicit nesting limit.
pub fn unpack_bounded<B: ?Sized + AsRef<[u8]>>(buf: &B, limit: usize) -> Result<Value, DecoderError> {
    let mut unpacker = Unpacker::bounded(limit);
    unpacker.feed(buf.as_ref()).map_err(|e| e.at(0))?;
    match unpacker.next_value() {
        Ok(Some(value)) => match unpacker.buffered() {
            0 => Ok(value),
            rest => Err(DecodeError::Trailing(rest).at(unpacker.position())),
        },
        Ok(None) => Err(DecodeError::Eof.at(unpacker.position())),
        Err(e) => Err(e.at(unpacker.position())),
    }
}

/// A tag whose remaining material has not arrived yet. `Header` still waits for the fixed bytes
/// following the marker (scalar payload or length field), `Raw` knows its length and waits for
/// the content bytes.
enum Pending {
    Header(Marker),
    Raw(usize),
}

/// One in-progress container. Completed child values accumulate here until the remaining count
/// hits zero; a map additionally parks a decoded key while its value is still outstanding.
enum Frame {
    Array { remaining: usize, items: Vec<Value> },
    Map { remaining: usize, pairs: Vec<(Value, Value)>, key: Option<Value> },
}

/// Streaming decoder. [`feed`](Unpacker::feed) appends bytes, [`next_value`](Unpacker::next_value)
/// decodes; values come out in exactly the order their encodings were fed. The parse state is
/// owned exclusively by the unpacker, so no other code can ever observe a half-built value.
///
/// ```
/// use paket::{Unpacker, Value};
///
/// let mut unpacker = Unpacker::new();
/// unpacker.feed(&[0x92, 0x01]).unwrap();
/// assert_eq!(None, unpacker.next_value().unwrap());    // array still missing one element
/// unpacker.feed(&[0x02]).unwrap();
/// assert_eq!(
///     Some(Value::Array(vec![Value::from(1u8), Value::from(2u8)])),
///     unpacker.next_value().unwrap(),
/// );
/// ```
pub struct Unpacker {
    buf: Buffer,
    frames: Vec<Frame>,
    pending: Option<Pending>,
    limit: usize,
    consumed: u64,
}

impl Default for Unpacker {
    fn default() -> Unpacker {
        Unpacker::new()
    }
}

impl Unpacker {

    pub fn new() -> Unpacker {
        Unpacker::bounded(DEFAULT_MAX_DEPTH)
    }

    /// An unpacker with an explicit nesting limit.
    pub fn bounded(limit: usize) -> Unpacker {
        Unpacker { buf: Buffer::new(), frames: Vec::new(), pending: None, limit, consumed: 0 }
    }

    /// Appends bytes to the internal buffer. Never decodes anything. Fails only when growing
    /// the buffer fails.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.buf.extend(bytes)
    }

    /// Total bytes consumed from the stream since construction. Bytes sitting in the buffer or
    /// held back by an incomplete payload are not counted.
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Bytes fed but not yet consumed by decoding.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Runs the decode loop until a top-level value completes or the buffer runs dry.
    /// `Ok(None)` is not an error: it means "feed more bytes and call again". Decode errors
    /// poison the stream; the unpacker should be discarded after one.
    pub fn next_value(&mut self) -> Result<Option<Value>, DecodeError> {
        loop {
            let completed = match self.pending.take() {
                None => {
                    match self.pull(1) {
                        None => return Ok(None),
                        Some(bytes) => match Marker::from_u8(bytes[0]) {
                            Marker::Reserved(byte) => return Err(DecodeError::Reserved(byte)),
                            marker => {
                                self.pending = Some(Pending::Header(marker));
                                continue;
                            }
                        },
                    }
                },
                Some(Pending::Header(marker)) => {
                    let need = marker.fixed_len();
                    let mut payload = [0u8; 8];
                    if need > 0 {
                        match self.pull(need) {
                            Some(bytes) => payload[..need].copy_from_slice(bytes),
                            None => {
                                self.pending = Some(Pending::Header(marker));
                                return Ok(None);
                            }
                        }
                    }
                    match self.interpret(marker, &payload[..need])? {
                        Some(value) => self.complete(value),
                        None => continue,
                    }
                },
                Some(Pending::Raw(len)) => {
                    if self.buf.len() < len {
                        self.pending = Some(Pending::Raw(len));
                        return Ok(None);
                    }
                    let mut bytes = Vec::new();
                    bytes.try_reserve(len)?;
                    match self.pull(len) {
                        Some(content) => bytes.extend_from_slice(content),
                        None => unreachable!(),
                    }
                    self.complete(Value::Raw(bytes))
                },
            };
            if let Some(value) = completed {
                return Ok(Some(value));
            }
        }
    }

    #[inline]
    fn pull(&mut self, n: usize) -> Option<&[u8]> {
        match self.buf.pull(n) {
            Some(bytes) => {
                self.consumed += n as u64;
                Some(bytes)
            },
            None => None,
        }
    }

    /// Turns a marker and its fixed payload into either a finished scalar or new parse state
    /// (a raw awaiting content, a fresh container frame). Returns the scalar to attach, if any.
    fn interpret(&mut self, marker: Marker, payload: &[u8]) -> Result<Option<Value>, DecodeError> {
        Ok(match marker {
            Marker::Nil => Some(Value::Nil),
            Marker::True => Some(Value::Bool(true)),
            Marker::False => Some(Value::Bool(false)),
            Marker::FixPos(v) => Some(Value::Int(Sign::Pos, v as u64)),
            Marker::FixNeg(v) => Some(Value::Int(Sign::Neg, v.unsigned_abs() as u64)),
            Marker::U8 => Some(Value::Int(Sign::Pos, payload[0] as u64)),
            Marker::U16 => Some(Value::Int(Sign::Pos, u16::from_be_bytes(payload.try_into().unwrap()) as u64)),
            Marker::U32 => Some(Value::Int(Sign::Pos, u32::from_be_bytes(payload.try_into().unwrap()) as u64)),
            Marker::U64 => Some(Value::Int(Sign::Pos, u64::from_be_bytes(payload.try_into().unwrap()))),
            Marker::I8 => Some(Self::int(payload[0] as i8 as i64)),
            Marker::I16 => Some(Self::int(i16::from_be_bytes(payload.try_into().unwrap()) as i64)),
            Marker::I32 => Some(Self::int(i32::from_be_bytes(payload.try_into().unwrap()) as i64)),
            Marker::I64 => Some(Self::int(i64::from_be_bytes(payload.try_into().unwrap()))),
            Marker::F32 => Some(Value::F32(f32::from_be_bytes(payload.try_into().unwrap()))),
            Marker::F64 => Some(Value::F64(f64::from_be_bytes(payload.try_into().unwrap()))),
            Marker::FixRaw(len) => self.begin_raw(len as usize)?,
            Marker::Raw16 => self.begin_raw(u16::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::Raw32 => self.begin_raw(u32::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::FixArray(count) => self.open_array(count as usize)?,
            Marker::Array16 => self.open_array(u16::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::Array32 => self.open_array(u32::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::FixMap(count) => self.open_map(count as usize)?,
            Marker::Map16 => self.open_map(u16::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::Map32 => self.open_map(u32::from_be_bytes(payload.try_into().unwrap()) as usize)?,
            Marker::Reserved(byte) => return Err(DecodeError::Reserved(byte)),
        })
    }

    #[inline]
    fn int(v: i64) -> Value {
        if v < 0 {
            Value::Int(Sign::Neg, v.unsigned_abs())
        } else {
            Value::Int(Sign::Pos, v as u64)
        }
    }

    fn begin_raw(&mut self, len: usize) -> Result<Option<Value>, DecodeError> {
        if len == 0 {
            Ok(Some(Value::Raw(Vec::new())))
        } else {
            self.pending = Some(Pending::Raw(len));
            Ok(None)
        }
    }

    fn open_array(&mut self, count: usize) -> Result<Option<Value>, DecodeError> {
        if count == 0 {
            return Ok(Some(Value::Array(Vec::new())));
        }
        self.check_depth()?;
        let mut items = Vec::new();
        // the count is attacker-controlled before any element arrived, cap the upfront reservation
        items.try_reserve(count.min(1 << 16))?;
        self.frames.push(Frame::Array { remaining: count, items });
        Ok(None)
    }

    fn open_map(&mut self, count: usize) -> Result<Option<Value>, DecodeError> {
        if count == 0 {
            return Ok(Some(Value::Map(Vec::new())));
        }
        self.check_depth()?;
        let mut pairs = Vec::new();
        pairs.try_reserve(count.min(1 << 16))?;
        self.frames.push(Frame::Map { remaining: count, pairs, key: None });
        Ok(None)
    }

    #[inline]
    fn check_depth(&self) -> Result<(), DecodeError> {
        if self.frames.len() < self.limit {
            Ok(())
        } else {
            Err(DecodeError::Depth(self.limit))
        }
    }

    /// Attaches a finished value to the innermost frame, popping every frame it completes.
    /// Returns the value itself once the stack is empty, i.e. a whole top-level value is done.
    fn complete(&mut self, value: Value) -> Option<Value> {
        let mut value = value;
        loop {
            match self.frames.last_mut() {
                None => return Some(value),
                Some(Frame::Array { remaining, items }) => {
                    items.push(value);
                    *remaining -= 1;
                    if *remaining > 0 {
                        return None;
                    }
                    value = match self.frames.pop() {
                        Some(Frame::Array { items, .. }) => Value::Array(items),
                        _ => unreachable!(),
                    };
                },
                Some(Frame::Map { remaining, pairs, key }) => {
                    match key.take() {
                        None => {
                            *key = Some(value);
                            return None;
                        },
                        Some(k) => {
                            pairs.push((k, value));
                            *remaining -= 1;
                            if *remaining > 0 {
                                return None;
                            }
                            value = match self.frames.pop() {
                                Some(Frame::Map { pairs, .. }) => Value::Map(pairs),
                                _ => unreachable!(),
                            };
                        },
                    }
                },
            }
        }
    }

}

/// Drains every currently decodable value. `None` means the buffer is exhausted, not that the
/// stream ended: feed more bytes and iterate again.
impl Iterator for Unpacker {
    type Item = Result<Value, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{unpack, unpack_bounded, Unpacker};
    use crate::error::DecodeError;
    use crate::pack::{pack, Packer};
    use crate::value::{Sign, Value};

    fn sample() -> Value {
        Value::Map(vec![
            (Value::from("a"), Value::from(1u8)),
            (Value::from("b"), Value::Array(vec![Value::from(1u8), Value::from(2u8), Value::from(3u8)])),
        ])
    }

    #[test]
    fn known_message() {
        let bytes = [0x82, 0xa1, 0x61, 0x01, 0xa1, 0x62, 0x93, 0x01, 0x02, 0x03];
        assert_eq!(sample(), unpack(&bytes).unwrap());
    }

    #[test]
    fn roundtrip() {
        let values = vec![
            Value::Nil,
            Value::Bool(true),
            Value::Bool(false),
            Value::from(0u64),
            Value::from(127u64),
            Value::from(128u64),
            Value::from(65536u64),
            Value::from(u64::MAX),
            Value::from(-1i64),
            Value::from(-32i64),
            Value::from(-33i64),
            Value::from(i64::MIN),
            Value::F32(std::f32::consts::PI),
            Value::F64(std::f64::consts::PI),
            Value::Raw(b"Hello World! This is not ascii: \xc3\xa4\xc3\xb6\xc3\xbc".to_vec()),
            Value::Raw(vec![0u8; 65536]),
            Value::Array(Vec::new()),
            Value::Map(Vec::new()),
            sample(),
        ];
        for value in values {
            assert_eq!(value, unpack(&pack(&value).unwrap()).unwrap(), "roundtrip of {}", value.name());
        }
    }

    #[test]
    fn negative_comes_back_signed() {
        assert_eq!(Value::Int(Sign::Neg, 33), unpack(&pack(&Value::from(-33i64)).unwrap()).unwrap());
    }

    #[test]
    fn inefficient_encoding_accepted() {
        // 1 as uint32 is wasteful but well-formed
        assert_eq!(Value::Int(Sign::Pos, 1), unpack(&[0xce, 0x00, 0x00, 0x00, 0x01]).unwrap());
    }

    #[test]
    fn chunked_feed_equivalence() {
        let bytes = pack(&sample()).unwrap();
        // every split point, including inside the fix-raw payloads
        for split in 0..=bytes.len() {
            let mut unpacker = Unpacker::new();
            unpacker.feed(&bytes[..split]).unwrap();
            let early = unpacker.next_value().unwrap();
            if split < bytes.len() {
                assert_eq!(None, early, "split at {}", split);
                unpacker.feed(&bytes[split..]).unwrap();
                assert_eq!(Some(sample()), unpacker.next_value().unwrap(), "split at {}", split);
            } else {
                assert_eq!(Some(sample()), early);
            }
            assert_eq!(0, unpacker.buffered());
        }
    }

    #[test]
    fn byte_at_a_time() {
        let bytes = pack(&sample()).unwrap();
        let mut unpacker = Unpacker::new();
        let mut decoded = Vec::new();
        for byte in bytes.iter() {
            unpacker.feed(&[*byte]).unwrap();
            for value in unpacker.by_ref() {
                decoded.push(value.unwrap());
            }
        }
        assert_eq!(vec![sample()], decoded);
    }

    #[test]
    fn multiple_values_in_order() {
        let mut bytes = Vec::new();
        Packer::encode(&Value::from(1u8), &mut bytes).unwrap();
        Packer::encode(&Value::from("zwei"), &mut bytes).unwrap();
        Packer::encode(&Value::Array(vec![Value::from(3u8)]), &mut bytes).unwrap();
        let mut unpacker = Unpacker::new();
        unpacker.feed(&bytes).unwrap();
        let values = unpacker.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(
            vec![Value::from(1u8), Value::from("zwei"), Value::Array(vec![Value::from(3u8)])],
            values
        );
        assert_eq!(bytes.len() as u64, unpacker.position());
    }

    #[test]
    fn one_shot_rejects_trailing() {
        assert!(matches!(
            unpack(&[0xc0, 0xc0]).unwrap_err().into_inner(),
            DecodeError::Trailing(1)
        ));
    }

    #[test]
    fn one_shot_rejects_truncation() {
        assert!(matches!(unpack(&[]).unwrap_err().into_inner(), DecodeError::Eof));
        assert!(matches!(unpack(&[0xcd, 0x01]).unwrap_err().into_inner(), DecodeError::Eof));
        assert!(matches!(unpack(&[0x92, 0xc0]).unwrap_err().into_inner(), DecodeError::Eof));
        assert!(matches!(unpack(&[0xa3, 0x61]).unwrap_err().into_inner(), DecodeError::Eof));
    }

    #[test]
    fn reserved_bytes_rejected() {
        for byte in [0xc1u8, 0xc4, 0xc9, 0xd4, 0xd9] {
            assert!(matches!(
                unpack(&[byte]).unwrap_err().into_inner(),
                DecodeError::Reserved(b) if b == byte
            ));
        }
        // also inside a container
        assert!(matches!(
            unpack(&[0x91, 0xc1]).unwrap_err().into_inner(),
            DecodeError::Reserved(0xc1)
        ));
    }

    #[test]
    fn depth_limit() {
        let mut nested = Value::from(0u8);
        for _ in 0..4 {
            nested = Value::Array(vec![nested]);
        }
        let mut bytes = Vec::new();
        Packer::encode(&nested, &mut bytes).unwrap();
        assert_eq!(nested, unpack_bounded(&bytes, 4).unwrap());
        assert!(matches!(
            unpack_bounded(&bytes, 3).unwrap_err().into_inner(),
            DecodeError::Depth(3)
        ));
    }

    #[test]
    fn map_preserves_wire_order() {
        let value = Value::Map(vec![
            (Value::from("z"), Value::from(1u8)),
            (Value::from("a"), Value::from(2u8)),
        ]);
        assert_eq!(value, unpack(&pack(&value).unwrap()).unwrap());
    }

    #[test]
    fn hostile_count_does_not_allocate() {
        // map32 claiming u32::MAX pairs with no content must not reserve gigabytes up front
        let mut unpacker = Unpacker::new();
        unpacker.feed(&[0xdf, 0xff, 0xff, 0xff, 0xff]).unwrap();
        assert_eq!(None, unpacker.next_value().unwrap());
    }

    #[test]
    fn error_position() {
        let err = unpack(&[0x92, 0xc0, 0xc1]).unwrap_err();
        assert_eq!("Reserved lead byte 0xc1 at input position 3", format!("{}", err));
    }

}
