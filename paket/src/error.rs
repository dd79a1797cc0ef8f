use std::fmt::{Display, Formatter, self};

/// A [`DecodeError`](DecodeError) annotated with the stream offset at which it occurred.
#[derive(Debug, PartialEq)]
pub struct DecoderError {
    inner: DecodeError,
    at: u64,
}

impl DecoderError {
    pub fn into_inner(self) -> DecodeError {
        self.inner
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
       Some(&self.inner)
    }
}

impl Display for DecoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{} at input position {}", self.inner, self.at)
    }
}

#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// The buffer ended inside a value. Only the one-shot [`unpack`](crate::unpack) raises this;
    /// the streaming decoder suspends instead.
    Eof,
    /// A lead byte outside the format table
    Reserved(u8),
    /// Opening a container would exceed the nesting limit
    Depth(usize),
    /// Bytes left over after the value in a one-shot decode
    Trailing(usize),
    Allocation,
}

impl DecodeError {
    pub fn at(self, at: u64) -> DecoderError {
        DecoderError { inner: self, at }
    }
}

impl From<std::collections::TryReserveError> for DecodeError {
    fn from(_e: std::collections::TryReserveError) -> DecodeError {
        DecodeError::Allocation
    }
}

impl std::error::Error for DecodeError {}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeError::Eof => f.write_str("Unexpected end of buffer while decoding"),
            DecodeError::Reserved(byte) => write!(f, "Reserved lead byte 0x{:02x}", byte),
            DecodeError::Depth(limit) => write!(f, "Nesting exceeds the depth limit {}", limit),
            DecodeError::Trailing(count) => write!(f, "{} bytes of input left after a complete value", count),
            DecodeError::Allocation => f.write_str("An allocation failed"),
        }
    }
}

#[derive(Debug)]
pub enum EncodeError {
    Io(std::io::Error),
    /// Recursion exhausted the nesting limit
    Depth(usize),
    /// A negative magnitude beyond 63 bits has no wire representation
    Int(u64),
    /// Raw or container sizes are capped at 32 bits on wire
    Length(usize),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            EncodeError::Io(e) => write!(f, "IO error {}", e),
            EncodeError::Depth(limit) => write!(f, "Nesting exceeds the depth limit {}", limit),
            EncodeError::Int(magnitude) => write!(f, "Negative magnitude {} exceeds 63 bits", magnitude),
            EncodeError::Length(value) => write!(f, "Length {} exceeds maximum {}", value, u32::MAX),
        }
    }
}
