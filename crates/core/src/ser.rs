//! A simple trait for binary (de)Serialization using std `Read` and `Write` traits.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::{
    convert::TryInto,
    io::{Cursor, Error as IOError, Read, Write},
};
use thiserror::Error;

/// Errors related to serialization of types.
#[derive(Debug, Error)]
pub enum SerError {
    /// Non-minimal VarInt encountered. The consensus rules of every supported chain reject these.
    #[error("Attempted to deserialize non-minmal VarInt. Someone is doing something fishy.")]
    NonMinimalVarInt,

    /// A length prefix announced more bytes than the reader could supply.
    #[error("Expected {expected} bytes. Got {got} bytes.")]
    InsufficientBytes {
        /// The number of bytes announced by the prefix
        expected: usize,
        /// The number of bytes actually available
        got: usize,
    },

    /// IOError bubbled up from a `Write` passed to a `ByteFormat::write_to` implementation.
    #[error(transparent)]
    IOError(#[from] IOError),

    /// `deserialize_hex` encountered an error on its input.
    #[error(transparent)]
    FromHexError(#[from] hex::FromHexError),

    /// `deserialize_base64` encountered an error on its input.
    #[error(transparent)]
    DecodeError(#[from] base64::DecodeError),

    /// An error by a component call in data structure (de)serialization
    #[error("Error in component (de)serialization: {0}")]
    ComponentError(String),
}

/// Type alias for serialization errors
pub type SerResult<T> = Result<T, SerError>;

/// Calculates the minimum prefix length for a VarInt encoding `number`
pub fn prefix_byte_len(number: u64) -> u8 {
    match number {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Matches the length of the VarInt to the 1-byte flag
pub fn first_byte_from_len(number: u8) -> Option<u8> {
    match number {
        3 => Some(0xfd),
        5 => Some(0xfe),
        9 => Some(0xff),
        _ => None,
    }
}

/// Matches the VarInt prefix flag to the serialized length
pub fn prefix_len_from_first_byte(number: u8) -> u8 {
    match number {
        0..=0xfc => 1,
        0xfd => 3,
        0xfe => 5,
        0xff => 9,
    }
}

/// Convenience function for reading a compact int (Bitcoin-style VarInt) from a reader. Rejects
/// non-minimal encodings.
pub fn read_compact_int<R>(reader: &mut R) -> SerResult<u64>
where
    R: Read,
{
    let mut prefix = [0u8; 1];
    reader.read_exact(&mut prefix)?; // read at most one byte
    let prefix_len = prefix_len_from_first_byte(prefix[0]);

    // Get the byte(s) representing the number, and parse as u64
    let number = if prefix_len > 1 {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..prefix_len as usize - 1])?;
        u64::from_le_bytes(buf)
    } else {
        prefix[0] as u64
    };

    let minimal_length = prefix_byte_len(number);
    if minimal_length < prefix_len {
        Err(SerError::NonMinimalVarInt)
    } else {
        Ok(number)
    }
}

/// Convenience function for writing a compact int (Bitcoin-style VarInt) to a writer.
pub fn write_compact_int<W>(writer: &mut W, number: u64) -> SerResult<usize>
where
    W: Write,
{
    let prefix_len = prefix_byte_len(number);
    match first_byte_from_len(prefix_len) {
        None => writer.write_all(&[number as u8])?,
        Some(prefix) => {
            writer.write_all(&[prefix])?;
            writer.write_all(&number.to_le_bytes()[..prefix_len as usize - 1])?;
        }
    };
    Ok(prefix_len as usize)
}

/// Read exactly `length` bytes into a new vector. Does not trust `length` for allocation, so a
/// hostile length prefix cannot force a large allocation.
pub fn read_byte_vec<R>(reader: &mut R, length: usize) -> SerResult<Vec<u8>>
where
    R: Read,
{
    let mut buf = vec![];
    reader.take(length as u64).read_to_end(&mut buf)?;
    if buf.len() != length {
        return Err(SerError::InsufficientBytes {
            expected: length,
            got: buf.len(),
        });
    }
    Ok(buf)
}

/// Read a compact-int length prefix, then that many bytes.
pub fn read_prefix_bytes<R>(reader: &mut R) -> SerResult<Vec<u8>>
where
    R: Read,
{
    let length = read_compact_int(reader)?;
    let length: usize = length
        .try_into()
        .map_err(|_| SerError::ComponentError(format!("length prefix too large: {}", length)))?;
    read_byte_vec(reader, length)
}

/// Write a compact-int length prefix, then the bytes.
pub fn write_prefix_bytes<W>(writer: &mut W, bytes: &[u8]) -> SerResult<usize>
where
    W: Write,
{
    let mut len = write_compact_int(writer, bytes.len() as u64)?;
    writer.write_all(bytes)?;
    len += bytes.len();
    Ok(len)
}

/// The byte length of a compact-int prefixed byte string.
pub fn prefix_bytes_len(bytes: &[u8]) -> usize {
    prefix_byte_len(bytes.len() as u64) as usize + bytes.len()
}

/// A simple trait for deserializing from `std::io::Read` and serializing to `std::io::Write`.
///
/// `ByteFormat` is used extensively in Sighash calculation, txid calculations, and transaction
/// serialization and deserialization.
pub trait ByteFormat {
    /// An associated error type
    type Error: From<SerError> + From<IOError> + std::error::Error;

    /// Returns the byte-length of the serialized data structure.
    fn serialized_length(&self) -> usize;

    /// Deserializes an instance of `Self` from a `std::io::Read`.
    /// The `limit` argument is used only when deserializing collections, and specifies a maximum
    /// number of instances of the underlying type to read.
    ///
    /// ```
    /// use utxo_core::ser::*;
    ///
    /// let b = [0u8; 32];
    /// let result = Vec::<u8>::read_from(&mut b.as_ref(), 16).unwrap();
    ///
    /// assert_eq!(result, vec![0u8; 16]);
    /// ```
    fn read_from<R>(reader: &mut R, limit: usize) -> Result<Self, Self::Error>
    where
        R: Read,
        Self: std::marker::Sized;

    /// Serializes `self` to a `std::io::Write`. Following `Write` trait conventions, its `Ok`
    /// type is a `usize` denoting the number of bytes written.
    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write;

    /// Convenience function for reading a LE u32
    fn read_u32_le<R>(reader: &mut R) -> SerResult<u32>
    where
        R: Read,
    {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Convenience function for reading a LE u64
    fn read_u64_le<R>(reader: &mut R) -> SerResult<u64>
    where
        R: Read,
    {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Convenience function for writing a LE u32
    fn write_u32_le<W>(writer: &mut W, number: u32) -> SerResult<usize>
    where
        W: Write,
    {
        writer.write_all(&number.to_le_bytes())?;
        Ok(4)
    }

    /// Convenience function for writing a LE u64
    fn write_u64_le<W>(writer: &mut W, number: u64) -> SerResult<usize>
    where
        W: Write,
    {
        writer.write_all(&number.to_le_bytes())?;
        Ok(8)
    }

    /// Convenience function for reading a compact int
    fn read_compact_int<R>(reader: &mut R) -> SerResult<u64>
    where
        R: Read,
    {
        read_compact_int(reader)
    }

    /// Convenience function for writing a compact int
    fn write_compact_int<W>(writer: &mut W, number: u64) -> SerResult<usize>
    where
        W: Write,
    {
        write_compact_int(writer, number)
    }

    /// Read a compact int prefix, and then that many items of type `I`
    fn read_prefix_vec<R, E, I>(reader: &mut R) -> Result<Vec<I>, E>
    where
        R: Read,
        E: From<SerError> + From<IOError> + std::error::Error,
        I: ByteFormat<Error = E>,
    {
        let items = read_compact_int(reader)?;
        let mut v = vec![];
        for _ in 0..items {
            v.push(I::read_from(reader, 0)?);
        }
        Ok(v)
    }

    /// Write a compact int prefix, and then each item of the slice
    fn write_prefix_vec<W, E, I>(writer: &mut W, items: &[I]) -> Result<usize, E>
    where
        W: Write,
        E: From<SerError> + From<IOError> + std::error::Error,
        I: ByteFormat<Error = E>,
    {
        let mut len = write_compact_int(writer, items.len() as u64)?;
        for i in items.iter() {
            len += i.write_to(writer)?;
        }
        Ok(len)
    }

    /// The byte length of a compact-int prefixed vector of items
    fn prefix_vec_length<I>(items: &[I]) -> usize
    where
        I: ByteFormat,
    {
        prefix_byte_len(items.len() as u64) as usize
            + items.iter().map(ByteFormat::serialized_length).sum::<usize>()
    }

    /// Decodes a hex string to a `Vec<u8>`, deserializes an instance of `Self` from that vector.
    fn deserialize_hex(s: &str) -> Result<Self, Self::Error>
    where
        Self: std::marker::Sized,
    {
        let v: Vec<u8> = hex::decode(s).map_err(SerError::from)?;
        let mut cursor = Cursor::new(v);
        Self::read_from(&mut cursor, 0)
    }

    /// Decodes a base64 string, deserializes an instance of `Self` from the bytes.
    fn deserialize_base64(s: &str) -> Result<Self, Self::Error>
    where
        Self: std::marker::Sized,
    {
        let v: Vec<u8> = STANDARD.decode(s).map_err(SerError::from)?;
        let mut cursor = Cursor::new(v);
        Self::read_from(&mut cursor, 0)
    }

    /// Serializes `self` to a vector
    fn serialize_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        let mut v: Vec<u8> = vec![];
        self.write_to(&mut v)?;
        Ok(v)
    }

    /// Serializes `self` to a vector, returns the hex-encoded vector
    fn serialize_hex(&self) -> Result<String, Self::Error> {
        Ok(hex::encode(self.serialize_bytes()?))
    }

    /// Serialize `self` to a base64 string
    fn serialize_base64(&self) -> Result<String, Self::Error> {
        Ok(STANDARD.encode(self.serialize_bytes()?))
    }
}

impl ByteFormat for u8 {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        1
    }

    fn read_from<R>(reader: &mut R, _limit: usize) -> SerResult<Self>
    where
        R: Read,
        Self: std::marker::Sized,
    {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn write_to<W>(&self, writer: &mut W) -> SerResult<usize>
    where
        W: Write,
    {
        writer.write_all(&[*self])?;
        Ok(1)
    }
}

impl<A> ByteFormat for Vec<A>
where
    A: ByteFormat,
{
    type Error = A::Error;

    fn serialized_length(&self) -> usize {
        self.iter().map(|v| v.serialized_length()).sum()
    }

    fn read_from<T>(reader: &mut T, limit: usize) -> Result<Self, Self::Error>
    where
        T: Read,
        Self: std::marker::Sized,
    {
        let mut v = vec![];
        for _ in 0..limit {
            v.push(A::read_from(reader, 0)?);
        }
        Ok(v)
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        let mut len = 0;
        for item in self.iter() {
            len += item.write_to(writer)?;
        }
        Ok(len)
    }
}
