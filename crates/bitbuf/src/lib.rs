//! MSB-first bit buffers for the picopack codec.
//!
//! A message in picopack is a bit vector whose logical length is not
//! necessarily a multiple of eight. [`BitWriter`] accumulates such a vector
//! most-significant-bit first; [`BitReader`] is a cheap-to-copy cursor over a
//! finished vector. Reading never copies the underlying bytes, so width
//! discovery over nested structures is plain offset arithmetic.
//!
//! # Example
//!
//! ```
//! use picopack_bitbuf::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.push_bits(0b101, 3);
//! writer.push_bits(0x2b, 6);
//! assert_eq!(writer.len_bits(), 9);
//!
//! let mut reader = BitReader::new(writer.as_bytes(), 9);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(6).unwrap(), 0x2b);
//! ```

mod convert;
mod reader;
mod writer;

pub use convert::{bytes_to_hex, format_bits, hex_to_bytes, parse_bits};
pub use reader::{BitReader, ReadError};
pub use writer::BitWriter;
