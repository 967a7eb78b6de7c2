//! Marine Instrumentation Codec Library
//!
//! This library implements the two wire protocols spoken by small-craft
//! instrumentation buses:
//! - NMEA-0183 ASCII sentences (framing, checksum, typed sentence parsers)
//! - Seatalk-1 binary datagrams (9-bit framing, parity and heuristic
//!   synchronisation, typed datagram codecs)
//!
//! Both codecs decode into the shared canonical [`Message`] type so that a
//! multiplexer can translate between families.
//!
//! # Example
//!
//! ```no_run
//! use marinecodec::nmea::LineReader;
//! use marinecodec::Message;
//!
//! let mut reader = LineReader::new();
//! for out in reader.push_bytes(b"$IIMTW,21.5,C*15\r\n") {
//!     match out {
//!         Ok(decoded) => {
//!             if let Message::WaterTemperature { celsius } = decoded.message {
//!                 println!("water temperature: {celsius} C");
//!             }
//!         }
//!         Err(e) => eprintln!("decode error: {e}"),
//!     }
//! }
//! ```

pub mod error;
pub mod message;
pub mod nmea;
pub mod seatalk;
pub mod units;

// Re-export commonly used types
pub use error::DecodeError;
pub use message::{Message, MileageUnit, WindSpeedUnit};
