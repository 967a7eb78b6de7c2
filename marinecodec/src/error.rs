use thiserror::Error;

/// Errors produced while decoding either wire protocol.
///
/// Decode errors are never fatal: the caller counts them, logs them at INFO
/// and lets the decoder resynchronise on the following bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The checksum transmitted in an NMEA sentence does not match the
    /// checksum of the received payload.
    #[error("checksum mismatch in {line:?}: sentence says {sent:02X}, payload gives {computed:02X}")]
    ChecksumMismatch {
        line: String,
        sent: u8,
        computed: u8,
    },

    /// The byte stream does not form a well-framed sentence or datagram.
    #[error("framing error: {0}")]
    Framing(String),

    /// A Seatalk command byte that no known datagram uses.
    #[error("unknown Seatalk datagram id 0x{0:02X}")]
    UnknownDatagramId(u8),

    /// Well-framed input whose content violates the value domain of its
    /// message type (bad length nibble, reserved bytes not zero, value out
    /// of range, ...).
    #[error("validation error: {0}")]
    Validation(String),
}

impl DecodeError {
    /// Counter bucket this error belongs to, used by per-device metrics.
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::ChecksumMismatch { .. } => DecodeErrorKind::ChecksumMismatch,
            DecodeError::Framing(_) => DecodeErrorKind::Framing,
            DecodeError::UnknownDatagramId(_) => DecodeErrorKind::UnknownDatagramId,
            DecodeError::Validation(_) => DecodeErrorKind::Validation,
        }
    }
}

/// Error taxonomy for counting, one bucket per [`DecodeError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    ChecksumMismatch,
    Framing,
    UnknownDatagramId,
    Validation,
}
