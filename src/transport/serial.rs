//! Serial transports. The plain variant is bytes-only; the Seatalk variant
//! configures space parity with `INPCK | PARMRK` so that mark-parity
//! command bytes arrive as in-band escapes, and writes datagrams with the
//! parity switched per byte group.

use tokio_serial::SerialPortBuilderExt;

use super::{Chunk, TransportError, TransportPair, TransportReader, TransportWriter};

pub fn open_plain(port: &str, baudrate: u32) -> Result<TransportPair, TransportError> {
    let stream = tokio_serial::new(port, baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
    let (read_half, write_half) = tokio::io::split(stream);
    Ok(TransportPair {
        reader: TransportReader::Serial(read_half),
        writer: TransportWriter::Serial(write_half),
    })
}

#[cfg(target_os = "linux")]
pub fn open_seatalk(port: &str) -> Result<TransportPair, TransportError> {
    use std::os::fd::AsRawFd;

    let stream = tokio_serial::new(port, 4800)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
    let fd = stream.as_raw_fd();
    crate::sys::seatalk_serial::enable_parity_surfacing(fd)?;

    let (read_half, write_half) = tokio::io::split(stream);
    Ok(TransportPair {
        reader: TransportReader::SeatalkSerial(ParityReader {
            half: read_half,
            decoder: ParmrkDecoder::default(),
        }),
        writer: TransportWriter::SeatalkSerial(ParityWriter { fd, _half: write_half }),
    })
}

#[cfg(not(target_os = "linux"))]
pub fn open_seatalk(port: &str) -> Result<TransportPair, TransportError> {
    Err(TransportError::Unsupported(format!(
        "SeatalkSerial on {port}: per-byte parity surfacing needs Linux PARMRK"
    )))
}

/// Unescapes the PARMRK byte stream into (byte, ninth-bit) pairs.
///
/// With space parity configured, `FF 00 X` means X arrived with the parity
/// bit set (a Seatalk command byte) and `FF FF` is a literal 0xFF data
/// byte. State survives across read chunks since escapes can split.
#[derive(Default)]
pub struct ParmrkDecoder {
    state: ParmrkState,
}

#[derive(Default, Clone, Copy, PartialEq, Debug)]
enum ParmrkState {
    #[default]
    Normal,
    SawEscape,
    SawEscapeNul,
}

impl ParmrkDecoder {
    pub fn push(&mut self, input: &[u8]) -> (Vec<u8>, Vec<bool>) {
        let mut bytes = Vec::with_capacity(input.len());
        let mut marks = Vec::with_capacity(input.len());
        for &b in input {
            match self.state {
                ParmrkState::Normal => {
                    if b == 0xFF {
                        self.state = ParmrkState::SawEscape;
                    } else {
                        bytes.push(b);
                        marks.push(false);
                    }
                }
                ParmrkState::SawEscape => {
                    if b == 0xFF {
                        bytes.push(0xFF);
                        marks.push(false);
                        self.state = ParmrkState::Normal;
                    } else if b == 0x00 {
                        self.state = ParmrkState::SawEscapeNul;
                    } else {
                        // Not a legal escape; keep both bytes rather than
                        // lose them, the framer resynchronises anyway.
                        bytes.push(0xFF);
                        marks.push(false);
                        bytes.push(b);
                        marks.push(false);
                        self.state = ParmrkState::Normal;
                    }
                }
                ParmrkState::SawEscapeNul => {
                    bytes.push(b);
                    marks.push(true);
                    self.state = ParmrkState::Normal;
                }
            }
        }
        (bytes, marks)
    }
}

#[cfg(target_os = "linux")]
pub struct ParityReader {
    half: tokio::io::ReadHalf<tokio_serial::SerialStream>,
    decoder: ParmrkDecoder,
}

#[cfg(target_os = "linux")]
impl ParityReader {
    pub async fn read(&mut self) -> Result<Chunk, TransportError> {
        use tokio::io::AsyncReadExt;

        let mut buf = [0u8; super::READ_BUF_SIZE];
        let n = self.half.read(&mut buf).await?;
        let (bytes, marks) = self.decoder.push(&buf[..n]);
        Ok(Chunk { bytes, marks: Some(marks) })
    }
}

/// Writes datagrams with mark parity on the command byte. The termios
/// parity setting is global to the port, so each switch drains the
/// transmitter first; at 4800 baud the windows are a few milliseconds.
#[cfg(target_os = "linux")]
pub struct ParityWriter {
    fd: std::os::fd::RawFd,
    _half: tokio::io::WriteHalf<tokio_serial::SerialStream>,
}

#[cfg(target_os = "linux")]
impl ParityWriter {
    pub async fn write(&mut self, bytes: &[u8], marks: Option<&[bool]>) -> Result<usize, TransportError> {
        let fd = self.fd;
        let owned = bytes.to_vec();
        let command_marked = marks.is_some_and(|m| m.first().copied().unwrap_or(false));
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<usize> {
            if command_marked {
                crate::sys::seatalk_serial::write_datagram(fd, &owned)?;
            } else {
                crate::sys::seatalk_serial::write_space_parity(fd, &owned)?;
            }
            Ok(owned.len())
        })
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))??;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parmrk_marks_command_byte() {
        let mut decoder = ParmrkDecoder::default();
        // A depth datagram whose command byte arrived with mark parity.
        let (bytes, marks) = decoder.push(&[0xFF, 0x00, 0x00, 0x02, 0x00, 0x64, 0x00]);
        assert_eq!(bytes, vec![0x00, 0x02, 0x00, 0x64, 0x00]);
        assert_eq!(marks, vec![true, false, false, false, false]);
    }

    #[test]
    fn test_parmrk_literal_ff() {
        let mut decoder = ParmrkDecoder::default();
        let (bytes, marks) = decoder.push(&[0xFF, 0xFF, 0x01]);
        assert_eq!(bytes, vec![0xFF, 0x01]);
        assert_eq!(marks, vec![false, false]);
    }

    #[test]
    fn test_parmrk_escape_split_across_chunks() {
        let mut decoder = ParmrkDecoder::default();
        let (bytes, _) = decoder.push(&[0xFF]);
        assert!(bytes.is_empty());
        let (bytes, _) = decoder.push(&[0x00]);
        assert!(bytes.is_empty());
        let (bytes, marks) = decoder.push(&[0x20]);
        assert_eq!(bytes, vec![0x20]);
        assert_eq!(marks, vec![true]);
    }
}
