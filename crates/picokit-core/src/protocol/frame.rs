//! Frame encoding and the blocking request/response codec

use embedded_io::{Read, ReadExactError, Write};

use super::crc::{crc8, frame_crc};
use super::{Payload, Request, Status, HEADER_LEN, MAX_PAYLOAD};
use crate::error::{Error, Result};

/// Encode a frame into `buf`, returning the frame length
pub fn encode_frame(code: u8, payload: &[u8], buf: &mut [u8]) -> Result<usize> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::FrameTooLarge {
            len: payload.len() as u16,
        });
    }
    let total = HEADER_LEN + payload.len() + 1;
    if buf.len() < total {
        return Err(Error::BufferTooSmall);
    }

    buf[0] = code;
    buf[1..HEADER_LEN].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    buf[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
    buf[total - 1] = crc8(&buf[..total - 1]);
    Ok(total)
}

/// Split a header into its code byte and payload length
pub fn parse_header(header: [u8; HEADER_LEN]) -> (u8, u16) {
    (header[0], u16::from_le_bytes([header[1], header[2]]))
}

/// Decode a complete frame, returning its code byte and payload
pub fn decode_frame(frame: &[u8]) -> Result<(u8, &[u8])> {
    if frame.len() < HEADER_LEN + 1 {
        return Err(Error::FrameLength);
    }
    let (code, len) = parse_header([frame[0], frame[1], frame[2]]);
    if len as usize > MAX_PAYLOAD {
        return Err(Error::FrameTooLarge { len });
    }
    if frame.len() != HEADER_LEN + len as usize + 1 {
        return Err(Error::FrameLength);
    }

    let (body, crc) = frame.split_at(frame.len() - 1);
    let expected = crc8(body);
    if expected != crc[0] {
        return Err(Error::CrcMismatch {
            expected,
            received: crc[0],
        });
    }
    Ok((code, &body[HEADER_LEN..]))
}

fn map_read_err<E>(err: ReadExactError<E>) -> Error {
    match err {
        ReadExactError::UnexpectedEof => Error::UnexpectedEof,
        ReadExactError::Other(_) => Error::TransportError,
    }
}

/// Discard `count` bytes from the stream, stopping early at end of stream
fn drain<T: Read>(io: &mut T, mut count: usize) {
    let mut scratch = [0u8; 64];
    while count > 0 {
        let chunk = count.min(scratch.len());
        match io.read(&mut scratch[..chunk]) {
            Ok(0) | Err(_) => break,
            Ok(n) => count -= n,
        }
    }
}

/// Read and validate one request frame.
///
/// An oversized frame is drained (its announced payload plus the CRC byte)
/// and dropped without a response. A CRC mismatch is answered with
/// [`Status::ErrCrc`]. A truncated frame is dropped silently. In every
/// failure case the caller should simply wait for the next frame.
pub fn read_request<T: Read + Write>(io: &mut T) -> Result<Request> {
    let mut header = [0u8; HEADER_LEN];
    io.read_exact(&mut header).map_err(map_read_err)?;
    let (cmd, len) = parse_header(header);

    if len as usize > MAX_PAYLOAD {
        log::warn!("protocol: dropping oversized frame (cmd 0x{:02X}, len {})", cmd, len);
        drain(io, len as usize + 1);
        return Err(Error::FrameTooLarge { len });
    }

    let mut buf = [0u8; MAX_PAYLOAD];
    let payload = &mut buf[..len as usize];
    io.read_exact(payload).map_err(map_read_err)?;
    let mut crc = [0u8; 1];
    io.read_exact(&mut crc).map_err(map_read_err)?;

    let expected = frame_crc(&header, payload);
    if expected != crc[0] {
        log::warn!(
            "protocol: CRC mismatch on cmd 0x{:02X} (expected 0x{:02X}, got 0x{:02X})",
            cmd,
            expected,
            crc[0]
        );
        send_response(io, Status::ErrCrc, &[])?;
        return Err(Error::CrcMismatch {
            expected,
            received: crc[0],
        });
    }

    Ok(Request {
        cmd,
        payload: Payload::from_slice(payload).map_err(|_| Error::BufferTooSmall)?,
    })
}

/// Frame and send a response in a single write, then flush
pub fn send_response<T: Write>(io: &mut T, status: Status, payload: &[u8]) -> Result<()> {
    let mut frame = [0u8; super::MAX_FRAME_LEN];
    let len = encode_frame(status as u8, payload, &mut frame)?;
    io.write_all(&frame[..len]).map_err(|_| Error::TransportError)?;
    io.flush().map_err(|_| Error::TransportError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::Pipe;
    use crate::protocol::{crc8, Command, MAX_FRAME_LEN, VERSION_STRING};

    fn frame(code: u8, payload: &[u8]) -> heapless::Vec<u8, MAX_FRAME_LEN> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = encode_frame(code, payload, &mut buf).unwrap();
        heapless::Vec::from_slice(&buf[..len]).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let f = frame(0x00, VERSION_STRING.as_bytes());
        assert_eq!(&f[..3], &[0x00, 0x0B, 0x00]);
        assert_eq!(&f[3..14], b"picokit 1.0");
        assert_eq!(f[14], crc8(&f[..14]));
        assert_eq!(f.len(), 15);
    }

    #[test]
    fn test_decode_round_trip() {
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let f = frame(Status::ErrTarget as u8, &payload);
        let (code, decoded) = decode_frame(&f).unwrap();
        assert_eq!(code, 0x03);
        assert_eq!(decoded, &payload);
    }

    #[test]
    fn test_round_trip_length_limits() {
        let data = [0x5Au8; MAX_PAYLOAD];
        for len in [0, 1, 255, MAX_PAYLOAD] {
            let f = frame(Status::Ok as u8, &data[..len]);
            assert_eq!(f.len(), HEADER_LEN + len + 1);
            assert_eq!(&f[1..3], &(len as u16).to_le_bytes());
            assert_eq!(f[f.len() - 1], crc8(&f[..f.len() - 1]));

            let (code, decoded) = decode_frame(&f).unwrap();
            assert_eq!(code, Status::Ok as u8);
            assert_eq!(decoded, &data[..len]);
        }
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let mut f = frame(0x00, &[1, 2, 3]);
        let last = f.len() - 1;
        f[last] ^= 0x01;
        assert!(matches!(decode_frame(&f), Err(Error::CrcMismatch { .. })));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let f = frame(0x00, &[1, 2, 3]);
        assert_eq!(decode_frame(&f[..f.len() - 1]), Err(Error::FrameLength));
        assert_eq!(decode_frame(&[0x00, 0x00]), Err(Error::FrameLength));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let mut buf = [0u8; 512];
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert_eq!(
            encode_frame(0x00, &payload, &mut buf),
            Err(Error::FrameTooLarge { len: 257 })
        );
        let mut small = [0u8; 4];
        assert_eq!(encode_frame(0x00, &[1], &mut small), Err(Error::BufferTooSmall));
    }

    #[test]
    fn test_read_request() {
        let f = frame(Command::Read as u8, &[0, 0, 0, 0, 8, 0]);
        let mut pipe = Pipe::new(&f);
        let req = read_request(&mut pipe).unwrap();
        assert_eq!(req.command(), Ok(Command::Read));
        assert_eq!(req.length(), Ok(8));
        assert!(pipe.output.is_empty());
    }

    #[test]
    fn test_crc_mismatch_answers_err_crc() {
        let mut f = frame(Command::Version as u8, &[]);
        f[3] ^= 0xFF;
        let mut pipe = Pipe::new(&f);
        assert!(matches!(
            read_request(&mut pipe),
            Err(Error::CrcMismatch { .. })
        ));
        assert_eq!(pipe.output.as_slice(), frame(0x02, &[]).as_slice());
    }

    #[test]
    fn test_oversized_frame_is_drained() {
        // LEN = 300: header, 300 payload bytes and a CRC byte, then a valid frame
        let mut stream: heapless::Vec<u8, 512> = heapless::Vec::new();
        stream.extend_from_slice(&[Command::Read as u8, 0x2C, 0x01]).unwrap();
        for i in 0..301u16 {
            stream.push(i as u8).unwrap();
        }
        stream
            .extend_from_slice(&frame(Command::Version as u8, &[]))
            .unwrap();

        let mut pipe = Pipe::new(&stream);
        assert_eq!(
            read_request(&mut pipe),
            Err(Error::FrameTooLarge { len: 300 })
        );
        assert!(pipe.output.is_empty());

        let next = read_request(&mut pipe).unwrap();
        assert_eq!(next.command(), Ok(Command::Version));
        assert!(next.payload.is_empty());
    }

    #[test]
    fn test_truncated_frame() {
        let f = frame(Command::Read as u8, &[0, 0, 0, 0, 8, 0]);
        let mut pipe = Pipe::new(&f[..5]);
        assert_eq!(read_request(&mut pipe), Err(Error::UnexpectedEof));
        assert!(pipe.output.is_empty());

        let mut empty = Pipe::new(&[]);
        assert_eq!(read_request(&mut empty), Err(Error::UnexpectedEof));
    }

    #[test]
    fn test_send_response() {
        let mut pipe = Pipe::new(&[]);
        send_response(&mut pipe, Status::Ok, &[0x01]).unwrap();
        assert_eq!(pipe.output.as_slice(), frame(0x00, &[0x01]).as_slice());
    }
}
