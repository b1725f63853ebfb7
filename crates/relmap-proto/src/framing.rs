//! Length-prefix framing for encoded object graphs.
//!
//! The format is simple: 4-byte big-endian length prefix followed by the payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Maximum frame payload size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encode a payload with a length prefix.
///
/// Returns a buffer containing `[length (4 bytes BE)][payload]`.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, Error> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(Error::FrameTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

/// Decode the length from a 4-byte header.
pub fn decode_frame_length(header: [u8; LENGTH_PREFIX_SIZE]) -> Result<usize, Error> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::FrameTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(len)
}

/// Validate that a buffer contains a complete frame.
///
/// Returns the total frame size (including prefix) if complete, or None if more data is needed.
pub fn frame_complete(data: &[u8]) -> Option<usize> {
    let header: [u8; LENGTH_PREFIX_SIZE] = data.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    let total = LENGTH_PREFIX_SIZE + u32::from_be_bytes(header) as usize;
    (data.len() >= total).then_some(total)
}

/// Extract the payload from a complete frame.
pub fn extract_payload(frame: &[u8]) -> Result<&[u8], Error> {
    let header: [u8; LENGTH_PREFIX_SIZE] = frame
        .get(..LENGTH_PREFIX_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| Error::InvalidMessage("frame too short".to_string()))?;
    let len = decode_frame_length(header)?;

    frame
        .get(LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len)
        .ok_or_else(|| {
            Error::InvalidMessage(format!(
                "frame incomplete: have {}, need {}",
                frame.len(),
                LENGTH_PREFIX_SIZE + len
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_small() {
        let payload = b"hello";
        let frame = encode_frame(payload).unwrap();

        assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + payload.len());
        // Length should be 5 in big-endian
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], payload);
    }

    #[test]
    fn test_encode_frame_too_large() {
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            encode_frame(&payload),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_frame_length_bounds() {
        assert_eq!(decode_frame_length([0, 0, 0x03, 0xE8]).unwrap(), 1000);
        let too_large = (MAX_MESSAGE_SIZE as u32) + 1;
        assert!(decode_frame_length(too_large.to_be_bytes()).is_err());
    }

    #[test]
    fn test_frame_complete() {
        assert_eq!(frame_complete(&[0, 0, 0]), None);
        assert_eq!(frame_complete(&[0, 0, 0, 2, 9]), None);
        assert_eq!(frame_complete(&[0, 0, 0, 2, 9, 9, 1]), Some(6));
    }

    #[test]
    fn test_extract_payload() {
        let frame = encode_frame(b"graph").unwrap();
        assert_eq!(extract_payload(&frame).unwrap(), b"graph");
        assert!(extract_payload(&frame[..6]).is_err());
        assert!(extract_payload(&[0, 0]).is_err());
    }
}
