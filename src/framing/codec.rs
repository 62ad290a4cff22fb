//! `tokio_util` codec for length-delimited frames
//!
//! [`Reassembler`] is the [`Decoder`]: inbound streams are driven with
//! `FramedRead::with_capacity(stream, reassembler, read_chunk_size)`.
//! [`FrameEncoder`] is the matching [`Encoder`] for `FramedWrite`.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::frame::{Frame, DEFAULT_MAX_FRAME_SIZE};
use super::reassembler::Reassembler;
use crate::error::FramingError;

/// Default read buffer size for inbound streams (4 KiB)
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

impl Decoder for Reassembler {
    type Item = Frame;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        self.decode_buf(src)
    }

    /// A stream may only end on a frame boundary
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        match self.decode_buf(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.finish()?;
                Ok(None)
            }
        }
    }
}

/// Writes the 4-byte little-endian length prefix followed by the payload
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    max_frame_size: usize,
}

impl FrameEncoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Encoder<Frame> for FrameEncoder {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> io::Result<()> {
        let prefix = match frame.length_prefix() {
            Some(prefix) if frame.len() <= self.max_frame_size => prefix,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    FramingError::FrameTooLarge {
                        declared: frame.len(),
                        max: self.max_frame_size,
                    },
                ))
            }
        };

        dst.reserve(frame.encoded_len());
        dst.extend_from_slice(&prefix);
        dst.extend_from_slice(frame.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt, TryStreamExt};
    use tokio::io::AsyncRead;
    use tokio_test::io::Builder;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;

    fn encode(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn framed<R: AsyncRead>(inner: R) -> FramedRead<R, Reassembler> {
        FramedRead::new(inner, Reassembler::new(DEFAULT_MAX_FRAME_SIZE))
    }

    /// Payload whose bytes depend on size and position
    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i + len) % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_reads_frames_in_order() {
        let mut data = encode(&[]);
        data.extend(encode(&[1; 100]));
        data.extend(encode(&[2; 65536]));

        let frames: Vec<Frame> = framed(&data[..]).try_collect().await.unwrap();
        let lens: Vec<usize> = frames.iter().map(Frame::len).collect();
        assert_eq!(lens, vec![0, 100, 65536]);
    }

    #[tokio::test]
    async fn test_prefix_split_across_reads() {
        let data = encode(b"relay");
        let mock = Builder::new()
            .read(&data[..1])
            .read(&data[1..3])
            .read(&data[3..6])
            .read(&data[6..])
            .build();

        let mut reader = framed(mock);
        let frame = reader.next().await.unwrap().unwrap();

        assert_eq!(frame.payload().as_ref(), b"relay");
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_frame_boundary_inside_read() {
        let mut data = encode(b"ab");
        data.extend(encode(b"cde"));
        let mock = Builder::new().read(&data[..7]).read(&data[7..]).build();

        let mut reader = framed(mock);
        assert_eq!(reader.next().await.unwrap().unwrap().payload().as_ref(), b"ab");
        assert_eq!(reader.next().await.unwrap().unwrap().payload().as_ref(), b"cde");
        assert!(reader.next().await.is_none());
        assert_eq!(reader.decoder().frames_completed(), 2);
    }

    #[tokio::test]
    async fn test_truncated_stream_is_an_error() {
        let data = encode(&[9; 64]);
        let mock = Builder::new().read(&data[..40]).build();

        let mut reader = framed(mock);
        assert!(matches!(
            reader.next().await,
            Some(Err(FramingError::TruncatedPayload {
                received: 36,
                expected: 64
            }))
        ));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_truncated_prefix_is_an_error() {
        let mock = Builder::new().read(&[7, 0]).build();

        let mut reader = framed(mock);
        assert!(matches!(
            reader.next().await,
            Some(Err(FramingError::TruncatedPrefix { received: 2 }))
        ));
    }

    #[tokio::test]
    async fn test_read_error_leaves_partial_frame_to_reset() {
        let data = encode(&[9; 64]);
        let mock = Builder::new()
            .read(&data[..10])
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let mut reader = framed(mock);
        match reader.next().await {
            Some(Err(FramingError::Read(e))) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("expected read error, got {:?}", other),
        }
        assert_eq!(reader.decoder_mut().reset(), 6);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let data = encode(&[0; 32]);
        let mut reader = FramedRead::new(&data[..], Reassembler::new(16));

        assert!(matches!(
            reader.next().await,
            Some(Err(FramingError::FrameTooLarge {
                declared: 32,
                max: 16
            }))
        ));
    }

    #[tokio::test]
    async fn test_encoder_writes_prefix_and_payload() {
        let mut out = Vec::new();
        {
            let mut writer = FramedWrite::new(&mut out, FrameEncoder::default());
            writer.send(Frame::new(&b"hello"[..])).await.unwrap();
            writer.send(Frame::default()).await.unwrap();
        }
        assert_eq!(out, b"\x05\x00\x00\x00hello\x00\x00\x00\x00");
    }

    #[tokio::test]
    async fn test_round_trip_across_sizes_and_splits() {
        let sizes = [0usize, 1, 3, 4, 4095, 4096, 65536, DEFAULT_MAX_FRAME_SIZE];

        let mut wire = Vec::new();
        {
            let mut writer = FramedWrite::new(&mut wire, FrameEncoder::default());
            for len in sizes {
                writer.send(Frame::new(pattern(len))).await.unwrap();
            }
        }
        let expected_len: usize = sizes.iter().map(|len| len + 4).sum();
        assert_eq!(wire.len(), expected_len);

        for split in [5usize, 4096, 65537] {
            for chunk in [1usize, DEFAULT_READ_CHUNK_SIZE, 1 << 16] {
                let mut mock = Builder::new();
                for part in wire.chunks(split) {
                    mock.read(part);
                }

                let reader = FramedRead::with_capacity(
                    mock.build(),
                    Reassembler::new(DEFAULT_MAX_FRAME_SIZE),
                    chunk,
                );
                let frames: Vec<Frame> = reader.try_collect().await.unwrap();

                assert_eq!(frames.len(), sizes.len(), "split {} chunk {}", split, chunk);
                for (frame, len) in frames.iter().zip(sizes) {
                    assert_eq!(frame.len(), len, "split {} chunk {}", split, chunk);
                    assert_eq!(frame.payload().as_ref(), pattern(len).as_slice());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_one_past_max_frame_size_rejected() {
        let oversized = Frame::new(vec![0u8; DEFAULT_MAX_FRAME_SIZE + 1]);

        let mut dst = BytesMut::new();
        let err = FrameEncoder::default()
            .encode(oversized.clone(), &mut dst)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(dst.is_empty());

        let data = encode(oversized.payload());
        let mut reader = framed(&data[..]);
        assert!(matches!(
            reader.next().await,
            Some(Err(FramingError::FrameTooLarge { declared, max }))
                if declared == DEFAULT_MAX_FRAME_SIZE + 1 && max == DEFAULT_MAX_FRAME_SIZE
        ));
    }
}
