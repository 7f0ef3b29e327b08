//! Chunked file transfer to and from the device's SD card.
//!
//! Reads pull blocks until the device returns an empty one. Writes push
//! fixed-size chunks, each acknowledged by a `FILE_ERROR` carrying the
//! chunk's request id, and re-send a chunk whose acknowledgement times out.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use kbox_frame::kommand::{FILE_ERROR, FILE_READ, FILE_READ_REPLY, FILE_WRITE};
use kbox_frame::Frame;
use kbox_transport::ByteChannel;
use tracing::{debug, info, warn};

use crate::config::FileTransferConfig;
use crate::error::{ClientError, DeviceFault, Result};
use crate::transport::CommandTransport;
use crate::wifi::push_cstr;

const ACK_SIZE: usize = 8;
const READ_REPLY_HEADER: usize = 8;

/// Status code carried by a `FILE_ERROR` kommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorCode {
    Ok,
    NoSuchFile,
    InvalidWrite,
    WriteError,
    Other(u32),
}

impl From<u32> for FileErrorCode {
    fn from(value: u32) -> Self {
        match value {
            0 => FileErrorCode::Ok,
            1 => FileErrorCode::NoSuchFile,
            2 => FileErrorCode::InvalidWrite,
            3 => FileErrorCode::WriteError,
            n => FileErrorCode::Other(n),
        }
    }
}

impl fmt::Display for FileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileErrorCode::Ok => f.write_str("ok"),
            FileErrorCode::NoSuchFile => f.write_str("no such file"),
            FileErrorCode::InvalidWrite => f.write_str("invalid write"),
            FileErrorCode::WriteError => f.write_str("write error"),
            FileErrorCode::Other(n) => write!(f, "error {n}"),
        }
    }
}

/// A decoded `FILE_ERROR` payload: `u32 request_id, u32 code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAck {
    pub request_id: u32,
    pub code: FileErrorCode,
}

impl FileAck {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != ACK_SIZE {
            return Err(ClientError::protocol(
                format!(
                    "malformed file acknowledgement ({} bytes, expected {ACK_SIZE})",
                    payload.len()
                ),
                Frame::new(FILE_ERROR, Bytes::copy_from_slice(payload)).to_raw(),
            ));
        }
        Ok(Self {
            request_id: read_u32(payload, 0),
            code: FileErrorCode::from(read_u32(payload, 4)),
        })
    }
}

/// Throughput of one completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    pub bytes: u64,
    /// Number of block exchanges, including the final empty block of a read.
    pub blocks: u32,
    pub elapsed: Duration,
}

impl TransferStats {
    /// Average rate, or `None` if no time was measured.
    pub fn bytes_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.bytes as f64 / secs)
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes in {} ms",
            self.bytes,
            self.elapsed.as_millis()
        )?;
        if let Some(rate) = self.bytes_per_sec() {
            write!(f, ", {:.1} kB/s", rate / 1024.0)?;
        }
        write!(f, " ({} blocks)", self.blocks)
    }
}

/// File operations bound to a transport for their duration.
pub struct FileTransfer<'a, C> {
    transport: &'a mut CommandTransport<C>,
    config: &'a FileTransferConfig,
}

impl<'a, C: ByteChannel> FileTransfer<'a, C> {
    pub fn new(transport: &'a mut CommandTransport<C>, config: &'a FileTransferConfig) -> Self {
        Self { transport, config }
    }

    /// Read up to `max` bytes of `name` starting at `offset`.
    ///
    /// An empty block means `offset` is at or past the end of the file.
    pub fn read_block(&mut self, name: &str, offset: u32, max: u32) -> Result<Bytes> {
        let request_id: u32 = rand::random();
        let mut request = BytesMut::with_capacity(12 + name.len() + 1);
        request.put_u32_le(request_id);
        request.put_u32_le(offset);
        request.put_u32_le(max);
        let mut name_bytes = Vec::with_capacity(name.len() + 1);
        push_cstr(&mut name_bytes, "file name", name)?;
        request.put_slice(&name_bytes);

        let reply = self.transport.exchange(
            FILE_READ,
            &request,
            FILE_READ_REPLY,
            self.config.read_timeout,
        )?;
        let raw = || Frame::new(FILE_READ_REPLY, reply.clone()).to_raw();

        if reply.len() < READ_REPLY_HEADER {
            return Err(ClientError::protocol(
                format!("read reply too short ({} bytes)", reply.len()),
                raw(),
            ));
        }
        let reply_id = read_u32(&reply, 0);
        let size = read_u32(&reply, 4);

        if reply_id != request_id {
            return Err(ClientError::protocol(
                format!(
                    "reply addressed to another operation ({reply_id:#010x}, expected {request_id:#010x})"
                ),
                raw(),
            ));
        }
        if reply.len() != READ_REPLY_HEADER + size as usize {
            return Err(ClientError::protocol(
                format!(
                    "invalid read reply length {} (block of {size} + {READ_REPLY_HEADER})",
                    reply.len()
                ),
                raw(),
            ));
        }

        debug!(file = name, offset, size, "read block");
        Ok(reply.slice(READ_REPLY_HEADER..))
    }

    /// Read a whole file.
    pub fn read_file(&mut self, name: &str) -> Result<(Vec<u8>, TransferStats)> {
        let started = Instant::now();
        let mut data = Vec::new();
        let mut offset: u32 = 0;
        let mut blocks = 0u32;

        loop {
            let block = self.read_block(name, offset, self.config.read_block_size)?;
            blocks += 1;
            if block.is_empty() {
                break;
            }
            data.extend_from_slice(&block);
            offset = u32::try_from(data.len()).map_err(|_| {
                ClientError::protocol("file exceeds the 4 GiB offset range", Bytes::new())
            })?;
        }

        let stats = TransferStats {
            bytes: data.len() as u64,
            blocks,
            elapsed: started.elapsed(),
        };
        info!(file = name, bytes = stats.bytes, blocks, elapsed_ms = stats.elapsed.as_millis() as u64, "read file");
        Ok((data, stats))
    }

    /// Write one chunk of `name` at `offset` and wait for its acknowledgement.
    ///
    /// The same frame, request id included, is re-sent each time the
    /// acknowledgement times out, up to the configured number of attempts.
    pub fn write_block(&mut self, name: &str, offset: u32, chunk: &[u8]) -> Result<()> {
        let request_id: u32 = rand::random();
        let len = u32::try_from(chunk.len())
            .map_err(|_| ClientError::InvalidRequest("write chunk too large".to_string()))?;
        let mut request = Vec::with_capacity(12 + name.len() + 1 + chunk.len());
        request.extend_from_slice(&request_id.to_le_bytes());
        request.extend_from_slice(&offset.to_le_bytes());
        request.extend_from_slice(&len.to_le_bytes());
        push_cstr(&mut request, "file name", name)?;
        request.extend_from_slice(chunk);

        let attempts = self.config.write_retries.max(1);
        let timeout = self.config.write_ack_timeout;

        for attempt in 1..=attempts {
            self.transport.send(FILE_WRITE, &request)?;
            let deadline = Instant::now() + timeout;

            match self.await_ack(request_id, deadline, timeout) {
                Ok(()) => {
                    debug!(file = name, offset, len, attempt, "wrote block");
                    return Ok(());
                }
                Err(ClientError::Timeout(_)) => {
                    warn!(file = name, offset, attempt, attempts, "write not acknowledged");
                }
                Err(err) => return Err(err),
            }
        }

        Err(ClientError::RetriesExhausted {
            file: name.to_string(),
            offset,
            attempts,
        })
    }

    /// Write `data` as the content of `name`. Empty data sends nothing.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<TransferStats> {
        push_cstr(&mut Vec::new(), "file name", name)?;
        u32::try_from(data.len())
            .map_err(|_| ClientError::InvalidRequest("file exceeds 4 GiB".to_string()))?;

        let started = Instant::now();
        let mut blocks = 0u32;
        let mut offset = 0u32;
        for chunk in data.chunks(self.config.write_chunk_size.max(1)) {
            self.write_block(name, offset, chunk)?;
            blocks += 1;
            // The whole file fits in u32, checked above.
            offset += chunk.len() as u32;
        }

        let stats = TransferStats {
            bytes: data.len() as u64,
            blocks,
            elapsed: started.elapsed(),
        };
        info!(file = name, bytes = stats.bytes, blocks, elapsed_ms = stats.elapsed.as_millis() as u64, "wrote file");
        Ok(stats)
    }

    fn await_ack(&mut self, request_id: u32, deadline: Instant, timeout: Duration) -> Result<()> {
        loop {
            let payload = self
                .transport
                .await_reply_until(FILE_ERROR, deadline, timeout)?;
            let ack = FileAck::decode(&payload)?;

            if ack.request_id != request_id {
                warn!(
                    got = ack.request_id,
                    expected = request_id,
                    "ignoring acknowledgement for another operation"
                );
                continue;
            }
            if ack.code != FileErrorCode::Ok {
                return Err(ClientError::Device {
                    fault: DeviceFault::File {
                        request_id,
                        code: ack.code,
                    },
                    frame: Frame::new(FILE_ERROR, payload).to_raw(),
                });
            }
            return Ok(());
        }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use kbox_frame::{encode_frame, SlipDecoder};
    use kbox_transport::MemoryChannel;

    use super::*;

    const T: Duration = Duration::from_millis(20);

    fn wire(command: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(command, payload, &mut buf);
        buf.to_vec()
    }

    fn sent_frames(bytes: &[u8]) -> Vec<Frame> {
        let mut src = BytesMut::from(bytes);
        let mut decoder = SlipDecoder::default();
        let mut out = Vec::new();
        while let Some(raw) = decoder.decode(&mut src).unwrap() {
            out.push(Frame::decode(raw).unwrap());
        }
        out
    }

    fn ack(id: u32, code: u32) -> Vec<u8> {
        let mut p = id.to_le_bytes().to_vec();
        p.extend_from_slice(&code.to_le_bytes());
        wire(FILE_ERROR, &p)
    }

    fn config() -> FileTransferConfig {
        FileTransferConfig {
            write_chunk_size: 4,
            write_ack_timeout: T,
            read_timeout: T,
            ..FileTransferConfig::default()
        }
    }

    fn request_id(frame_bytes: &[u8]) -> u32 {
        let frame = &sent_frames(frame_bytes)[0];
        read_u32(&frame.payload, 0)
    }

    #[test]
    fn error_codes() {
        assert_eq!(FileErrorCode::from(0), FileErrorCode::Ok);
        assert_eq!(FileErrorCode::from(1), FileErrorCode::NoSuchFile);
        assert_eq!(FileErrorCode::from(2), FileErrorCode::InvalidWrite);
        assert_eq!(FileErrorCode::from(3), FileErrorCode::WriteError);
        assert_eq!(FileErrorCode::from(77), FileErrorCode::Other(77));
        assert_eq!(FileErrorCode::from(77).to_string(), "error 77");
    }

    #[test]
    fn ack_must_be_eight_bytes() {
        assert!(FileAck::decode(&[0; 7]).is_err());
        let ack = FileAck::decode(&[1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        assert_eq!(ack.request_id, 1);
        assert_eq!(ack.code, FileErrorCode::InvalidWrite);
    }

    #[test]
    fn stats_rate() {
        let stats = TransferStats {
            bytes: 2048,
            blocks: 2,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(stats.bytes_per_sec(), Some(1024.0));
        assert_eq!(stats.to_string(), "2048 bytes in 2000 ms, 1.0 kB/s (2 blocks)");
        assert_eq!(TransferStats::default().bytes_per_sec(), None);
    }

    #[test]
    fn read_block_request_layout() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| {
            let id = request_id(bytes);
            let mut reply = id.to_le_bytes().to_vec();
            reply.extend_from_slice(&3u32.to_le_bytes());
            reply.extend_from_slice(b"abc");
            wire(FILE_READ_REPLY, &reply)
        });
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();
        let mut files = FileTransfer::new(&mut transport, &cfg);

        let block = files.read_block("log.txt", 16, 64).unwrap();
        assert_eq!(block.as_ref(), b"abc");

        let sent = sent_frames(&channel.written());
        assert_eq!(sent[0].command, FILE_READ);
        assert_eq!(read_u32(&sent[0].payload, 4), 16);
        assert_eq!(read_u32(&sent[0].payload, 8), 64);
        assert_eq!(&sent[0].payload[12..], b"log.txt\0");
    }

    #[test]
    fn read_reply_for_other_id_is_protocol_error() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| {
            let id = request_id(bytes).wrapping_add(1);
            let mut reply = id.to_le_bytes().to_vec();
            reply.extend_from_slice(&0u32.to_le_bytes());
            wire(FILE_READ_REPLY, &reply)
        });
        let mut transport = CommandTransport::new(channel).unwrap();
        let cfg = config();
        let err = FileTransfer::new(&mut transport, &cfg)
            .read_block("x", 0, 8)
            .unwrap_err();
        assert!(err.to_string().contains("another operation"));
    }

    #[test]
    fn read_reply_length_mismatch_is_protocol_error() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| {
            let mut reply = request_id(bytes).to_le_bytes().to_vec();
            reply.extend_from_slice(&10u32.to_le_bytes());
            reply.extend_from_slice(b"short");
            wire(FILE_READ_REPLY, &reply)
        });
        let mut transport = CommandTransport::new(channel).unwrap();
        let cfg = config();
        let err = FileTransfer::new(&mut transport, &cfg)
            .read_block("x", 0, 8)
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
    }

    #[test]
    fn missing_file_is_device_error() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| ack(request_id(bytes), 1));
        let mut transport = CommandTransport::new(channel).unwrap();
        let cfg = config();
        let err = FileTransfer::new(&mut transport, &cfg)
            .read_file("nope")
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Device {
                fault: DeviceFault::File {
                    code: FileErrorCode::NoSuchFile,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn write_block_layout_and_ack() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| ack(request_id(bytes), 0));
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();

        FileTransfer::new(&mut transport, &cfg)
            .write_block("a.bin", 8, b"\xc0\xdb")
            .unwrap();

        let sent = sent_frames(&channel.written());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, FILE_WRITE);
        assert_eq!(read_u32(&sent[0].payload, 4), 8);
        assert_eq!(read_u32(&sent[0].payload, 8), 2);
        assert_eq!(&sent[0].payload[12..], b"a.bin\0\xc0\xdb");
    }

    #[test]
    fn write_error_code_is_not_retried() {
        let channel = MemoryChannel::new();
        channel.set_responder(|bytes| ack(request_id(bytes), 3));
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();

        let err = FileTransfer::new(&mut transport, &cfg)
            .write_block("a", 0, b"x")
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Device {
                fault: DeviceFault::File {
                    code: FileErrorCode::WriteError,
                    ..
                },
                ..
            }
        ));
        assert_eq!(sent_frames(&channel.written()).len(), 1);
    }

    #[test]
    fn malformed_ack_is_not_retried() {
        let channel = MemoryChannel::new();
        channel.set_responder(|_| wire(FILE_ERROR, &[0; 4]));
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();

        let err = FileTransfer::new(&mut transport, &cfg)
            .write_block("a", 0, b"x")
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
        assert_eq!(sent_frames(&channel.written()).len(), 1);
    }

    #[test]
    fn empty_write_sends_nothing() {
        let channel = MemoryChannel::new();
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();

        let stats = FileTransfer::new(&mut transport, &cfg)
            .write_file("empty", b"")
            .unwrap();
        assert_eq!(stats.blocks, 0);
        assert!(channel.written().is_empty());
    }

    #[test]
    fn nul_in_name_is_rejected_before_sending() {
        let channel = MemoryChannel::new();
        let mut transport = CommandTransport::new(channel.clone()).unwrap();
        let cfg = config();
        let mut files = FileTransfer::new(&mut transport, &cfg);

        assert!(matches!(
            files.write_file("a\0b", b"data").unwrap_err(),
            ClientError::InvalidRequest(_)
        ));
        assert!(matches!(
            files.read_block("a\0b", 0, 1).unwrap_err(),
            ClientError::InvalidRequest(_)
        ));
        assert!(channel.written().is_empty());
    }

    /// Noise on every read, counts the frames written.
    #[derive(Clone, Default)]
    struct NoisyLine {
        writes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ByteChannel for NoisyLine {
        fn read_timeout(
            &mut self,
            buf: &mut [u8],
            timeout: Duration,
        ) -> kbox_transport::Result<usize> {
            std::thread::sleep(Duration::from_millis(2).min(timeout));
            buf[0] = 0x55;
            Ok(1)
        }

        fn write_all(&mut self, _bytes: &[u8]) -> kbox_transport::Result<()> {
            self.writes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn try_clone(&self) -> kbox_transport::Result<Self> {
            Ok(self.clone())
        }

        fn describe(&self) -> String {
            "noisy line".to_string()
        }
    }

    #[test]
    fn noise_does_not_delay_write_retries() {
        let line = NoisyLine::default();
        let mut transport = CommandTransport::new(line.clone()).unwrap();
        let cfg = config();

        let started = Instant::now();
        let err = FileTransfer::new(&mut transport, &cfg)
            .write_block("log.txt", 0, b"data")
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(line.writes.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert!(started.elapsed() < T * 3 * 10, "took {:?}", started.elapsed());
    }
}
