//! Relay wire format
//!
//! A subscriber opens the stream with its topic as one newline-terminated
//! UTF-8 line. Every file then travels as a 4-byte big-endian length followed
//! by exactly that many bytes. There is no type byte, checksum or sequence
//! number.

use crate::domain::errors::{RelayError, StudyhubError};
use crate::domain::ids::Topic;
use crate::domain::Result;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
};

/// Bytes per body chunk
pub const CHUNK_SIZE: usize = 1024;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Longest accepted topic line, newline included
pub const MAX_TOPIC_LINE: usize = 64 * 1024;

/// Encode a file length as the 4-byte big-endian prefix
///
/// # Examples
///
/// ```
/// use studyhub::adapters::relay::codec::{decode_length, encode_length};
///
/// let prefix = encode_length(10240).unwrap();
/// assert_eq!(prefix, [0, 0, 0x28, 0]);
/// assert_eq!(decode_length(prefix), 10240);
/// assert!(encode_length(u64::from(u32::MAX) + 1).is_err());
/// ```
pub fn encode_length(len: u64) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    let len = u32::try_from(len).map_err(|_| RelayError::FileTooLarge { size: len })?;
    Ok(len.to_be_bytes())
}

pub fn decode_length(prefix: [u8; LENGTH_PREFIX_SIZE]) -> u32 {
    u32::from_be_bytes(prefix)
}

/// Map transport errors, a vanished peer becomes [`RelayError::Disconnected`]
pub(crate) fn transport_error(err: std::io::Error, context: &str) -> StudyhubError {
    match err.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => RelayError::Disconnected(format!("{context}: {err}")).into(),
        _ => StudyhubError::Io(format!("{context}: {err}")),
    }
}

pub async fn write_topic<W>(writer: &mut W, topic: &Topic) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = format!("{}\n", topic.as_str());
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| transport_error(e, "while sending topic"))?;
    writer
        .flush()
        .await
        .map_err(|e| transport_error(e, "while sending topic"))
}

/// Read the subscriber's topic line
///
/// # Errors
///
/// [`RelayError::Disconnected`] if the stream ends before a full line,
/// [`RelayError::InvalidTopic`] if the line is not valid UTF-8, empty, or
/// longer than [`MAX_TOPIC_LINE`].
pub async fn read_topic<R>(reader: &mut R) -> Result<Topic>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    (&mut *reader)
        .take(MAX_TOPIC_LINE as u64)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| transport_error(e, "while reading topic"))?;

    if line.last() != Some(&b'\n') {
        if line.len() >= MAX_TOPIC_LINE {
            return Err(RelayError::InvalidTopic(format!(
                "topic line exceeds {MAX_TOPIC_LINE} bytes"
            ))
            .into());
        }
        return Err(
            RelayError::Disconnected("stream closed before topic line".to_string()).into(),
        );
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    let topic = String::from_utf8(line)
        .map_err(|_| RelayError::InvalidTopic("topic is not valid UTF-8".to_string()))?;
    Topic::new(topic).map_err(|e| RelayError::InvalidTopic(e).into())
}

/// Send one file: length prefix, flush, then the body in flushed chunks
///
/// Returns the number of body bytes written.
pub async fn write_file_frame<W>(writer: &mut W, path: &Path) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let (mut file, size) = open_frame_source(path).await?;
    write_frame(writer, &mut file, size, path).await
}

/// Open `path` for sending and check that its length fits the prefix
///
/// Nothing is written, so a failure here leaves the stream intact.
pub(crate) async fn open_frame_source(path: &Path) -> Result<(File, u64)> {
    let file = File::open(path).await.map_err(|e| {
        StudyhubError::Io(format!("Failed to open {} for publishing: {}", path.display(), e))
    })?;
    let size = file.metadata().await?.len();
    encode_length(size)?;
    Ok((file, size))
}

/// Write one frame of `size` bytes read from `file`
///
/// Any error leaves a partial frame on the stream, the caller must not write
/// to it again.
pub(crate) async fn write_frame<W>(
    writer: &mut W,
    file: &mut File,
    size: u64,
    path: &Path,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let prefix = encode_length(size)?;
    writer
        .write_all(&prefix)
        .await
        .map_err(|e| transport_error(e, "while sending length"))?;
    writer
        .flush()
        .await
        .map_err(|e| transport_error(e, "while sending length"))?;

    let mut remaining = size;
    let mut chunk = [0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let read = file.read(&mut chunk[..want]).await?;
        if read == 0 {
            return Err(StudyhubError::Io(format!(
                "{} was truncated while publishing",
                path.display()
            )));
        }
        writer
            .write_all(&chunk[..read])
            .await
            .map_err(|e| transport_error(e, "while sending body"))?;
        writer
            .flush()
            .await
            .map_err(|e| transport_error(e, "while sending body"))?;
        remaining -= read as u64;
    }

    Ok(size)
}

/// Receive one file into `dest`
///
/// A partially received file is removed before the error is returned.
/// Returns the number of body bytes received.
pub async fn read_file_frame<R>(reader: &mut R, dest: &Path) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(|e| transport_error(e, "while reading length"))?;
    let size = u64::from(decode_length(prefix));

    let result = receive_body(reader, dest, size).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    result.map(|()| size)
}

async fn receive_body<R>(reader: &mut R, dest: &Path, size: u64) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(dest).await.map_err(|e| {
        StudyhubError::Io(format!("Failed to create {}: {}", dest.display(), e))
    })?;

    let mut remaining = size;
    let mut chunk = [0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        reader
            .read_exact(&mut chunk[..want])
            .await
            .map_err(|e| transport_error(e, "while reading body"))?;
        file.write_all(&chunk[..want]).await?;
        remaining -= want as u64;
    }

    file.flush().await?;
    Ok(())
}
