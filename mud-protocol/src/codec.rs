//! Newline-delimited JSON framing. One frame per line; no
//! length prefix, no compression, no encryption -- the simplest thing
//! that lets a `nc`/telnet client speak the protocol by hand, which is
//! worth more for a text MUD than a binary codec's density.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ProtocolError;
use crate::frame::{ClientFrame, ServerFrame};

/// Lines longer than this are a protocol violation, not a buffering
/// strategy; a well-behaved client never sends one.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Reads one frame from a buffered reader. Returns `Ok(None)` on a
/// clean EOF (the peer closed the socket); any other outcome is an
/// error or a parsed frame.
pub async fn read_client_frame<R>(
    reader: &mut BufReader<R>,
) -> Result<Option<ClientFrame>, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Tolerate blank keep-alive lines instead of treating them
            // as malformed frames.
            continue;
        }
        if trimmed.len() > MAX_FRAME_BYTES {
            return Err(ProtocolError::FrameTooLarge(trimmed.len()));
        }
        let frame: ClientFrame = serde_json::from_str(trimmed)?;
        return Ok(Some(frame));
    }
}

/// Writes one frame terminated by `\n` and flushes. Flushing every
/// frame keeps latency low for a chat-like protocol; the session layer
/// still funnels writes through a single per-connection task so this
/// never races with itself.
pub async fn write_server_frame<W>(
    writer: &mut W,
    frame: &ServerFrame,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(frame)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_core::MessageType;
    use tokio::io::BufReader as TokioBufReader;

    #[tokio::test]
    async fn round_trips_a_command_frame() {
        let input = b"{\"type\":\"command\",\"data\":{\"command\":\"look\"}}\n".to_vec();
        let mut reader = TokioBufReader::new(&input[..]);
        let frame = read_client_frame(&mut reader).await.unwrap().unwrap();
        match frame {
            ClientFrame::Command { command } => assert_eq!(command, "look"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn eof_yields_none() {
        let input: Vec<u8> = Vec::new();
        let mut reader = TokioBufReader::new(&input[..]);
        assert!(read_client_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn skips_blank_lines() {
        let input = b"\n\n{\"type\":\"command\",\"data\":{\"command\":\"inventory\"}}\n".to_vec();
        let mut reader = TokioBufReader::new(&input[..]);
        let frame = read_client_frame(&mut reader).await.unwrap().unwrap();
        assert!(matches!(frame, ClientFrame::Command { command } if command == "inventory"));
    }

    #[tokio::test]
    async fn writes_newline_terminated_json() {
        let mut buf: Vec<u8> = Vec::new();
        let frame = ServerFrame::message(MessageType::Info, "hello", 0);
        write_server_frame(&mut buf, &frame).await.unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"text\":\"hello\""));
    }
}
