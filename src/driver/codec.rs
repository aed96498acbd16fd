//! Frame layout for driver messages
//!
//! A frame is a byte-count header block followed by one JSON document:
//!
//! ```text
//! Content-Length: <bytes>\r\n
//! \r\n
//! <JSON document>
//! ```
//!
//! The writer serializes a whole request in one step; the reader hands
//! back parsed JSON, so framing stays out of the client's request
//! loop.

use std::io;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

const LENGTH_HEADER: &str = "Content-Length:";

/// Upper bound on a single frame. Driver traffic is pref names and
/// addon ids; anything near this limit is a broken driver.
const MAX_FRAME_BYTES: usize = 1 << 20;

fn crash_or_io(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::DriverCrashed
    } else {
        Error::Io(e)
    }
}

/// Read one frame and parse its body
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Value, Error> {
    let mut declared: Option<usize> = None;

    // Header block ends at the first blank line; headers other than
    // the length are tolerated and ignored
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => return Err(Error::DriverCrashed),
            Ok(_) => {}
            Err(e) => return Err(crash_or_io(e)),
        }

        let header = line.trim_end();
        if header.is_empty() {
            break;
        }

        if let Some(rest) = header.strip_prefix(LENGTH_HEADER) {
            let len: usize = rest.trim().parse().map_err(|_| {
                Error::Protocol(format!("bad Content-Length '{}'", rest.trim()))
            })?;
            if len > MAX_FRAME_BYTES {
                return Err(Error::Protocol(format!(
                    "frame of {} bytes exceeds the {} byte limit",
                    len, MAX_FRAME_BYTES
                )));
            }
            declared = Some(len);
        }
    }

    let len = declared
        .ok_or_else(|| Error::Protocol("frame without Content-Length".to_string()))?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(crash_or_io)?;

    serde_json::from_slice(&body)
        .map_err(|e| Error::Protocol(format!("frame body is not JSON: {}", e)))
}

/// Serialize a message and write it as one frame
pub async fn write_frame<W, T>(writer: &mut W, payload: &T) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(payload)?;
    let header = format!("{} {}\r\n\r\n", LENGTH_HEADER, body.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;

    Ok(())
}
