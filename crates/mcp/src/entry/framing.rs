#![forbid(unsafe_code)]

use crate::json_rpc_error;
use serde_json::Value;
use std::io::{BufRead, Write};

// Frames larger than this are rejected rather than buffered.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransportMode {
    NewlineJson,
    ContentLength,
}

impl TransportMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NewlineJson => "newline_json",
            Self::ContentLength => "content_length",
        }
    }
}

/// Sniff the framing style from the first non-blank line of the session.
///
/// Bare JSON means newline-delimited mode. A `Content-Length` or
/// `Content-Type` header selects LSP-style header framing; either header is
/// accepted first since clients disagree on the order.
pub(crate) fn detect_mode_from_first_line(line: &str) -> Option<TransportMode> {
    let lead = line.trim_start();
    match lead.as_bytes().first() {
        Some(b'{') | Some(b'[') => Some(TransportMode::NewlineJson),
        Some(_) => {
            let lower = lead.to_ascii_lowercase();
            (lower.starts_with("content-length:") || lower.starts_with("content-type:"))
                .then_some(TransportMode::ContentLength)
        }
        None => None,
    }
}

fn content_length_value(header: &str) -> Option<usize> {
    let (name, value) = header.split_once(':')?;
    name.trim()
        .eq_ignore_ascii_case("content-length")
        .then(|| value.trim().parse::<usize>().ok())
        .flatten()
}

/// Consume one header-framed message. `first_header` is the line the mode
/// sniffer already pulled off the stream.
pub(crate) fn read_content_length_frame<R: BufRead>(
    reader: &mut R,
    first_header: String,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut declared = content_length_value(&first_header);
    let mut line = first_header;

    // Headers end at the first blank line; EOF before that is a normal close.
    while !line.trim_end().is_empty() {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if declared.is_none() {
            declared = content_length_value(&line);
        }
    }

    let len = declared.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    if len > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Content-Length exceeds max allowed size",
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(body))
}

pub(crate) fn write_response<W: Write>(
    writer: &mut W,
    mode: TransportMode,
    resp: &Value,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = serde_json::to_vec(resp)?;
    match mode {
        TransportMode::NewlineJson => {
            writer.write_all(&body)?;
            writer.write_all(b"\n")?;
        }
        TransportMode::ContentLength => {
            write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
            writer.write_all(&body)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Decode one raw frame into a request, or build the error response the
/// caller should write back.
pub(crate) fn parse_request(body: &[u8]) -> Result<crate::JsonRpcRequest, Value> {
    let data: Value = serde_json::from_slice(body)
        .map_err(|e| json_rpc_error(None, -32700, &format!("Parse error: {e}")))?;

    // Pull the id out before strict decoding so even a malformed request gets
    // answered under the id it supplied.
    let Some(shape) = data.as_object() else {
        return Err(json_rpc_error(None, -32600, "Invalid Request"));
    };
    let id = shape.get("id").cloned();
    if !shape.contains_key("method") {
        return Err(json_rpc_error(id, -32600, "Invalid Request"));
    }

    serde_json::from_value(data)
        .map_err(|e| json_rpc_error(id, -32600, &format!("Invalid Request: {e}")))
}
