use std::io::Write;

// ---------------------------------------------------------------------------
// SSE framing helpers
// ---------------------------------------------------------------------------

/// Raw HTTP response head for an event stream. Written by hand because the
/// handler streams through `Request::into_writer`.
pub const SSE_RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
                                     Content-Type: text/event-stream\r\n\
                                     Cache-Control: no-cache\r\n\
                                     Connection: keep-alive\r\n\
                                     X-Accel-Buffering: no\r\n\
                                     \r\n";

/// Keep-alive comment; ignored by `EventSource` clients.
pub const SSE_KEEPALIVE: &str = ": ping\n\n";

/// Formats a named SSE event with a JSON data payload.
///
/// ```text
/// event: <name>
/// data: <json>
///
/// ```
pub fn format_sse_event(event_name: &str, json_data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event_name, json_data)
}

/// Writes and flushes one frame. Returns `false` once the client is gone.
pub fn write_sse<W: Write + ?Sized>(writer: &mut W, msg: &str) -> bool {
    writer.write_all(msg.as_bytes()).is_ok() && writer.flush().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_frame_layout() {
        assert_eq!(format_sse_event("done", "{}"), "event: done\ndata: {}\n\n");
    }

    #[test]
    fn write_sse_appends_frames() {
        let mut buf: Vec<u8> = Vec::new();
        assert!(write_sse(&mut buf, SSE_KEEPALIVE));
        assert!(write_sse(&mut buf, &format_sse_event("a", "1")));
        assert_eq!(String::from_utf8(buf).unwrap(), ": ping\n\nevent: a\ndata: 1\n\n");
    }
}
