//! Incremental server-sent-event decoder.
//!
//! Network reads arrive in arbitrary slices. Bytes are held until a blank
//! line completes an event, so a UTF-8 sequence split across reads is never
//! decoded half-way.

/// Accumulates raw bytes and yields the `data` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already examined for line ends.
    scanned: usize,
    /// Start of the line currently being read.
    line_start: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read. Returns payloads of the events it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut event_start = 0;
        let mut pos = self.scanned;

        while pos < self.buffer.len() {
            let blank = pos == self.line_start;
            let eol = match self.buffer[pos] {
                b'\n' => 1,
                b'\r' => match self.buffer.get(pos + 1) {
                    Some(b'\n') => 2,
                    Some(_) => 1,
                    // A lone `\r` already ends a blank line; otherwise wait for the next read.
                    None if blank => 1,
                    None => break,
                },
                _ => {
                    pos += 1;
                    continue;
                }
            };

            if blank {
                let block = &self.buffer[event_start..pos];
                if let Some(data) = parse_event(&String::from_utf8_lossy(block)) {
                    payloads.push(data);
                }
                event_start = pos + eol;
            }
            pos += eol;
            self.line_start = pos;
        }

        self.buffer.drain(..event_start);
        self.scanned = pos - event_start;
        self.line_start -= event_start;
        payloads
    }

    /// Bytes of an event still waiting for its terminating blank line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Collect the `data` field of one event block. Comments and other fields are ignored.
fn parse_event(block: &str) -> Option<String> {
    let mut data: Vec<&str> = Vec::new();

    for line in block.split(['\n', '\r']) {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            data.push(value);
        }
    }

    if data.is_empty() {
        None
    } else {
        Some(data.join("\n"))
    }
}
