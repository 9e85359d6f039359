use crate::types::constants::{stomp_commands, stomp_headers, HEARTBEAT_INTERVAL, STOMP_VERSION};
use crate::types::{Result, StatusError};

/// STOMP frame commands understood by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCommand {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Message,
    Error,
    Receipt,
    Disconnect,
}

impl FrameCommand {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            stomp_commands::CONNECT => Ok(Self::Connect),
            stomp_commands::CONNECTED => Ok(Self::Connected),
            stomp_commands::SUBSCRIBE => Ok(Self::Subscribe),
            stomp_commands::UNSUBSCRIBE => Ok(Self::Unsubscribe),
            stomp_commands::MESSAGE => Ok(Self::Message),
            stomp_commands::ERROR => Ok(Self::Error),
            stomp_commands::RECEIPT => Ok(Self::Receipt),
            stomp_commands::DISCONNECT => Ok(Self::Disconnect),
            other => Err(StatusError::Protocol(format!(
                "unknown STOMP command: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => stomp_commands::CONNECT,
            Self::Connected => stomp_commands::CONNECTED,
            Self::Subscribe => stomp_commands::SUBSCRIBE,
            Self::Unsubscribe => stomp_commands::UNSUBSCRIBE,
            Self::Message => stomp_commands::MESSAGE,
            Self::Error => stomp_commands::ERROR,
            Self::Receipt => stomp_commands::RECEIPT,
            Self::Disconnect => stomp_commands::DISCONNECT,
        }
    }

    /// CONNECT and CONNECTED frames never use header octet escaping (STOMP 1.2)
    fn uses_header_escaping(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl std::fmt::Display for FrameCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single STOMP 1.2 frame.
///
/// One websocket text message carries exactly one frame; a message consisting
/// of a bare newline is a heartbeat, represented as `None` by [`Frame::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub command: FrameCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: FrameCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for the given header name, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable detail for an ERROR frame (`message` header, else body)
    pub fn error_detail(&self) -> String {
        self.header(stomp_headers::MESSAGE)
            .map(str::to_string)
            .unwrap_or_else(|| self.body.trim_end_matches('\0').to_string())
    }

    /// CONNECT frame for the session handshake
    pub fn connect(host: &str, heartbeat_interval: u64) -> Self {
        Self::new(FrameCommand::Connect)
            .with_header(stomp_headers::ACCEPT_VERSION, STOMP_VERSION)
            .with_header(stomp_headers::HOST, host)
            .with_header(
                stomp_headers::HEART_BEAT,
                format!("{},{}", heartbeat_interval, heartbeat_interval),
            )
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(FrameCommand::Subscribe)
            .with_header(stomp_headers::ID, id)
            .with_header(stomp_headers::DESTINATION, destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(FrameCommand::Unsubscribe).with_header(stomp_headers::ID, id)
    }

    pub fn disconnect() -> Self {
        Self::new(FrameCommand::Disconnect)
    }

    /// The heartbeat "frame": a single end-of-line
    pub fn heartbeat() -> String {
        "\n".to_string()
    }

    /// Serializes the frame to its wire form (NUL-terminated)
    pub fn serialize(&self) -> String {
        let escape = self.command.uses_header_escaping();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(stomp_headers::CONTENT_LENGTH);
            out.push(':');
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses one inbound websocket text message.
    ///
    /// Returns `Ok(None)` for a heartbeat, `Ok(Some(frame))` for a well-formed
    /// frame, `Err` for anything else.
    pub fn parse(raw: &str) -> Result<Option<Frame>> {
        let raw = raw.strip_suffix('\0').unwrap_or(raw);
        // Heartbeats are EOL-only messages
        if raw.is_empty() || raw == "\n" || raw == "\r\n" {
            return Ok(None);
        }

        // the blank line ending the headers may use either EOL form
        let (head, body) = match (raw.find("\r\n\r\n"), raw.find("\n\n")) {
            (Some(crlf), Some(lf)) if crlf < lf => (&raw[..crlf], &raw[crlf + 4..]),
            (Some(crlf), None) => (&raw[..crlf], &raw[crlf + 4..]),
            (_, Some(lf)) => (&raw[..lf], &raw[lf + 2..]),
            (None, None) => (raw, ""),
        };

        let mut lines = head.lines();
        let command_line = lines
            .next()
            .ok_or_else(|| StatusError::Protocol("empty frame".to_string()))?;
        let command = FrameCommand::parse(command_line.trim_end_matches('\r'))?;

        let unescape_headers = command.uses_header_escaping();
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                StatusError::Protocol(format!("malformed header line: {}", line))
            })?;
            if unescape_headers {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        Ok(Some(Frame {
            command,
            headers,
            body: body.to_string(),
        }))
    }
}

/// STOMP 1.2 header octet escaping
fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(StatusError::Protocol(format!(
                    "invalid header escape: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Effective heartbeat timings after exchanging `heart-beat` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTimings {
    /// Interval at which this client emits heartbeats (ms, 0 = disabled)
    pub send_interval: u64,
    /// Longest tolerated inbound silence before loss is assumed (ms, 0 = disabled)
    pub expect_interval: u64,
}

/// Negotiates heartbeat timings from the server's `heart-beat:sx,sy` header.
///
/// `sx` is the fastest the server will send, `sy` the fastest it wants to
/// receive; either side sends at the slower of the two rates, 0 disables a
/// direction (STOMP 1.2 semantics).
pub fn negotiate_heartbeat(ours: u64, server_header: Option<&str>) -> HeartbeatTimings {
    let (server_send, server_want) = server_header
        .and_then(|h| {
            let (sx, sy) = h.split_once(',')?;
            Some((sx.trim().parse().ok()?, sy.trim().parse().ok()?))
        })
        .unwrap_or((HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL));

    let send_interval = if ours == 0 || server_want == 0 {
        0
    } else {
        ours.max(server_want)
    };
    let expect_interval = if ours == 0 || server_send == 0 {
        0
    } else {
        ours.max(server_send)
    };

    HeartbeatTimings {
        send_interval,
        expect_interval,
    }
}
