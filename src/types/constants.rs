/// STOMP command strings (magic strings layer)
pub mod stomp_commands {
    pub const CONNECT: &str = "CONNECT";
    pub const CONNECTED: &str = "CONNECTED";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
    pub const MESSAGE: &str = "MESSAGE";
    pub const ERROR: &str = "ERROR";
    pub const RECEIPT: &str = "RECEIPT";
    pub const DISCONNECT: &str = "DISCONNECT";
}

/// STOMP header names used by this client
pub mod stomp_headers {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HOST: &str = "host";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const ID: &str = "id";
    pub const DESTINATION: &str = "destination";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const MESSAGE: &str = "message";
    pub const CONTENT_LENGTH: &str = "content-length";
}

/// Channel keys exposed to dashboard consumers
pub mod channels {
    pub const EXTRACTIONS: &str = "extractions";
    pub const MIGRATIONS: &str = "migrations";
    pub const DATA_QUALITY: &str = "data-quality";
}

/// Wire topics carrying job-status events
pub mod topics {
    pub const EXTRACTIONS: &str = "/topic/extractions";
    pub const MIGRATIONS: &str = "/topic/migrations";
    pub const DATA_QUALITY: &str = "/topic/data-quality";
}

/// STOMP protocol version
pub const STOMP_VERSION: &str = "1.2";

/// Default handshake timeout (milliseconds)
pub const DEFAULT_HANDSHAKE_TIMEOUT: u64 = 10_000;

/// Default heartbeat interval, both directions (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 4_000;

/// Missed-heartbeat tolerance: inbound silence longer than
/// `interval * HEARTBEAT_GRACE_FACTOR` counts as connection loss
pub const HEARTBEAT_GRACE_FACTOR: u32 = 3;

/// Reconnect backoff (milliseconds): base delay, doubling per failure
pub const RECONNECT_BASE_DELAY: u64 = 1_000;

/// Reconnect backoff ceiling (milliseconds)
pub const RECONNECT_MAX_DELAY: u64 = 30_000;

/// Consecutive failures tolerated before the client gives up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Query parameter carrying the externally supplied credential
pub const ACCESS_TOKEN_PARAM: &str = "access_token";
