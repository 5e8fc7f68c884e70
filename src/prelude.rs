pub use crate::config::{AppConfig, ConfigError, ListenAddress, LocationConfig, ServerConfig};
pub use crate::error::Result;
pub use crate::http::*;

pub use crate::*;
pub use mio::{
    Events, Interest, Poll, Token,
    event::Event,
    net::{TcpListener, TcpStream},
};
pub use proxy_log::{debug, errors, info, trace, warn};
pub use std::collections::{BTreeMap, HashMap};
pub use std::fs::{self, File, OpenOptions};
pub use std::io::{ErrorKind, Read, Write};
pub use std::net::SocketAddr;
pub use std::os::unix::fs::MetadataExt;
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
pub use std::time::Duration;
pub use std::time::Instant;

pub use std::{
    fmt::{self, Display},
    io,
    os::{
        fd::{FromRawFd, IntoRawFd},
        unix::net::UnixStream,
    },
    process::{Command, Stdio},
    str::FromStr,
    time::SystemTime,
};

pub use mio::*;

pub use crate::{
    cgi::{build_cgi_env, check_time_out_cgi, cleanup_cgi, force_cgi_timeout, handle_cgi_event},
    handlers::{handle_delete, handle_get},
    http::HttpResponse,
    router,
    router::RoutingError,
    server::Server,
    upload::{Upload, UploadState},
};

pub use crate::http::{HttpRequest, PartInfo, find_subsequence, parse_part_headers};

pub const READ_BUF_SIZE: usize = 4096;
// 2xx Success
pub const HTTP_OK: u16 = 200;
pub const HTTP_CREATED: u16 = 201;

// 3xx Redirection
pub const HTTP_FOUND: u16 = 302;

// 4xx Client Errors
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_FORBIDDEN: u16 = 403;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_METHOD_NOT_ALLOWED: u16 = 405;
pub const HTTP_PAYLOAD_TOO_LARGE: u16 = 413;
pub const HTTP_URI_TOO_LONG: u16 = 414;
pub const HTTP_HEADER_FIELDS_TOO_LARGE: u16 = 431;

// 5xx Server Errors
pub const HTTP_INTERNAL_SERVER_ERROR: u16 = 500;
pub const HTTP_NOT_IMPLEMENTED: u16 = 501;
pub const HTTP_BAD_GATEWAY: u16 = 502;
pub const GATEWAY_TIMEOUT: u16 = 504;

pub const _1MB: usize = 1_024 * 1024;
pub const MAX_READ_DATA: usize = u16::MAX as usize; // 64KB

/// Idle-connection reap window for client sockets with no CGI in flight.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound on a CGI child's lifetime before it is killed and a 504 sent.
pub const TIMEOUT_CGI: Duration = Duration::from_secs(30);
