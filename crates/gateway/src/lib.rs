//! Authenticating reverse proxy: server, request gate, and upstream forwarding.

pub mod app;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod gate;
pub mod session;

pub use config::{ConfigError, ProxyConfig, SessionMode};
pub use error::{GatewayError, ProxyError};
pub use session::{MockSession, SessionAuthenticator, SignonRedirect};
