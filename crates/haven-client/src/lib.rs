//! Channel sessions over the Haven REST API and gateway.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod session;

pub use api::{ChatApi, HttpApi};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use gateway::{ConnectionState, GatewayHandle, GatewayLink, PushSource};
pub use membership::{MemberList, MembershipGate, Permissions};
pub use session::ChannelSession;
