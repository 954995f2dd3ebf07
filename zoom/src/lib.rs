//! Zoom video-conferencing binding
//!
//! ## Current API
//!
//! - Exchange server-to-server OAuth credentials for a bearer token
//! - Create scheduled meetings
//! - Verify webhook deliveries and answer the URL validation handshake
//! - Sign Meeting SDK join tokens
//!
pub mod client;
pub mod config;
pub mod error;
pub mod signature;
pub mod webhook;

pub use client::{Meeting, MeetingRequest, MeetingScheduler, ZoomClient};
pub use config::ZoomConfig;
pub use error::Error;
