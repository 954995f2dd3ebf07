//! Learning Platform Domain Logic
//!
//! ## Current API
//!
//! - Store and look up sessions, deriving their live status from the schedule
//! - Record quiz answers and aggregate per-question performance
//! - Maintain the three engagement clusters of a session
//!
pub mod clock;
pub mod clustering;
pub mod error;
pub mod quiz;
pub mod session;
pub mod storage;
