//! rallybot - chat-platform automation bot.
//!
//! Interactive sessions bound to one actor and a TTL, keyed recruitment
//! records, and deferred bulk mutations that can be undone later from a
//! snapshot.

pub mod bot;
pub mod bulk;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod metrics;
pub mod recruit;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod telemetry;
