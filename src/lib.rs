//! Shared sosbeacon library exports that keep the binary aligned on flow behavior.

pub mod analysis;
pub mod audio;
pub mod camera;
pub mod config;
pub mod evidence;
pub mod flow;
pub mod geo;
pub mod identity;
pub mod intake;
mod lock;
mod telemetry;

pub(crate) use lock::lock_or_recover;
pub use telemetry::init_tracing;
