//! Scrubbing player core.
//!
//! A session plays one local video through a [`player::MediaPlayer`] and keeps
//! the playback position, the filmstrip scroll offset and the elapsed time
//! readout in sync. Scrubbing seeks are coalesced so the decoder never sees more
//! than one seek at a time, and the filmstrip thumbnails are extracted
//! concurrently but always shown in timeline order.

pub mod config;
pub mod constants;
pub mod events;
pub mod player;
pub mod scrubber;
pub mod session;
pub mod utils;
pub mod workers;

pub use config::Config;
pub use session::{ScrollUpdate, SessionHandle, SessionSnapshot, spawn_session};
