//! Adapter implementations of the port traits.
//!
//! - `live`: real GitHub, disk, and wall clock.
//! - `memory`: in-process doubles for tests and dry runs.
//! - `recording` / `replaying`: cassette capture and playback of tracker traffic.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
