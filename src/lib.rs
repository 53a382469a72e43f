//! Scheduled playlist player for digital signage displays.
//!
//! Playlists come from a [`source::SnapshotSource`] as complete snapshots.
//! [`schedule::select_active`] picks the playlists whose day/time window
//! contains the current local time, and a [`playback::PlaybackController`]
//! plays the first of them on a [`surface::PresentationSurface`], item by
//! item, looping until the schedule or the data says otherwise.

pub mod config;
pub mod core;
pub mod playback;
pub mod render;
pub mod schedule;
pub mod source;
pub mod surface;
pub mod ui;
