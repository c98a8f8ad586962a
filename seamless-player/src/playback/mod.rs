//! Playback queue, render callback and control surface

pub mod mixer;
pub mod player;
pub mod queue;
pub mod render;
pub mod track;

#[cfg(test)]
pub(crate) mod test_support;

pub use player::Player;
pub use queue::{CurrentSong, Placement, PlaybackQueue};
pub use render::{render, Renderer};
pub use track::Track;
