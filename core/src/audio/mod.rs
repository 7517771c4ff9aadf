// Audio playback: blob type, player seam and a process-backed player

mod player;
mod process;

// Shared audio utilities
pub(crate) mod utils;

pub use player::{AudioBlob, AudioPlayer, PlaybackOutcome, PlaybackTicket};
pub use process::{ProcessPlayer, ProcessPlayerConfig};
