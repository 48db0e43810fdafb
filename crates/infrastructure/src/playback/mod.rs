mod logging_playback;
mod process_playback;

pub use logging_playback::LoggingPlayback;
pub use process_playback::{ProcessPlayback, render_args};
