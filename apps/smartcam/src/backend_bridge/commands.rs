//! Commands queued from the presentation side to the backend worker.

use shared::domain::{ImageRef, ImageSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    StartStream,
    StopStream,
    SetLabel { text: String },
    SetImage { image: ImageRef },
    AcquireImage { source: ImageSource },
    SubmitEnrollment,
    NewEntry,
}
