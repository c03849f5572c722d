//! Video encoder trait

use std::path::{Path, PathBuf};

use crate::capture::Frame;
use crate::export::types::{ExportError, VideoOptions};

/// A sink that turns a sequence of frames into one or more video files.
///
/// One `open` .. `append`* .. `close` cycle is an encoder session. An
/// encoder can be reused for another session after `close`.
pub trait VideoEncoder {
    /// Start a new file once the current one reaches `megabytes`.
    /// Zero disables the limit.
    fn set_maximum_file_size(&mut self, megabytes: u64);

    fn open(&mut self, path: &Path, options: &VideoOptions) -> Result<(), ExportError>;

    fn append(&mut self, frame: &Frame) -> Result<(), ExportError>;

    /// Finish the session and return the files written
    fn close(&mut self) -> Result<Vec<PathBuf>, ExportError>;
}
