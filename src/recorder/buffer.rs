//! Frame buffer
//!
//! Camera sessions lend out a buffer that is only valid until the next
//! retrieve, so frames are copied here before the next one is grabbed.

use crate::capture::Frame;

/// Ordered, append-only list of owned frames
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<Frame>,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Copy a borrowed frame into the buffer
    pub fn push_copy(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    /// Total pixel bytes held
    pub fn byte_size(&self) -> usize {
        self.frames.iter().map(|f| f.data().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;

    #[test]
    fn test_copies_are_independent() {
        let mut source = Frame::new(2, 1, PixelFormat::Mono8, vec![1, 2]).unwrap();
        let mut buffer = FrameBuffer::with_capacity(2);

        buffer.push_copy(&source);
        source.data_mut()[0] = 9;
        buffer.push_copy(&source);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_slice()[0].data(), &[1, 2]);
        assert_eq!(buffer.as_slice()[1].data(), &[9, 2]);
        assert_eq!(buffer.byte_size(), 4);
    }
}
