//! Buffer for gaze samples collected while a tracking session runs

use crate::Point;

/// Append-only collection of gaze samples.
///
/// An external listener pushes every sample it receives, including the
/// `None`s eye trackers emit when they lose the face. Only finite samples are
/// kept. When tracking ends, [`SampleBuffer::finish`] hands the render
/// pipeline a plain snapshot; the pipeline never reads the buffer while it
/// is still filling.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    points: Vec<Point>,
    dropped: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample. Returns whether it was kept.
    pub fn push(&mut self, sample: Option<Point>) -> bool {
        match sample {
            Some(p) if p.x.is_finite() && p.y.is_finite() => {
                self.points.push(p);
                true
            }
            _ => {
                self.dropped += 1;
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of invalid samples seen so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Stop collecting and return the samples in arrival order.
    pub fn finish(self) -> Vec<Point> {
        self.points
    }
}

impl Extend<Option<Point>> for SampleBuffer {
    fn extend<I: IntoIterator<Item = Option<Point>>>(&mut self, iter: I) {
        for sample in iter {
            self.push(sample);
        }
    }
}
