//! Two-generation sample store.

use std::mem;

use super::model::Sample;

/// Holds the previous and the current sample.
///
/// The first sample only establishes a baseline: [`SampleStore::pair`]
/// returns `None` until two samples have been stored.
#[derive(Debug, Default)]
pub struct SampleStore {
    previous: Option<Sample>,
    current: Option<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts `current` into `previous` and stores `sample` as current.
    ///
    /// The old previous generation is dropped; the shift is a move, not a copy.
    pub fn advance(&mut self, sample: Sample) {
        self.previous = mem::replace(&mut self.current, Some(sample));
    }

    /// Returns `(previous, current)` once both generations exist.
    pub fn pair(&self) -> Option<(&Sample, &Sample)> {
        match (&self.previous, &self.current) {
            (Some(prev), Some(curr)) => Some((prev, curr)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::model::RawCpuCounters;

    fn sample(idle: u64) -> Sample {
        Sample {
            cpu: RawCpuCounters {
                idle_ticks: idle,
                ..RawCpuCounters::default()
            },
            ..Sample::default()
        }
    }

    #[test]
    fn first_sample_is_baseline() {
        let mut store = SampleStore::new();
        assert!(store.pair().is_none());

        store.advance(sample(100));
        assert!(store.pair().is_none());

        store.advance(sample(200));
        assert_eq!(store.pair().unwrap().0.cpu.idle_ticks, 100);
    }

    #[test]
    fn advance_shifts_generations() {
        let mut store = SampleStore::new();
        store.advance(sample(100));
        store.advance(sample(200));

        let (prev, curr) = store.pair().unwrap();
        assert_eq!(prev.cpu.idle_ticks, 100);
        assert_eq!(curr.cpu.idle_ticks, 200);

        store.advance(sample(300));
        let (prev, curr) = store.pair().unwrap();
        assert_eq!(prev.cpu.idle_ticks, 200);
        assert_eq!(curr.cpu.idle_ticks, 300);
    }
}
