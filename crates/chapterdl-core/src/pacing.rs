//! Inter-chapter pacing.
//!
//! After every `every` processed chapters the pipeline pauses for a random
//! duration in `[min_pause, ceiling]` before fetching the next chapter. This is
//! separate from per-request retry backoff but shares its ceiling.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterPacer {
    /// Pause after this many processed chapters; 0 disables pacing.
    pub every: u32,
    pub min_pause: Duration,
    pub ceiling: Duration,
}

impl ChapterPacer {
    /// Pacing delay due after `processed` chapters, if any.
    pub fn delay_after(&self, processed: u32) -> Option<Duration> {
        let sample = rand::thread_rng().gen_range(0.0..=1.0);
        self.delay_after_with(processed, sample)
    }

    /// Pure form of [`ChapterPacer::delay_after`]; `sample` in [0, 1] picks the
    /// point between `min_pause` and `ceiling`.
    pub fn delay_after_with(&self, processed: u32, sample: f64) -> Option<Duration> {
        if self.every == 0 || processed == 0 || processed % self.every != 0 {
            return None;
        }
        let low = self.min_pause.min(self.ceiling);
        let span = self.ceiling - low;
        Some(low + span.mul_f64(sample.clamp(0.0, 1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(every: u32) -> ChapterPacer {
        ChapterPacer {
            every,
            min_pause: Duration::from_secs(15),
            ceiling: Duration::from_secs(120),
        }
    }

    #[test]
    fn pauses_on_multiples_only() {
        let p = pacer(2);
        let due: Vec<u32> = (1..=5).filter(|n| p.delay_after_with(*n, 0.5).is_some()).collect();
        assert_eq!(due, [2, 4]);
    }

    #[test]
    fn delay_bounded_by_min_and_ceiling() {
        let p = pacer(1);
        assert_eq!(p.delay_after_with(1, 0.0), Some(Duration::from_secs(15)));
        assert_eq!(p.delay_after_with(1, 1.0), Some(Duration::from_secs(120)));
        for n in 1..50 {
            let d = p.delay_after(n).unwrap();
            assert!(d >= p.min_pause && d <= p.ceiling);
        }
    }

    #[test]
    fn min_pause_clamped_to_ceiling() {
        let p = ChapterPacer {
            every: 1,
            min_pause: Duration::from_secs(15),
            ceiling: Duration::from_secs(5),
        };
        assert_eq!(p.delay_after_with(1, 0.7), Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_disables() {
        assert_eq!(pacer(0).delay_after_with(10, 0.5), None);
        assert_eq!(pacer(3).delay_after_with(0, 0.5), None);
    }
}
