//! FSK tone tracking: splits an FM discriminator stream into F1/F2 runs.
//!
//! An FSK transmission keeps the carrier on, so the envelope sees one long
//! pulse while the discriminator toggles between two tones. The tracker runs
//! only inside that first carrier pulse, building both tone estimates from
//! nothing: it primes on the initial tone, declares a boundary once a sample
//! deviates past half the default tone delta, and from then on flips whenever
//! the current sample sits closer to the other tone's estimate. F1 (high tone)
//! runs are stored as pulses, F2 (low tone) runs as gaps.

use crate::pulse::PulseTrain;

use super::MIN_PULSE_SAMPLES;

/// Default tone separation assumed before both estimates exist.
pub(crate) const FSK_DEFAULT_FM_DELTA: i32 = 6000;
/// Slowness of the tone estimators.
pub(crate) const FSK_EST_RATIO: i32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ToneState {
    /// Building the initial tone estimate; not yet known whether it is F1 or F2.
    #[default]
    Init,
    /// Inside an F1 (high tone) run — a pulse.
    F1,
    /// Inside an F2 (low tone) run — a gap.
    F2,
    /// Buffer overflowed; ignore samples until the next packet resets us.
    Error,
}

/// Per-packet FSK demodulation state. Reset at every packet start.
#[derive(Debug, Clone, Default)]
pub(crate) struct FskTracker {
    state: ToneState,
    run_length: i32,
    f1_est: i32,
    f2_est: i32,
}

impl FskTracker {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// F1 (high tone) estimate, raw discriminator units.
    pub(crate) fn f1(&self) -> i32 {
        self.f1_est
    }

    /// F2 (low tone) estimate, raw discriminator units.
    pub(crate) fn f2(&self) -> i32 {
        self.f2_est
    }

    /// Consume one FM sample, committing completed runs into `train`.
    /// Runs shorter than [`MIN_PULSE_SAMPLES`] are rewound into their
    /// neighbors to suppress spurious toggles.
    pub(crate) fn feed(&mut self, fm: i16, train: &mut PulseTrain) {
        let fm = i32::from(fm);
        let f1_delta = (fm - self.f1_est).abs();
        let f2_delta = (fm - self.f2_est).abs();
        self.run_length += 1;

        match self.state {
            ToneState::Init => {
                if self.run_length < MIN_PULSE_SAMPLES {
                    // Quick initial estimate from the first few samples.
                    self.f1_est = self.f1_est / 2 + fm / 2;
                } else if f1_delta > FSK_DEFAULT_FM_DELTA / 2 {
                    if fm > self.f1_est {
                        // Positive deviation: the initial tone was the low one,
                        // so the run so far is a gap behind a synthetic zero
                        // pulse, and the estimates swap roles.
                        self.state = ToneState::F1;
                        self.f2_est = self.f1_est;
                        self.f1_est = fm;
                        train.stage_pulse(0);
                        train.commit_gap(self.run_length);
                        self.run_length = 0;
                    } else {
                        // Negative deviation: the initial tone was the high one.
                        self.state = ToneState::F2;
                        self.f2_est = fm;
                        train.stage_pulse(self.run_length);
                        self.run_length = 0;
                    }
                } else {
                    self.f1_est += fm / FSK_EST_RATIO - self.f1_est / FSK_EST_RATIO;
                }
            }

            ToneState::F1 => {
                // Closer to F2 than F1: the pulse run ended.
                if f1_delta > f2_delta {
                    self.state = ToneState::F2;
                    if self.run_length >= MIN_PULSE_SAMPLES {
                        train.stage_pulse(self.run_length);
                        self.run_length = 0;
                    } else {
                        // Spurious: merge the short run back into the last gap.
                        self.run_length += train.last_gap();
                        train.pop_last();
                        if train.is_empty() && train.staged_pulse() == 0 {
                            // Back at the initial tone and it was a gap: undo
                            // the estimate swap and start over.
                            self.f1_est = self.f2_est;
                            self.state = ToneState::Init;
                        }
                    }
                } else {
                    self.f1_est += fm / FSK_EST_RATIO - self.f1_est / FSK_EST_RATIO;
                }
            }

            ToneState::F2 => {
                // Closer to F1 than F2: the gap run ended.
                if f2_delta > f1_delta {
                    self.state = ToneState::F1;
                    if self.run_length >= MIN_PULSE_SAMPLES {
                        if train.commit_gap(self.run_length) {
                            tracing::warn!("FSK pulse buffer full, tracker halted until next packet");
                            self.state = ToneState::Error;
                        }
                        self.run_length = 0;
                    } else {
                        // Spurious: merge the short run back into the staged pulse.
                        self.run_length += train.staged_pulse();
                        if train.is_empty() {
                            self.state = ToneState::Init;
                        }
                    }
                } else {
                    self.f2_est += fm / FSK_EST_RATIO - self.f2_est / FSK_EST_RATIO;
                }
            }

            ToneState::Error => {}
        }
    }

    /// Terminal commit at end-of-packet: store the in-flight run, with a zero
    /// gap sentinel when it ends on a pulse.
    pub(crate) fn wrap_up(&mut self, train: &mut PulseTrain) {
        if !train.is_full() {
            self.run_length += 1;
            if self.state == ToneState::F1 {
                train.stage_pulse(self.run_length);
                train.commit_gap(0);
            } else {
                train.commit_gap(self.run_length);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the tracker with alternating tone runs, starting on the high tone.
    fn feed_runs(tracker: &mut FskTracker, train: &mut PulseTrain, runs: &[(i16, usize)]) {
        for &(tone, count) in runs {
            for _ in 0..count {
                tracker.feed(tone, train);
            }
        }
    }

    #[test]
    fn splits_square_wave_into_pulses_and_gaps() {
        let mut tracker = FskTracker::default();
        let mut train = PulseTrain::new();

        feed_runs(
            &mut tracker,
            &mut train,
            &[(6000, 20), (-6000, 20), (6000, 20), (-6000, 20), (6000, 20)],
        );
        tracker.wrap_up(&mut train);

        // Boundary samples land on the following run, so the first pulse runs
        // one long and interior runs stay at the nominal width.
        assert_eq!(train.pulses(), &[21, 20, 20]);
        assert_eq!(train.gaps(), &[20, 20, 0]);
    }

    #[test]
    fn initial_low_tone_yields_synthetic_zero_pulse() {
        let mut tracker = FskTracker::default();
        let mut train = PulseTrain::new();

        // Start on the low tone: the tracker primes on it, then sees the high
        // tone and realizes the opening run was a gap.
        feed_runs(
            &mut tracker,
            &mut train,
            &[(-6000, 20), (6000, 20), (-6000, 20)],
        );
        tracker.wrap_up(&mut train);

        assert_eq!(train.pulses()[0], 0);
        assert!(train.gaps()[0] >= 20);
        assert_eq!(train.len(), 2);
    }

    #[test]
    fn short_toggle_is_rewound() {
        let mut tracker = FskTracker::default();
        let mut train = PulseTrain::new();

        // A 3-sample high-tone blip inside a low-tone run must not survive as
        // its own pulse.
        feed_runs(
            &mut tracker,
            &mut train,
            &[(6000, 20), (-6000, 20), (6000, 3), (-6000, 20), (6000, 20)],
        );
        tracker.wrap_up(&mut train);

        // The blip and its surrounding gap merge: one pulse, one long gap, one pulse.
        assert_eq!(train.len(), 2);
        assert_eq!(train.pulses().len(), 2);
        assert!(train.gaps()[0] > 40, "gap {} should absorb the blip", train.gaps()[0]);
    }

    #[test]
    fn wrap_up_on_gap_stores_final_gap() {
        let mut tracker = FskTracker::default();
        let mut train = PulseTrain::new();

        feed_runs(&mut tracker, &mut train, &[(6000, 20), (-6000, 15)]);
        tracker.wrap_up(&mut train);

        // The boundary sample counts into the pulse run; the remaining 14 gap
        // samples plus the wrap-up increment make the final gap.
        assert_eq!(train.len(), 1);
        assert_eq!(train.pulses(), &[21]);
        assert_eq!(train.gaps(), &[15]);
    }

    #[test]
    fn overflow_halts_tracker() {
        let mut tracker = FskTracker::default();
        let mut train = PulseTrain::new();

        // Fill the train to capacity through the tracker. Each gap commits at
        // the start of the following pulse run, so one extra period is needed.
        for _ in 0..crate::pulse::MAX_PULSES + 1 {
            feed_runs(&mut tracker, &mut train, &[(6000, 20), (-6000, 20)]);
        }
        assert!(train.is_full());

        // Further toggles are ignored.
        let len = train.len();
        feed_runs(&mut tracker, &mut train, &[(6000, 20), (-6000, 20)]);
        assert_eq!(train.len(), len);
    }
}
