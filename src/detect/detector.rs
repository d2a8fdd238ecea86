//! Top-level OOK packet detector state machine.

use crate::pulse::PulseTrain;

use super::fsk::FskTracker;
use super::level::{OokLevelEstimator, OOK_EST_HIGH_RATIO, OOK_EST_LOW_RATIO};
use super::{MAX_GAP_MS, MAX_GAP_RATIO, MIN_GAP_MS, MIN_PULSES, MIN_PULSE_SAMPLES};

/// Result of feeding one chunk to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOutcome {
    /// Chunk exhausted with no complete packet; feed the next chunk.
    NeedMoreData,
    /// An amplitude-keyed packet completed in the OOK train. Call again with
    /// the same chunk to keep processing its remaining samples.
    OokPacket,
    /// A frequency-keyed packet completed in the FSK train. Call again with
    /// the same chunk to keep processing its remaining samples.
    FskPacket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectState {
    /// Waiting for the envelope to rise; tracking the noise floor.
    Idle,
    /// Inside a pulse; tracking the carrier level.
    Pulse,
    /// Just below threshold; the gap may still turn out spurious.
    GapStart,
    /// Inside a confirmed gap, watching for the next pulse or end-of-packet.
    Gap,
}

/// Streaming pulse detector over time-aligned envelope and FM sample streams.
///
/// One detector per stream; all state is owned here, so demodulating several
/// radios in parallel just means several detectors. The caller feeds chunks of
/// arbitrary length and loops on the same chunk until [`DetectOutcome::NeedMoreData`].
///
/// Level estimates are learned online and persist across packets; everything
/// packet-scoped is reset on each packet start.
#[derive(Debug, Clone)]
pub struct PulseDetector {
    state: DetectState,
    /// Run length of the current pulse or gap in samples.
    pulse_length: i32,
    /// Widest pulse seen in the current packet, for the gap-ratio packet end rule.
    max_pulse: i32,
    /// Position within the current chunk; persists when a packet return leaves
    /// the chunk partially consumed.
    data_counter: usize,
    /// Saturating counter holding off detection until the noise estimate settles.
    lead_in_counter: i32,
    levels: OokLevelEstimator,
    fsk: FskTracker,
}

impl PulseDetector {
    pub fn new() -> Self {
        Self {
            state: DetectState::Idle,
            pulse_length: 0,
            max_pulse: 0,
            data_counter: 0,
            lead_in_counter: 0,
            levels: OokLevelEstimator::new(),
            fsk: FskTracker::default(),
        }
    }

    /// Current noise floor estimate, raw envelope units.
    pub fn low_estimate(&self) -> i32 {
        self.levels.low()
    }

    /// Current carrier level estimate, raw envelope units.
    pub fn high_estimate(&self) -> i32 {
        self.levels.high()
    }

    /// Process one chunk of time-aligned samples.
    ///
    /// `envelope` is the non-negative AM magnitude, `fm` the signed
    /// discriminator output; index `i` of one aligns with index `i` of the
    /// other. `level_limit` of zero selects the adaptive threshold.
    /// `sample_offset` is the absolute index of the chunk's first sample.
    ///
    /// On [`DetectOutcome::OokPacket`] / [`DetectOutcome::FskPacket`] the
    /// corresponding train holds a completed packet and the chunk is only
    /// partially consumed; call again with the same arguments to continue.
    #[allow(clippy::too_many_arguments)]
    pub fn detect_package(
        &mut self,
        envelope: &[i16],
        fm: &[i16],
        level_limit: i16,
        sample_rate: u32,
        sample_offset: u64,
        pulses: &mut PulseTrain,
        fsk_pulses: &mut PulseTrain,
    ) -> DetectOutcome {
        debug_assert_eq!(envelope.len(), fm.len(), "streams must be time-aligned");
        let len = envelope.len().min(fm.len());
        let samples_per_ms = (sample_rate / 1000) as i32;
        self.levels.floor_high();

        while self.data_counter < len {
            let am = envelope[self.data_counter];
            let threshold = self.levels.threshold(level_limit);

            match self.state {
                DetectState::Idle => {
                    // Hold off until the noise estimate has had a lead-in's
                    // worth of samples to settle.
                    if threshold.above_rising(am) && self.lead_in_counter > OOK_EST_LOW_RATIO {
                        pulses.clear();
                        fsk_pulses.clear();
                        pulses.offset = sample_offset + self.data_counter as u64;
                        fsk_pulses.offset = sample_offset + self.data_counter as u64;
                        self.pulse_length = 0;
                        self.max_pulse = 0;
                        self.fsk.reset();
                        self.state = DetectState::Pulse;
                    } else {
                        self.levels.track_noise(am);
                        if self.lead_in_counter <= OOK_EST_LOW_RATIO {
                            self.lead_in_counter += 1;
                        }
                    }
                }

                DetectState::Pulse => {
                    self.pulse_length += 1;
                    if threshold.below_falling(am) {
                        if self.pulse_length < MIN_PULSE_SAMPLES {
                            // Spurious blip, not a pulse.
                            self.state = DetectState::Idle;
                        } else {
                            pulses.stage_pulse(self.pulse_length);
                            self.max_pulse = self.max_pulse.max(self.pulse_length);
                            self.pulse_length = 0;
                            self.state = DetectState::GapStart;
                        }
                    } else {
                        self.levels.track_carrier(am);
                        // Per-packet carrier frequency estimate from the
                        // discriminator, same slowness as the level tracker.
                        pulses.fsk_f1 += i32::from(fm[self.data_counter]) / OOK_EST_HIGH_RATIO
                            - pulses.fsk_f1 / OOK_EST_HIGH_RATIO;
                    }
                    // The FSK tracker runs only inside the first carrier pulse:
                    // an FSK signal is one long envelope high.
                    if pulses.is_empty() {
                        self.fsk.feed(fm[self.data_counter], fsk_pulses);
                    }
                }

                DetectState::GapStart => {
                    self.pulse_length += 1;
                    if threshold.above_rising(am) {
                        // Spurious gap: splice the staged pulse back together.
                        self.pulse_length += pulses.staged_pulse();
                        self.state = DetectState::Pulse;
                    } else if self.pulse_length >= MIN_PULSE_SAMPLES {
                        self.state = DetectState::Gap;
                        // The gap is real; if the first pulse produced enough
                        // FSK entries, this whole packet is frequency-keyed.
                        if fsk_pulses.len() > MIN_PULSES {
                            self.fsk.wrap_up(fsk_pulses);
                            fsk_pulses.fsk_f1 = self.fsk.f1();
                            fsk_pulses.fsk_f2 = self.fsk.f2();
                            fsk_pulses.ook_low = self.levels.low();
                            fsk_pulses.ook_high = self.levels.high();
                            tracing::debug!(
                                num_pulses = fsk_pulses.len(),
                                offset = fsk_pulses.offset,
                                "FSK packet complete"
                            );
                            self.state = DetectState::Idle;
                            return DetectOutcome::FskPacket;
                        }
                    }
                    // Keep feeding the tracker through a possibly-spurious gap.
                    if pulses.is_empty() {
                        self.fsk.feed(fm[self.data_counter], fsk_pulses);
                    }
                }

                DetectState::Gap => {
                    self.pulse_length += 1;
                    if threshold.above_rising(am) {
                        // Next pulse begins: commit the gap.
                        if pulses.commit_gap(self.pulse_length) {
                            // Capacity reached: force end-of-packet.
                            self.state = DetectState::Idle;
                            pulses.ook_low = self.levels.low();
                            pulses.ook_high = self.levels.high();
                            tracing::debug!(
                                num_pulses = pulses.len(),
                                offset = pulses.offset,
                                "OOK packet complete (buffer full)"
                            );
                            return DetectOutcome::OokPacket;
                        }
                        self.pulse_length = 0;
                        self.state = DetectState::Pulse;
                    }

                    // End-of-packet when the gap dwarfs every pulse seen (and
                    // is not trivially short), or exceeds the hard maximum.
                    if (self.pulse_length > MAX_GAP_RATIO * self.max_pulse
                        && self.pulse_length > MIN_GAP_MS * samples_per_ms)
                        || self.pulse_length > MAX_GAP_MS * samples_per_ms
                    {
                        pulses.commit_gap(self.pulse_length);
                        self.state = DetectState::Idle;
                        pulses.ook_low = self.levels.low();
                        pulses.ook_high = self.levels.high();
                        tracing::debug!(
                            num_pulses = pulses.len(),
                            offset = pulses.offset,
                            "OOK packet complete"
                        );
                        return DetectOutcome::OokPacket;
                    }
                }
            }

            self.data_counter += 1;
        }

        self.data_counter = 0;
        DetectOutcome::NeedMoreData
    }
}

impl Default for PulseDetector {
    fn default() -> Self {
        Self::new()
    }
}
