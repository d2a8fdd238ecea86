//! Post-hoc pulse packet analysis: width statistics and line-code guessing.
//!
//! Given a completed packet the analyzer histograms pulse, gap and period
//! widths, logs a human-readable report, and heuristically picks the line
//! code from the bin counts. The emitted [`DemodParams`] is the contract
//! consumed by the downstream line-code demodulators; the analyzer itself
//! never decodes bits.

pub mod histogram;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pulse::PulseTrain;
use histogram::Histogram;

/// Relative width tolerance for histogram binning; 20% still discerns the
/// common 1:2:3 pulse-width families.
pub const TOLERANCE: f32 = 0.2;

/// Line codes the analyzer can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCode {
    /// Pulse position modulation with a fixed pulse width.
    OokPpm,
    /// Pulse width modulation (fixed gap, fixed period or multi-packet).
    OokPwm,
    /// Pulse width modulation with a sync/delimiter pulse width.
    OokPwmSync,
    /// Manchester coding; the shortest pulse is the half-bit.
    OokManchester,
    /// Non-return-to-zero pulse code modulation over FSK tones.
    FskPcm,
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineCode::OokPpm => write!(f, "OOK PPM"),
            LineCode::OokPwm => write!(f, "OOK PWM"),
            LineCode::OokPwmSync => write!(f, "OOK PWM with sync"),
            LineCode::OokManchester => write!(f, "OOK Manchester"),
            LineCode::FskPcm => write!(f, "FSK PCM"),
        }
    }
}

/// Demodulation parameters handed to the matching line-code demodulator.
/// Limits are widths in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemodParams {
    pub line_code: LineCode,
    /// Decision boundary between short and long symbols.
    pub short_limit: i32,
    /// Upper bound of the long symbol (unused for Manchester).
    pub long_limit: i32,
    /// Gap width treated as end-of-message.
    pub reset_limit: i32,
    /// Sync/delimiter pulse width; zero when the code has none.
    pub sync_width: i32,
}

/// Outcome of analyzing one packet. Exactly one variant per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A single pulse: frequency keying seen by the envelope, or plain noise.
    SinglePulse,
    /// Constant pulse and gap widths: carrier or preamble, nothing to decode.
    Unmodulated,
    /// A recognized line code, ready for demodulation.
    Decodable(DemodParams),
    /// No known line code matches the width distributions.
    Unknown,
}

/// Analyze a completed packet: log the width report and classify the line
/// code. For OOK line codes the packet's terminal gap is rewritten to
/// `reset_limit + 1` so every downstream demodulator sees a terminated
/// message.
pub fn analyze(train: &mut PulseTrain, sample_rate: u32) -> Classification {
    if train.is_empty() {
        tracing::warn!("empty pulse train, nothing to analyze");
        return Classification::Unknown;
    }
    let n = train.len();

    // Period sequence and total span; the terminal gap is the end-of-packet
    // marker, not part of the transmission.
    let periods: Vec<i32> = train
        .pulses()
        .iter()
        .zip(train.gaps())
        .map(|(p, g)| p + g)
        .collect();
    let total_span: i32 = periods.iter().sum::<i32>() - train.gaps()[n - 1];

    let mut hist_pulses = Histogram::new();
    let mut hist_gaps = Histogram::new();
    let mut hist_periods = Histogram::new();
    hist_pulses.add_samples(train.pulses(), TOLERANCE);
    hist_gaps.add_samples(&train.gaps()[..n - 1], TOLERANCE);
    hist_periods.add_samples(&periods[..n - 1], TOLERANCE);

    hist_pulses.fuse_bins(TOLERANCE);
    hist_gaps.fuse_bins(TOLERANCE);
    hist_periods.fuse_bins(TOLERANCE);

    tracing::info!("Analyzing pulses...");
    tracing::info!(
        "Total count: {:4},  width: {:5}\t\t({:4.1} ms)",
        n,
        total_span,
        1000.0 * total_span as f32 / sample_rate as f32
    );
    tracing::info!("Pulse width distribution:\n{}", hist_pulses.describe(sample_rate));
    tracing::info!("Gap width distribution:\n{}", hist_gaps.describe(sample_rate));
    tracing::info!("Pulse period distribution:\n{}", hist_periods.describe(sample_rate));
    tracing::info!(
        "Level estimates [high, low]: {:6}, {:6}",
        train.ook_high,
        train.ook_low
    );
    tracing::info!(
        "Frequency offsets [F1, F2]:  {:6}, {:6}\t({:+.1} kHz, {:+.1} kHz)",
        train.fsk_f1,
        train.fsk_f2,
        tone_offset_khz(train.fsk_f1, sample_rate),
        tone_offset_khz(train.fsk_f2, sample_rate)
    );

    // Sorted bins are easier to reason about; the synthetic zero pulse an FSK
    // packet may open with is dropped only after binning.
    hist_pulses.sort_by_mean();
    hist_gaps.sort_by_mean();
    if hist_pulses.bins().first().map_or(false, |bin| bin.mean == 0) {
        hist_pulses.remove_bin(0);
    }

    let classification = classify(n, &mut hist_pulses, &hist_gaps, &hist_periods);

    if let Classification::Decodable(params) = &classification {
        tracing::info!(
            "Attempting demodulation... short_limit: {}, long_limit: {}, reset_limit: {}, sync_width: {}",
            params.short_limit,
            params.long_limit,
            params.reset_limit,
            params.sync_width
        );
        if params.line_code != LineCode::FskPcm {
            // Guarantee termination for the OOK demodulators.
            train.set_last_gap(params.reset_limit + 1);
        }
    }

    classification
}

/// Tone frequency offset in kHz: full scale of the discriminator maps to half
/// the sample rate.
fn tone_offset_khz(est: i32, sample_rate: u32) -> f32 {
    est as f32 / i16::MAX as f32 * sample_rate as f32 / 2.0 / 1000.0
}

/// Pick a line code from the width distributions. First matching rule wins.
fn classify(
    num_pulses: usize,
    pulses: &mut Histogram,
    gaps: &Histogram,
    periods: &Histogram,
) -> Classification {
    let p = pulses.len();
    let g = gaps.len();
    let r = periods.len();
    let gb = gaps.bins();

    if num_pulses == 1 {
        tracing::info!("Guessing modulation: Single pulse detected. Probably Frequency Shift Keying or just noise...");
        return Classification::SinglePulse;
    }
    if p == 1 && g == 1 {
        tracing::info!("Guessing modulation: Un-modulated signal. Maybe a preamble...");
        return Classification::Unmodulated;
    }
    if p == 1 && g > 1 {
        tracing::info!("Guessing modulation: Pulse Position Modulation with fixed pulse width");
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokPpm,
            // Boundary between the two lowest gaps; long just above the second.
            short_limit: (gb[0].mean + gb[1].mean) / 2,
            long_limit: gb[1].max + 1,
            reset_limit: gb[g - 1].max + 1,
            sync_width: 0,
        });
    }
    if p == 2 && g == 1 {
        tracing::info!("Guessing modulation: Pulse Width Modulation with fixed gap");
        let long = gb[g - 1].max + 1;
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokPwm,
            short_limit: (pulses.bins()[0].mean + pulses.bins()[1].mean) / 2,
            long_limit: long,
            reset_limit: long,
            sync_width: 0,
        });
    }
    if p == 2 && g == 2 && r == 1 {
        tracing::info!("Guessing modulation: Pulse Width Modulation with fixed period");
        let long = gb[g - 1].max + 1;
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokPwm,
            short_limit: (pulses.bins()[0].mean + pulses.bins()[1].mean) / 2,
            long_limit: long,
            reset_limit: long,
            sync_width: 0,
        });
    }
    if p == 2 && g == 2 && r == 3 {
        tracing::info!("Guessing modulation: Manchester coding");
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokManchester,
            // Shortest pulse is the half-bit period.
            short_limit: pulses.bins()[0].mean.min(pulses.bins()[1].mean),
            long_limit: 0,
            reset_limit: gb[g - 1].max + 1,
            sync_width: 0,
        });
    }
    if p == 2 && g >= 3 {
        tracing::info!("Guessing modulation: Pulse Width Modulation with multiple packets");
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokPwm,
            short_limit: (pulses.bins()[0].mean + pulses.bins()[1].mean) / 2,
            long_limit: gb[1].max + 1,
            reset_limit: gb[g - 1].max + 1,
            sync_width: 0,
        });
    }
    if p >= 3 && g >= 3 && is_nrz_family(pulses, gaps) {
        tracing::info!("Guessing modulation: Pulse Code Modulation (Not Return to Zero)");
        let bit = pulses.bins()[0].mean;
        return Classification::Decodable(DemodParams {
            line_code: LineCode::FskPcm,
            short_limit: bit,
            long_limit: bit,
            // No limit to a run of zeros.
            reset_limit: bit * 1024,
            sync_width: 0,
        });
    }
    if p == 3 {
        tracing::info!("Guessing modulation: Pulse Width Modulation with sync/delimiter");
        // The rarest pulse width is most likely the delimiter.
        pulses.sort_by_count();
        let pb = pulses.bins();
        let (p1, p2) = (pb[1].mean, pb[2].mean);
        return Classification::Decodable(DemodParams {
            line_code: LineCode::OokPwmSync,
            short_limit: p1.min(p2),
            long_limit: p1.max(p2),
            reset_limit: gb[g - 1].max + 1,
            sync_width: pb[0].mean,
        });
    }

    tracing::info!("Guessing modulation: No clue...");
    Classification::Unknown
}

/// Pulses and gaps are near-integer multiples {1,2,3} of the shortest pulse,
/// within an eighth of it.
fn is_nrz_family(pulses: &Histogram, gaps: &Histogram) -> bool {
    let pb = pulses.bins();
    let gb = gaps.bins();
    let unit = pb[0].mean;
    (pb[1].mean - 2 * unit).abs() <= unit / 8
        && (pb[2].mean - 3 * unit).abs() <= unit / 8
        && (gb[0].mean - unit).abs() <= unit / 8
        && (gb[1].mean - 2 * unit).abs() <= unit / 8
        && (gb[2].mean - 3 * unit).abs() <= unit / 8
}
