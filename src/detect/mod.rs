//! Streaming dual-modality pulse detection.
//!
//! Two coupled state machines run in lockstep over the envelope and FM
//! discriminator streams:
//! - [`PulseDetector`]: envelope-driven OOK machine that frames packets,
//!   adapts its detection threshold online and arbitrates AM vs FM per packet.
//! - The embedded FSK tone tracker: runs only inside the first carrier pulse,
//!   where an FSK transmission looks like one long envelope high while the
//!   discriminator toggles.
//!
//! All state lives in the detector context, so packets spanning chunk
//! boundaries are reconstructed seamlessly and independent streams just use
//! independent detectors.

mod detector;
mod fsk;
mod level;

pub use detector::{DetectOutcome, PulseDetector};

/// Minimum run length in samples to accept a pulse or gap; shorter runs are
/// rejected as spurious by both the OOK and FSK machines.
pub const MIN_PULSE_SAMPLES: i32 = 10;
/// Minimum number of FSK entries inside the first carrier pulse required to
/// declare the packet frequency-keyed.
pub const MIN_PULSES: usize = 16;
/// Gap/largest-pulse ratio above which a gap ends the packet.
pub const MAX_GAP_RATIO: i32 = 10;
/// Minimum gap in milliseconds for the ratio rule to end the packet.
pub const MIN_GAP_MS: i32 = 10;
/// Gap in milliseconds that unconditionally ends the packet.
pub const MAX_GAP_MS: i32 = 100;
