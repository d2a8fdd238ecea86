//! pulsekit — pulse extraction for sub-GHz ISM-band sensors.
//!
//! Consumes two time-aligned streams of signed 16-bit samples derived from a
//! quadrature-demodulated radio capture — an AM envelope and an FM
//! discriminator output — and emits discrete pulse packets: ordered
//! (pulse width, gap width) pairs in sample counts, tagged OOK or FSK.
//!
//! The [`detect::PulseDetector`] is the streaming core: a coupled pair of
//! state machines with adaptive threshold estimation, spurious-pulse
//! coalescing and per-packet AM/FM arbitration, maintaining continuity across
//! chunk boundaries. The [`analyzer`] inspects a finished packet, reports its
//! width statistics and picks demodulation parameters for the downstream
//! line-code demodulators. The I/Q front-end producing the two streams and
//! the bit-level demodulators live outside this crate.
//!
//! ```no_run
//! use pulsekit::{analyze, DetectOutcome, PulseDetector, PulseTrain};
//!
//! let mut detector = PulseDetector::new();
//! let mut pulses = PulseTrain::new();
//! let mut fsk_pulses = PulseTrain::new();
//!
//! # let (envelope, fm): (Vec<i16>, Vec<i16>) = (Vec::new(), Vec::new());
//! # let (sample_rate, chunk_offset) = (250_000, 0);
//! loop {
//!     match detector.detect_package(
//!         &envelope, &fm, 0, sample_rate, chunk_offset,
//!         &mut pulses, &mut fsk_pulses,
//!     ) {
//!         DetectOutcome::NeedMoreData => break, // feed the next chunk
//!         DetectOutcome::OokPacket => { analyze(&mut pulses, sample_rate); }
//!         DetectOutcome::FskPacket => { analyze(&mut fsk_pulses, sample_rate); }
//!     }
//! }
//! ```

pub mod analyzer;
pub mod detect;
pub mod export;
pub mod pulse;

pub use analyzer::{analyze, Classification, DemodParams, LineCode};
pub use detect::{DetectOutcome, PulseDetector};
pub use pulse::{PulseKind, PulseRecord, PulseTrain, MAX_PULSES};
