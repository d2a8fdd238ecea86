//! Value-change-dump export of pulse packets.
//!
//! Writes packets as VCD waveforms for inspection in a logic-analyzer viewer.
//! Three one-bit wires: FRAME brackets each packet, AM and FM carry the
//! respective demodulation paths so dual-modality captures line up on a
//! shared timebase. Events are scaled from sample counts to the file
//! timescale (1 µs up to 500 kHz sampling, 100 ns above).

use anyhow::{Context, Result};
use chrono::Local;
use std::io::Write;

use crate::pulse::PulseTrain;

/// Which wire a pulse train is rendered onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcdChannel {
    Am,
    Fm,
}

impl VcdChannel {
    /// Single-character VCD identifier of the wire.
    fn wire(self) -> char {
        match self {
            VcdChannel::Am => '\'',
            VcdChannel::Fm => '"',
        }
    }
}

/// Samples-to-timescale factor for the given sample rate.
fn time_scale(sample_rate: u32) -> f64 {
    if sample_rate <= 500_000 {
        1e6 / sample_rate as f64 // unit: 1 us
    } else {
        1e7 / sample_rate as f64 // unit: 100 ns
    }
}

/// Write the VCD header: date, timescale and the three wire definitions.
/// The scope module name is a fixed token existing waveform tooling matches on.
pub fn write_header<W: Write>(out: &mut W, sample_rate: u32) -> Result<()> {
    let timescale = if sample_rate <= 500_000 { "1 us" } else { "100 ns" };
    writeln!(out, "$date {} $end", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(
        out,
        "$version {} {} $end",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "$comment Acquisition at {} Hz $end", sample_rate)?;
    writeln!(out, "$timescale {} $end", timescale)?;
    writeln!(out, "$scope module rtl_433 $end")?;
    writeln!(out, "$var wire 1 / FRAME $end")?;
    writeln!(out, "$var wire 1 ' AM $end")?;
    writeln!(out, "$var wire 1 \" FM $end")?;
    writeln!(out, "$upscope $end")?;
    writeln!(out, "$enddefinitions $end")?;
    writeln!(out, "#0 0/ 0' 0\"").context("write VCD header")?;
    Ok(())
}

/// Write one packet's edges onto its channel wire, bracketed by FRAME.
pub fn write_train<W: Write>(
    out: &mut W,
    train: &PulseTrain,
    channel: VcdChannel,
    sample_rate: u32,
) -> Result<()> {
    let scale = time_scale(sample_rate);
    let ch = channel.wire();
    let mut pos = train.offset;
    for n in 0..train.len() {
        if n == 0 {
            writeln!(out, "#{:.0} 1/ 1{}", pos as f64 * scale, ch)?;
        } else {
            writeln!(out, "#{:.0} 1{}", pos as f64 * scale, ch)?;
        }
        pos += train.pulses()[n] as u64;
        writeln!(out, "#{:.0} 0{}", pos as f64 * scale, ch)?;
        pos += train.gaps()[n] as u64;
    }
    if !train.is_empty() {
        writeln!(out, "#{:.0} 0/", pos as f64 * scale).context("write VCD events")?;
    }
    Ok(())
}
