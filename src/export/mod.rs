//! Signal export formats.

pub mod vcd;

pub use vcd::VcdChannel;
