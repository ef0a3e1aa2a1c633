//! SPC700 and S-DSP emulation engine.
//!
//! Restores the SNES sound subsystem from a snapshot (`.spc` file or ZSNES save state) and produces the audio it
//! plays, sample for sample, as 16-bit stereo at 32 kHz.
//!
//! ```no_run
//! # fn main() -> Result<(), spcemu::LoadError> {
//! let data = std::fs::read("song.spc").unwrap_or_default();
//! let mut session = spcemu::Session::from_snapshot(&data, spcemu::LoadOptions::default())?;
//! // One second of audio.
//! let audio = session.run(None, spcemu::SAMPLE_RATE as usize * spcemu::BYTES_PER_FRAME);
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod log;

pub mod dsp;
pub mod error;
pub mod memory;
pub mod session;
pub mod smp;
pub mod snapshot;

#[cfg(test)] mod test;

pub use error::{InvalidArgument, LoadError};
pub use session::{Session, SharedSession};
pub use snapshot::LoadOptions;
pub use spcfile::{Id666, SnapshotFormat};

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 32000;
/// Bytes per stereo output frame: two little-endian 16-bit samples, left first.
pub const BYTES_PER_FRAME: usize = 4;
/// SPC700 cycles per DSP sample.
pub const CYCLES_PER_SAMPLE: u64 = 32;
/// SPC700 clock rate in Hz.
pub const CPU_RATE: u64 = SAMPLE_RATE as u64 * CYCLES_PER_SAMPLE;
