//! Reading of SNES sound subsystem snapshots.
//!
//! Two formats are understood:
//! - `.spc` files, the de-facto standard for SNES music rips, with their optional ID666 metadata tag
//!   ([`parser`]).
//! - ZSNES save states (`.zst`), from which the sound subsystem part can be extracted ([`zst`]).
//!
//! [`detect_format`] inspects a byte buffer and tells which of the two it is, if any.

use std::fmt::Display;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

pub mod parser;
pub mod zst;

/// Size of the SPC700 address space.
pub const RAM_SIZE: usize = 0x10000;
/// Number of DSP registers.
pub const DSP_REGISTER_COUNT: usize = 128;

/// A parsed .spc file.
#[derive(Clone, Debug)]
pub struct SpcFile {
	/// Header data.
	pub header: SpcHeader,
	/// Memory contents.
	pub memory: SpcMemory,
}

/// Initial memory state; the largest chunk of data in a .spc file.
#[derive(Clone, Debug)]
pub struct SpcMemory {
	/// Initial RAM state.
	pub ram:           Box<[u8; RAM_SIZE]>,
	/// Initial DSP register state.
	pub dsp_registers: Box<[u8; DSP_REGISTER_COUNT]>,
	/// Memory used in place of the IPL ROM, if the file contains it.
	pub rom:           Option<Box<[u8; 64]>>,
}

/// CPU register state stored in a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuRegisters {
	/// Initial state of the program counter (PC) register.
	pub pc:  u16,
	/// Initial state of the A register.
	pub a:   u8,
	/// Initial state of the X register.
	pub x:   u8,
	/// Initial state of the Y register.
	pub y:   u8,
	/// Initial state of the flags (PSW) register.
	pub psw: u8,
	/// Initial state of the stack pointer (SP) register.
	pub sp:  u8,
}

/// Header of a .spc file.
#[derive(Clone, Debug)]
pub struct SpcHeader {
	/// Minor version of the SPC file format, usually 30.
	pub version:   u8,
	/// Initial CPU register state.
	pub registers: CpuRegisters,
	/// Metadata tag, if the file declares one and it could be read.
	pub id666:     Option<Id666>,
}

/// ID666 metadata of a .spc file.
#[derive(Clone, Debug, Default)]
pub struct Id666 {
	/// Title of the track.
	pub title:            String,
	/// Name of the game that the track belongs to.
	pub game:             String,
	/// Artist or composer of the track.
	pub artist:           String,
	/// Dumper of this .spc file.
	pub dump_author:      String,
	/// Comments attached by the dumper.
	pub comments:         String,
	/// Date of the dump.
	pub dump_date:        Option<NaiveDate>,
	/// Duration the track should play for (before fadeout).
	pub duration:         Duration,
	/// Duration the track should fade out for (after the end).
	pub fade_duration:    Duration,
	/// From `SNESAmp`'s manual: "Voices checked will automatically be muted at the beginning of the song."
	pub channel_disables: bool,
	/// Emulator used to create the dump.
	pub emulator:         Emulator,
}

/// List of known emulator IDs.
///
/// Table from <https://dgrfactory.jp/spcplay/id666.html>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Emulator {
	/// Unknown emulator (0x00, 0x30)
	#[default]
	Unknown,
	/// 0x31, 0x01
	ZSNES,
	/// 0x32, 0x02
	Snes9x,
	/// 0x33, 0x03
	ZST2SPC,
	/// Other emulator (0x04, 0x34); for some reason this is distinct from Unknown.
	Other,
	/// 0x35, 0x05
	SNEShout,
	/// 0x36, 0x06
	ZSNES_W,
	/// 0x07, 0x37
	Snes9xpp,
	/// 0x38, 0x08
	SNESGT,
}

/// Snapshot formats this crate can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SnapshotFormat {
	/// `.spc` file.
	Spc,
	/// ZSNES save state.
	Zst,
}

impl Display for SnapshotFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Spc => "SPC",
			Self::Zst => "ZSNES save state",
		})
	}
}

/// Errors that can occur while reading a snapshot.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	/// The input does not begin with the identification string of the format.
	#[error("input does not start with the {0} identification string")]
	MissingMagic(SnapshotFormat),
	/// The input has the right identification string but is cut off.
	#[error("{format} input is {actual:#x} bytes long, but at least {required:#x} bytes are needed")]
	TooShort {
		/// Format that was being parsed.
		format:   SnapshotFormat,
		/// Length of the input.
		actual:   usize,
		/// Minimum length of this format.
		required: usize,
	},
}

/// Figures out which snapshot format the given data is in, by looking at the identification string and length.
///
/// Returns [`None`] if the data is neither a (complete) SPC file nor a ZSNES save state.
#[must_use]
pub fn detect_format(bytes: &[u8]) -> Option<SnapshotFormat> {
	if parser::is_spc(bytes) {
		Some(SnapshotFormat::Spc)
	} else if zst::is_zst(bytes) {
		Some(SnapshotFormat::Zst)
	} else {
		None
	}
}

/// Checks the identification string and minimum length shared by both formats.
pub(crate) fn check_layout(
	bytes: &[u8],
	magic: &[u8],
	minimum_length: usize,
	format: SnapshotFormat,
) -> Result<(), ParseError> {
	if !bytes.starts_with(magic) {
		return Err(ParseError::MissingMagic(format));
	}
	if bytes.len() < minimum_length {
		return Err(ParseError::TooShort { format, actual: bytes.len(), required: minimum_length });
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn detects_nothing_in_garbage() {
		assert_eq!(detect_format(b""), None);
		assert_eq!(detect_format(&[0x55; 0x20000]), None);
	}

	#[test]
	fn truncated_spc_is_not_detected() {
		let mut bytes = parser::MAGIC.to_vec();
		bytes.resize(0x1000, 0);
		assert_eq!(detect_format(&bytes), None);
		assert_eq!(
			parser::parse_from_bytes(&bytes).unwrap_err(),
			ParseError::TooShort { format: SnapshotFormat::Spc, actual: 0x1000, required: parser::MINIMUM_LENGTH }
		);
	}
}
