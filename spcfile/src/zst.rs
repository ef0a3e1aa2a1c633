//! Extraction of the sound subsystem from ZSNES save states.
//!
//! ZSNES dumps its internal structures verbatim, so everything lives at fixed offsets. Only the SPC700 registers,
//! the audio RAM, the DSP registers and the emulator's "voice on" bookkeeping are of interest here.

use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u8};
use nom::{IResult, Parser};

use crate::parser::copy_block;
use crate::{check_layout, CpuRegisters, ParseError, SnapshotFormat, DSP_REGISTER_COUNT, RAM_SIZE};

/// Identification string at the start of every ZSNES save state.
pub const MAGIC: &[u8] = b"ZSNES Save State File";
/// Offset of the audio RAM; the header and main system state come first.
const RAM_OFFSET: usize = 26 + 199_673;
/// Offset of the SPC700 register block, which follows the RAM after some emulator-internal data.
const REGISTERS_OFFSET: usize = RAM_OFFSET + RAM_SIZE + 16;
/// Size of one register slot; ZSNES stores every register as a 32-bit value.
const SLOT: usize = 4;
/// Offset of the per-voice "voice on" bytes, behind the PC, A, X, Y, PSW, PSW2 and SP slots.
const VOICE_ON_OFFSET: usize = REGISTERS_OFFSET + 7 * SLOT + 420;
/// Offset of the DSP register image.
const DSP_OFFSET: usize = VOICE_ON_OFFSET + 8 + 916;
/// ZSNES reserves twice the real DSP register space.
const DSP_BLOCK_LENGTH: usize = 256;
/// Shortest input that contains everything needed to restore the sound subsystem.
pub const MINIMUM_LENGTH: usize = DSP_OFFSET + DSP_BLOCK_LENGTH;

const ZERO_FLAG: u8 = 0x02;
const NEGATIVE_FLAG: u8 = 0x80;

/// Sound subsystem state extracted from a ZSNES save state.
#[derive(Clone, Debug)]
pub struct ZstFile {
	/// CPU registers, with the flags already reconstructed into a normal PSW.
	pub registers:     CpuRegisters,
	/// Audio RAM.
	pub ram:           Box<[u8; RAM_SIZE]>,
	/// DSP registers.
	pub dsp_registers: Box<[u8; DSP_REGISTER_COUNT]>,
	/// Whether ZSNES considered each voice to be playing.
	pub voice_on:      [bool; 8],
}

impl ZstFile {
	/// Bitmask of the voices that were playing, in the layout of the KON register.
	#[must_use]
	pub fn voices_on_mask(&self) -> u8 {
		self.voice_on.iter().enumerate().filter(|(_, on)| **on).fold(0, |mask, (voice, _)| mask | (1 << voice))
	}
}

/// Whether the bytes look like a complete ZSNES save state.
#[must_use]
pub fn is_zst(bytes: &[u8]) -> bool {
	check_layout(bytes, MAGIC, MINIMUM_LENGTH, SnapshotFormat::Zst).is_ok()
}

/// Parse the sound subsystem out of a ZSNES save state.
///
/// # Errors
///
/// If the identification string is missing or the data is too short.
pub fn parse_from_bytes(bytes: &[u8]) -> Result<ZstFile, ParseError> {
	check_layout(bytes, MAGIC, MINIMUM_LENGTH, SnapshotFormat::Zst)?;

	let too_short =
		|_| ParseError::TooShort { format: SnapshotFormat::Zst, actual: bytes.len(), required: MINIMUM_LENGTH };
	let (_, registers) = registers(&bytes[REGISTERS_OFFSET ..]).map_err(too_short)?;

	let mut voice_on = [false; 8];
	for (on, byte) in voice_on.iter_mut().zip(&bytes[VOICE_ON_OFFSET .. VOICE_ON_OFFSET + 8]) {
		*on = *byte != 0;
	}

	Ok(ZstFile {
		registers,
		ram: copy_block(&bytes[RAM_OFFSET .. RAM_OFFSET + RAM_SIZE]),
		dsp_registers: copy_block(&bytes[DSP_OFFSET .. DSP_OFFSET + DSP_REGISTER_COUNT]),
		voice_on,
	})
}

/// Parses the register slots. ZSNES keeps the zero and negative flags outside of PSW, in a separate "PSW2" slot
/// holding the last result; they are folded back in here.
fn registers(input: &[u8]) -> IResult<&[u8], CpuRegisters> {
	let (rest, (pc, a, x, y, psw, psw2, sp)) = (
		(le_u16, take(SLOT - 2)).map(|(pc, _)| pc),
		slot_byte,
		slot_byte,
		slot_byte,
		slot_byte,
		take(SLOT),
		slot_byte,
	)
		.parse(input)?;

	let mut psw = psw;
	if psw2.iter().all(|byte| *byte == 0) {
		psw |= ZERO_FLAG;
	} else {
		psw &= !ZERO_FLAG;
	}
	if psw2[0] & NEGATIVE_FLAG != 0 {
		psw |= NEGATIVE_FLAG;
	} else {
		psw &= !NEGATIVE_FLAG;
	}

	Ok((rest, CpuRegisters { pc, a, x, y, psw, sp }))
}

/// Low byte of a 32-bit register slot.
fn slot_byte(input: &[u8]) -> IResult<&[u8], u8> {
	let (rest, (value, _)) = (le_u8, take(SLOT - 1)).parse(input)?;
	Ok((rest, value))
}
