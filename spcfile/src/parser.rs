//! .spc file parsing functionality.
//!
//! See [the parent module](`crate`) for definitions of the Rust structures that represent the SPC file data.
//!
//! Only the identification string and the fixed-offset register, RAM and DSP blocks are required; many rips in
//! the wild have broken or partial ID666 tags, so the tag is read on a best-effort basis and simply left out if it
//! doesn't make sense.

#![allow(clippy::trivially_copy_pass_by_ref)]

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use nom::branch::alt;
use nom::bytes::complete::{tag, take};
use nom::combinator::{map_res, verify};
use nom::error::{make_error, ErrorKind};
use nom::number::complete::{le_u16, le_u24, le_u32, le_u8};
use nom::{Err, IResult, Parser};

use crate::{
	check_layout, CpuRegisters, Emulator, Id666, ParseError, SnapshotFormat, SpcFile, SpcHeader, SpcMemory,
	DSP_REGISTER_COUNT, RAM_SIZE,
};

/// Identification string at the start of every .spc file. The version suffix that usually follows is not checked.
pub const MAGIC: &[u8] = b"SNES-SPC700 Sound File Data";
/// Offset of the CPU registers.
const REGISTERS_OFFSET: usize = 0x25;
/// Offset of the ID666 tag.
const ID666_OFFSET: usize = 0x2E;
/// Offset of the RAM image.
const RAM_OFFSET: usize = 0x100;
/// Offset of the DSP register image.
const DSP_OFFSET: usize = RAM_OFFSET + RAM_SIZE;
/// Offset of the 64 bytes that shadow the IPL ROM region.
const EXTRA_RAM_OFFSET: usize = 0x101C0;
/// Shortest input that contains everything needed to restore the machine.
pub const MINIMUM_LENGTH: usize = DSP_OFFSET + DSP_REGISTER_COUNT;

/// Marker byte declaring that an ID666 tag is present.
const HAS_ID666: u8 = 26;

/// Whether the bytes look like a complete .spc file.
#[must_use]
pub fn is_spc(bytes: &[u8]) -> bool {
	check_layout(bytes, MAGIC, MINIMUM_LENGTH, SnapshotFormat::Spc).is_ok()
}

/// Parse an SPC file from a byte slice.
///
/// # Errors
///
/// If the identification string is missing or the data is too short to contain RAM and DSP registers.
pub fn parse_from_bytes(bytes: &[u8]) -> Result<SpcFile, ParseError> {
	check_layout(bytes, MAGIC, MINIMUM_LENGTH, SnapshotFormat::Spc)?;

	let registers = registers(&bytes[REGISTERS_OFFSET ..])
		.map(|(_, registers)| registers)
		.map_err(|_| ParseError::TooShort {
			format:   SnapshotFormat::Spc,
			actual:   bytes.len(),
			required: MINIMUM_LENGTH,
		})?;
	let id666 = if bytes[0x23] == HAS_ID666 {
		id666(&bytes[ID666_OFFSET .. RAM_OFFSET]).ok().map(|(_, tag)| tag)
	} else {
		None
	};

	let memory = SpcMemory {
		ram:           copy_block(&bytes[RAM_OFFSET .. DSP_OFFSET]),
		dsp_registers: copy_block(&bytes[DSP_OFFSET .. MINIMUM_LENGTH]),
		rom:           bytes.get(EXTRA_RAM_OFFSET .. EXTRA_RAM_OFFSET + 64).map(copy_block),
	};

	Ok(SpcFile { header: SpcHeader { version: bytes[0x24], registers, id666 }, memory })
}

/// Copies a block of exactly `N` bytes into a boxed array.
pub(crate) fn copy_block<const N: usize>(block: &[u8]) -> Box<[u8; N]> {
	let mut result = Box::new([0; N]);
	result.copy_from_slice(block);
	result
}

fn registers(input: &[u8]) -> IResult<&[u8], CpuRegisters> {
	let (rest, (pc, a, x, y, psw, sp)) = (le_u16, le_u8, le_u8, le_u8, le_u8, le_u8).parse(input)?;
	Ok((rest, CpuRegisters { pc, a, x, y, psw, sp }))
}

/// Creates a string from a byte sequence that has any number of null bytes at the end. Assumes UTF-8 and discards
/// invalid characters.
fn null_terminated_string(input: &[u8]) -> String {
	let end = input.iter().position(|byte| *byte == 0).unwrap_or(input.len());
	String::from_utf8_lossy(&input[.. end]).into_owned()
}

/// Rest of the tag that depends on binary vs. text format.
#[derive(Debug)]
struct TagRest {
	pub dump_date:        Option<NaiveDate>,
	pub duration:         Duration,
	pub fade_duration:    Duration,
	pub channel_disables: bool,
	pub emulator:         Emulator,
	pub artist:           String,
}

// Initial date verification functions to quickly failover to the text tag format.
// Complete verification is done by chrono's date constructor.
const fn is_day(day: &u8) -> bool {
	*day >= 1 && *day <= 31
}
const fn is_month(month: &u8) -> bool {
	*month >= 1 && *month <= 12
}
const fn is_year(year: &u16) -> bool {
	*year >= 1 && *year <= 9999
}

fn date_from_parts(input: &[u8], year: u16, month: u8, day: u8) -> Result<Option<NaiveDate>, Err<nom::error::Error<&[u8]>>> {
	if day == 0 && month == 0 && year == 0 {
		Ok(None)
	} else {
		NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
			.map_or_else(|| Err(Err::Error(make_error(input, ErrorKind::Digit))), |date| Ok(Some(date)))
	}
}

fn binary_date(input: &[u8]) -> IResult<&[u8], Option<NaiveDate>> {
	let (rest, (day, month, year)) = alt((
		(verify(le_u8, is_day), verify(le_u8, is_month), verify(le_u16, is_year)),
		tag(&[0u8; 4][..]).map(|_| (0, 0u8, 0u16)),
	))
	.parse(input)?;
	Ok((rest, date_from_parts(input, year, month, day)?))
}

fn text_date(input: &[u8]) -> IResult<&[u8], Option<NaiveDate>> {
	let (rest, (month, day, year)) = alt((
		(
			take(2usize).and_then(parse_number::<u8>),
			tag(&b"/"[..]),
			take(2usize).and_then(parse_number::<u8>),
			tag(&b"/"[..]),
			take(4usize).and_then(parse_number::<u16>),
			take(1usize),
		)
			.map(|(m, _, d, _, y, _)| (m, d, y)),
		// default, if parsing fails
		take(11usize).map(|_| (0, 0, 0)),
	))
	.parse(input)?;
	Ok((rest, date_from_parts(input, year, month, day)?))
}

const fn emulator(input: u8) -> Result<Emulator, ErrorKind> {
	match input {
		0x00 | 0x30 => Ok(Emulator::Unknown),
		0x01 | 0x31 => Ok(Emulator::ZSNES),
		0x02 | 0x32 => Ok(Emulator::Snes9x),
		0x03 | 0x33 => Ok(Emulator::ZST2SPC),
		0x04 | 0x34 => Ok(Emulator::Other),
		0x05 | 0x35 => Ok(Emulator::SNEShout),
		0x06 | 0x36 => Ok(Emulator::ZSNES_W),
		0x07 | 0x37 => Ok(Emulator::Snes9xpp),
		0x08 | 0x38 => Ok(Emulator::SNESGT),
		_ => Err(ErrorKind::IsNot),
	}
}

const fn to_bool(input: u8) -> Result<bool, ErrorKind> {
	match input {
		0 => Ok(false),
		1 => Ok(true),
		_ => Err(ErrorKind::IsNot),
	}
}

/// Parses a decimal text number; an all-null field counts as zero.
fn parse_number<T: FromStr + Default>(input: &[u8]) -> IResult<&[u8], T> {
	let text = null_terminated_string(input);
	let text = text.trim();
	if text.is_empty() {
		return Ok((input, T::default()));
	}
	text.parse().map_or_else(|_| Err(Err::Error(make_error(input, ErrorKind::Digit))), |v| Ok((input, v)))
}

fn rest_of_binary_tag(input: &[u8]) -> IResult<&[u8], TagRest> {
	let (rest, (dump_date, _, duration, fade_duration, artist, channel_disables, emulator)) = (
		binary_date,
		take(7usize),
		// track length
		le_u24.map(|seconds| Duration::from_secs(seconds.into())),
		// fade out length
		le_u32.map(|millis| Duration::from_millis(millis.into())),
		// artist
		take(32usize).map(null_terminated_string),
		// channel disables
		map_res(le_u8, to_bool),
		map_res(le_u8, emulator),
	)
		.parse(input)?;
	Ok((rest, TagRest { dump_date, duration, fade_duration, channel_disables, emulator, artist }))
}

fn rest_of_text_tag(input: &[u8]) -> IResult<&[u8], TagRest> {
	let (rest, (dump_date, duration, fade_duration, artist, channel_disables, emulator)) = (
		text_date,
		// track length
		take(3usize).and_then(parse_number::<u64>).map(Duration::from_secs),
		// fade out length
		take(5usize).and_then(parse_number::<u64>).map(Duration::from_millis),
		// artist
		take(32usize).map(null_terminated_string),
		// channel disables; text tags often store an ASCII digit here
		le_u8.map(|value| value == 1 || value == b'1'),
		le_u8.map(|value| emulator(value).unwrap_or_default()),
	)
		.parse(input)?;
	Ok((rest, TagRest { dump_date, duration, fade_duration, channel_disables, emulator, artist }))
}

fn id666(bytes: &[u8]) -> IResult<&[u8], Id666> {
	let (rest, (title, game, dump_author, comments, tag_rest)) = (
		// Song title
		take(32usize).map(null_terminated_string),
		// Game title
		take(32usize).map(null_terminated_string),
		// Dumper name
		take(16usize).map(null_terminated_string),
		// Comments
		take(32usize).map(null_terminated_string),
		// rest depends on the tag type; the parsers try to verify that what they parsed is not bogus, but it
		// might still fail.
		alt((rest_of_binary_tag, rest_of_text_tag)),
	)
		.parse(bytes)?;
	Ok((rest, Id666 {
		title,
		game,
		artist: tag_rest.artist,
		dump_author,
		comments,
		dump_date: tag_rest.dump_date,
		duration: tag_rest.duration,
		fade_duration: tag_rest.fade_duration,
		channel_disables: tag_rest.channel_disables,
		emulator: tag_rest.emulator,
	}))
}
