//! BRR (Bit Rate Reduction) sample decoding as the DSP performs it.
//!
//! A BRR block is 9 bytes: a header followed by 16 4-bit samples, high nibble first. The header has the format
//! `ssssffle`:
//! * `ssss` is the shift (range) applied to every nibble of the block.
//! * `ff` selects one of four linear predictive filters.
//! * `l` is the loop bit and `e` is the end bit.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Number of bytes in a BRR block.
pub const BLOCK_SIZE: u16 = 9;

/// Header of a BRR block.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
	/// Shift amount applied to the nibbles; values above 12 are invalid on hardware and behave specially.
	pub range:  u8,
	/// Prediction filter.
	pub filter: LPCFilter,
	/// Loop and end flags.
	pub flags:  LoopEndFlags,
}

impl From<u8> for Header {
	fn from(data: u8) -> Self {
		Self {
			range:  data >> 4,
			filter: LPCFilter::from_u8((data >> 2) & 0b11).unwrap_or_default(),
			flags:  LoopEndFlags::from_u8(data & 0b11).unwrap_or_default(),
		}
	}
}

/// Linear predictive coding (LPC) filters used by the BRR format. Filters are specified per BRR block.
///
/// | `ff` | "t-1" factor | "t-2" factor |
/// |------|--------------|--------------|
/// | 0    | 0            | 0            |
/// | 1    | 15/16        | 0            |
/// | 2    | 61/32        | -15/16       |
/// | 3    | 115/64       | -13/16       |
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum LPCFilter {
	/// Filter 0, verbatim samples.
	#[default]
	Zero = 0,
	/// Filter 1, differential coding.
	One = 1,
	/// Filter 2, close to second order polynomial prediction.
	Two = 2,
	/// Filter 3.
	Three = 3,
}

/// Loop and end flags used in the BRR block header to determine sample end and looping.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum LoopEndFlags {
	/// Nothing special happens, this is a normal sample.
	#[default]
	Nothing = 0,
	/// End the sample playback without looping.
	EndWithoutLooping = 1,
	/// The loop flag is set, but it has no effect without the end flag being set.
	Ignored = 2,
	/// Loop back to the sample specified in the sample table.
	Loop = 3,
}

impl LoopEndFlags {
	/// Whether the block is the last one of the sample.
	#[must_use]
	pub const fn is_end(self) -> bool {
		self as u8 & 0b01 > 0
	}

	/// Whether the sample continues at its loop point after this block.
	#[must_use]
	pub const fn is_loop(self) -> bool {
		self as u8 & 0b10 > 0
	}
}

/// Decodes one sample.
///
/// `nibble` is the sign-extended 4-bit sample. `older` and `old` are the two previously decoded samples (in the
/// doubled 16-bit form this function returns). The result is clamped to 15 bits, then doubled with 16-bit
/// wraparound; badly conditioned filters rely on that wraparound to produce their characteristic noise.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode_sample(nibble: i8, header: Header, old: i16, older: i16) -> i16 {
	let nibble = i32::from(nibble);
	let mut sample = if header.range <= 12 { (nibble << header.range) >> 1 } else { nibble & !0x7ff };

	let p1 = i32::from(old);
	let p2 = i32::from(older) >> 1;
	match header.filter {
		LPCFilter::Zero => {},
		LPCFilter::One => {
			sample += p1 >> 1;
			sample += (-p1) >> 5;
		},
		LPCFilter::Two => {
			sample += p1;
			sample -= p2;
			sample += p2 >> 4;
			sample += (p1 * -3) >> 6;
		},
		LPCFilter::Three => {
			sample += p1;
			sample -= p2;
			sample += (p1 * -13) >> 7;
			sample += (p2 * 3) >> 4;
		},
	}

	(clamp16(sample) * 2) as i16
}

/// Saturates a value to the 16-bit signed range.
#[inline]
#[must_use]
pub fn clamp16(value: i32) -> i32 {
	value.clamp(i32::from(i16::MIN), i32::from(i16::MAX))
}

/// Extracts a sample nibble from a data byte, sign-extended.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn nibble(byte: u8, high: bool) -> i8 {
	if high { (byte as i8) >> 4 } else { ((byte << 4) as i8) >> 4 }
}
