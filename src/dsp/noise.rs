//! Noise generator shared by all voices.

use super::tables::RATE_COUNTER_RESET;

/// 15-bit linear feedback shift register clocked at the rate selected in FLG.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Noise {
	lfsr:    u16,
	counter: i32,
}

impl Default for Noise {
	fn default() -> Self {
		Self { lfsr: Self::SEED, counter: RATE_COUNTER_RESET }
	}
}

impl Noise {
	/// Initial register value.
	pub const SEED: u16 = 0x4000;

	/// Clocks the generator for one sample, given the rate table entry selected by FLG.
	pub fn tick(&mut self, rate: i32) {
		self.counter -= rate;
		if self.counter <= 0 {
			self.counter = RATE_COUNTER_RESET;
			self.lfsr = (((self.lfsr << 13) ^ (self.lfsr << 14)) & 0x4000) | (self.lfsr >> 1);
		}
	}

	/// Current register value.
	#[must_use]
	pub const fn lfsr(&self) -> u16 {
		self.lfsr
	}

	/// The noise sample that replaces a voice's BRR output.
	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	pub const fn sample(&self) -> i16 {
		(self.lfsr << 1) as i16
	}
}
