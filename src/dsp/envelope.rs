//! Envelope generator: ADSR and GAIN modes sharing one rate counter per voice.

use super::tables::{RATE_COUNTER_RESET, RATE_TABLE};

/// Highest envelope level.
pub const MAX_LEVEL: i32 = 0x7ff;

/// Internal envelope state. This is also tracked during gain mode, although there it only matters for Release.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvelopeState {
	/// Rising to full level.
	#[default]
	Attack,
	/// Falling exponentially to the sustain level.
	Decay,
	/// Falling exponentially forever.
	Sustain,
	/// Key-off fade; ends the note.
	Release,
}

/// Envelope mode as selected by the ADSR1 and GAIN registers. It is re-read every sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EnvelopeMode {
	Adsr { attack_rate: u8, decay_rate: u8, sustain_rate: u8, sustain_level: u8 },
	DirectGain { level: i32 },
	CustomGain { rate: u8, mode: GainMode },
}

/// Custom gain modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GainMode {
	LinearDecrease,
	ExponentialDecrease,
	LinearIncrease,
	BentIncrease,
}

impl EnvelopeMode {
	fn from_registers(adsr1: u8, adsr2: u8, gain: u8) -> Self {
		if adsr1 & 0x80 != 0 {
			Self::Adsr {
				attack_rate:   ((adsr1 & 0xf) << 1) + 1,
				decay_rate:    ((adsr1 >> 3) & 0x0e) + 0x10,
				sustain_rate:  adsr2 & 0x1f,
				sustain_level: adsr2 >> 5,
			}
		} else if gain & 0x80 == 0 {
			Self::DirectGain { level: i32::from(gain & 0x7f) << 4 }
		} else {
			Self::CustomGain {
				rate: gain & 0x1f,
				mode: match (gain >> 5) & 0b11 {
					0 => GainMode::LinearDecrease,
					1 => GainMode::ExponentialDecrease,
					2 => GainMode::LinearIncrease,
					_ => GainMode::BentIncrease,
				},
			}
		}
	}
}

/// Outcome of an envelope step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
	/// The voice keeps sounding.
	Continue,
	/// The release has reached zero and the voice must stop.
	Finished,
}

/// Per-voice envelope state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Envelope {
	/// Current level, 0 to 0x7FF.
	pub level:   i32,
	/// Current ADSR state.
	pub state:   EnvelopeState,
	/// Rate counter; a step is taken when it runs out.
	pub counter: i32,
}

impl Default for Envelope {
	fn default() -> Self {
		Self { level: 0, state: EnvelopeState::Attack, counter: RATE_COUNTER_RESET }
	}
}

impl Envelope {
	/// Restarts the envelope for a new note.
	pub fn key_on(&mut self) {
		*self = Self::default();
	}

	/// Enters the release phase.
	pub fn release(&mut self) {
		self.state = EnvelopeState::Release;
	}

	/// The ENVX register value; the upper 7 bits of the level.
	#[must_use]
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub const fn envx(&self) -> u8 {
		(self.level >> 4) as u8
	}

	/// Runs the rate counter for one sample and returns whether a step is due.
	fn tick_counter(&mut self, rate: u8) -> bool {
		self.counter -= RATE_TABLE[rate as usize];
		if self.counter <= 0 {
			self.counter = RATE_COUNTER_RESET;
			true
		} else {
			false
		}
	}

	fn exponential_decrease(&mut self) {
		self.level -= ((self.level - 1) >> 8) + 1;
	}

	/// Advances the envelope by one sample, given the voice's current ADSR1, ADSR2 and GAIN register values.
	pub fn step(&mut self, adsr1: u8, adsr2: u8, gain: u8) -> Step {
		if self.state == EnvelopeState::Release {
			self.level -= 8;
			if self.level <= 0 {
				self.level = 0;
				return Step::Finished;
			}
			return Step::Continue;
		}

		match EnvelopeMode::from_registers(adsr1, adsr2, gain) {
			EnvelopeMode::Adsr { attack_rate, decay_rate, sustain_rate, sustain_level } => match self.state {
				EnvelopeState::Attack =>
					if attack_rate == 31 {
						self.level += 0x400;
						self.finish_attack();
					} else if self.tick_counter(attack_rate) {
						self.level += 0x20;
						self.finish_attack();
					},
				EnvelopeState::Decay => {
					if self.tick_counter(decay_rate) {
						self.exponential_decrease();
					}
					if self.level <= 0x100 * (i32::from(sustain_level) + 1) {
						self.state = EnvelopeState::Sustain;
					}
				},
				EnvelopeState::Sustain =>
					if self.tick_counter(sustain_rate) {
						self.exponential_decrease();
					},
				EnvelopeState::Release => {},
			},
			EnvelopeMode::DirectGain { level } => self.level = level,
			EnvelopeMode::CustomGain { rate, mode } =>
				if self.tick_counter(rate) {
					match mode {
						GainMode::LinearDecrease => self.level = (self.level - 0x20).max(0),
						GainMode::ExponentialDecrease => self.exponential_decrease(),
						GainMode::LinearIncrease => self.level = (self.level + 0x20).min(MAX_LEVEL),
						GainMode::BentIncrease =>
							self.level = (self.level + if self.level < 0x600 { 0x20 } else { 0x08 }).min(MAX_LEVEL),
					}
				},
		}
		Step::Continue
	}

	fn finish_attack(&mut self) {
		if self.level > MAX_LEVEL {
			self.level = MAX_LEVEL;
			self.state = EnvelopeState::Decay;
		}
	}
}
