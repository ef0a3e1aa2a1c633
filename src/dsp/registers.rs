//! DSP registers.
#![allow(clippy::module_name_repetitions)]

use bitflags::bitflags;

use super::tables::RATE_TABLE;

/// Number of DSP registers visible to the SMP.
pub const REGISTER_COUNT: usize = 128;

/// Address of the ENDX register, which is cleared by any write.
pub const ENDX: u8 = 0x7C;

/// All DSP registers exposed to the SMP.
#[derive(Copy, Clone, Debug, Default)]
pub struct DspRegisters {
	/// x0-x9, per-voice registers `VxVOLL` - `VxOUTX`
	pub(crate) voices:                 [VoiceRegisters; 8],
	/// 0C, MVOLL
	pub(crate) main_volume_left:       u8,
	/// 1C, MVOLR
	pub(crate) main_volume_right:      u8,
	/// 2C, EVOLL
	pub(crate) echo_volume_left:       u8,
	/// 3C, EVOLR
	pub(crate) echo_volume_right:      u8,
	/// 4C, KON
	pub(crate) key_on:                 PerVoiceFlag,
	/// 5C, KOFF
	pub(crate) key_off:                PerVoiceFlag,
	/// 6C, FLG
	pub(crate) flags:                  DspFlags,
	/// 7C, ENDX
	pub(crate) voice_end:              PerVoiceFlag,
	/// 0D, EFB
	pub(crate) echo_feedback_volume:   u8,
	/// 2D, PMON
	pub(crate) pitch_mod_enable:       PerVoiceFlag,
	/// 3D, NON
	pub(crate) noise_enable:           PerVoiceFlag,
	/// 4D, EON
	pub(crate) echo_enable:            PerVoiceFlag,
	/// 5D, DIR
	pub(crate) sample_directory_index: u8,
	/// 6D, ESA
	pub(crate) echo_source:            u8,
	/// 7D, EDL
	pub(crate) echo_delay:             u8,
	/// xF, `FIRx`
	pub(crate) fir_coefficients:       [u8; 8],
	/// xA, unused
	pub(crate) unused_a:               [u8; 8],
	/// xB, unused
	pub(crate) unused_b:               [u8; 8],
	/// 1D, unused
	pub(crate) unused_1d:              u8,
	/// xE, unused
	pub(crate) unused_e:               [u8; 8],
}

impl DspRegisters {
	/// Creates a register file from a bank of registers (e.g. a snapshot), without any write side effects.
	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	pub fn from_bank(bank: &[u8; REGISTER_COUNT]) -> Self {
		let mut registers = Self::default();
		for (address, value) in bank.iter().enumerate() {
			registers.store(address as u8, *value);
		}
		registers
	}

	/// Returns the raw contents of all registers.
	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	pub fn to_bank(&self) -> [u8; REGISTER_COUNT] {
		std::array::from_fn(|address| self.read(address as u8))
	}

	/// Read from a DSP register. The address is mirrored into the 128 existing registers.
	#[must_use]
	pub fn read(&self, address: u8) -> u8 {
		let lower_nibble = address & 0xf;
		let upper_nibble = ((address >> 4) & 0x7) as usize;
		match (upper_nibble, lower_nibble) {
			(_, 0x0 ..= 0x9) => self.voices[upper_nibble].read(lower_nibble),
			(_, 0xA) => self.unused_a[upper_nibble],
			(_, 0xB) => self.unused_b[upper_nibble],
			(_, 0xE) => self.unused_e[upper_nibble],
			(0x1, 0xD) => self.unused_1d,
			(0x0, 0xC) => self.main_volume_left,
			(0x1, 0xC) => self.main_volume_right,
			(0x2, 0xC) => self.echo_volume_left,
			(0x3, 0xC) => self.echo_volume_right,
			(0x4, 0xC) => self.key_on.0,
			(0x5, 0xC) => self.key_off.0,
			(0x6, 0xC) => self.flags.0,
			(0x7, 0xC) => self.voice_end.0,
			(0x0, 0xD) => self.echo_feedback_volume,
			(0x2, 0xD) => self.pitch_mod_enable.0,
			(0x3, 0xD) => self.noise_enable.0,
			(0x4, 0xD) => self.echo_enable.0,
			(0x5, 0xD) => self.sample_directory_index,
			(0x6, 0xD) => self.echo_source,
			(0x7, 0xD) => self.echo_delay,
			(_, 0xF) => self.fir_coefficients[upper_nibble],
			_ => unreachable!(),
		}
	}

	/// Write to a DSP register as the SMP does. Writes above 0x7F are ignored, and any write to ENDX clears it.
	pub fn write(&mut self, address: u8, value: u8) {
		match address {
			0x80 .. => {},
			ENDX => self.voice_end = PerVoiceFlag::empty(),
			_ => self.store(address, value),
		}
	}

	/// Stores a value into a register without side effects.
	fn store(&mut self, address: u8, value: u8) {
		let lower_nibble = address & 0xf;
		let upper_nibble = ((address >> 4) & 0x7) as usize;
		match (upper_nibble, lower_nibble) {
			(_, 0x0 ..= 0x9) => self.voices[upper_nibble].write(lower_nibble, value),
			(_, 0xA) => self.unused_a[upper_nibble] = value,
			(_, 0xB) => self.unused_b[upper_nibble] = value,
			(_, 0xE) => self.unused_e[upper_nibble] = value,
			(0x1, 0xD) => self.unused_1d = value,
			(0x0, 0xC) => self.main_volume_left = value,
			(0x1, 0xC) => self.main_volume_right = value,
			(0x2, 0xC) => self.echo_volume_left = value,
			(0x3, 0xC) => self.echo_volume_right = value,
			(0x4, 0xC) => self.key_on.0 = value,
			(0x5, 0xC) => self.key_off.0 = value,
			(0x6, 0xC) => self.flags.0 = value,
			(0x7, 0xC) => self.voice_end.0 = value,
			(0x0, 0xD) => self.echo_feedback_volume = value,
			(0x2, 0xD) => self.pitch_mod_enable.0 = value,
			(0x3, 0xD) => self.noise_enable.0 = value,
			(0x4, 0xD) => self.echo_enable.0 = value,
			(0x5, 0xD) => self.sample_directory_index = value,
			(0x6, 0xD) => self.echo_source = value,
			(0x7, 0xD) => self.echo_delay = value,
			(_, 0xF) => self.fir_coefficients[upper_nibble] = value,
			_ => unreachable!(),
		}
	}

	/// Returns the actual address of the sample directory.
	#[must_use]
	pub const fn sample_directory(&self) -> u16 {
		self.sample_directory_index as u16 * 0x100
	}

	/// Returns the rate table entry that clocks the noise generator.
	#[must_use]
	pub fn noise_rate(&self) -> i32 {
		RATE_TABLE[(self.flags & DspFlags::NOISE_FREQUENCY).0 as usize]
	}

	/// Returns the length of the echo buffer in bytes.
	#[must_use]
	pub const fn echo_length(&self) -> usize {
		match self.echo_delay & 0xf {
			0 => 4,
			delay => delay as usize * 2048,
		}
	}

	/// Returns the base address of the echo ring buffer in memory.
	#[must_use]
	pub const fn echo_base_address(&self) -> u16 {
		self.echo_source as u16 * 256
	}
}

/// Per-voice registers, x0 - x9
#[derive(Clone, Copy, Debug, Default)]
pub struct VoiceRegisters {
	/// 0, VOLL
	pub(crate) volume_left:    u8,
	/// 1, VOLR
	pub(crate) volume_right:   u8,
	/// 2, PITCHL
	pub(crate) pitch_low:      u8,
	/// 3, PITCHH
	pub(crate) pitch_high:     u8,
	/// 4, SRCN
	pub(crate) sample_number:  u8,
	/// 5, ADSR1 (low)
	pub(crate) adsr_low:       u8,
	/// 6, ADSR2 (high)
	pub(crate) adsr_high:      u8,
	/// 7, GAIN
	pub(crate) gain_settings:  u8,
	/// 8, ENVX
	pub(crate) envelope_value: u8,
	/// 9, OUTX
	pub(crate) output_value:   u8,
}

impl VoiceRegisters {
	#[inline]
	pub(super) fn read(&self, address: u8) -> u8 {
		match address {
			0 => self.volume_left,
			1 => self.volume_right,
			2 => self.pitch_low,
			3 => self.pitch_high,
			4 => self.sample_number,
			5 => self.adsr_low,
			6 => self.adsr_high,
			7 => self.gain_settings,
			8 => self.envelope_value,
			9 => self.output_value,
			_ => unreachable!(),
		}
	}

	#[inline]
	pub(super) fn write(&mut self, address: u8, value: u8) {
		match address {
			0 => self.volume_left = value,
			1 => self.volume_right = value,
			2 => self.pitch_low = value,
			3 => self.pitch_high = value,
			4 => self.sample_number = value,
			5 => self.adsr_low = value,
			6 => self.adsr_high = value,
			7 => self.gain_settings = value,
			8 => self.envelope_value = value,
			9 => self.output_value = value,
			_ => unreachable!(),
		}
	}

	/// The 14-bit pitch value; 0x1000 plays the sample at 32 kHz.
	#[inline]
	#[must_use]
	pub fn pitch(&self) -> i32 {
		i32::from(self.pitch_low) | (i32::from(self.pitch_high & 0x3f) << 8)
	}
}

/// Register with one bit per voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PerVoiceFlag(pub(crate) u8);

impl PerVoiceFlag {
	/// The flag of a single voice.
	#[inline]
	#[must_use]
	pub const fn voice(voice: usize) -> Self {
		Self(1 << voice)
	}
}

/// Global DSP flags in the FLG register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct DspFlags(pub(crate) u8);

bitflags! {
	impl PerVoiceFlag : u8 {
		/// Voice 0
		const ZERO = 1 << 0;
		/// Voice 1
		const ONE = 1 << 1;
		/// Voice 2
		const TWO = 1 << 2;
		/// Voice 3
		const THREE = 1 << 3;
		/// Voice 4
		const FOUR = 1 << 4;
		/// Voice 5
		const FIVE = 1 << 5;
		/// Voice 6
		const SIX = 1 << 6;
		/// Voice 7
		const SEVEN = 1 << 7;
	}

	impl DspFlags : u8 {
		/// Noise frequency
		const NOISE_FREQUENCY = 0x1f;
		/// Disable echo writes
		const ECHO_WRITE_DISABLE = 1 << 5;
		/// Mute analog amplifier
		const AMPLIFIER_MUTE = 1 << 6;
		/// Key-off all voices and set all envelopes to 0
		const SOFT_RESET = 1 << 7;
	}
}
