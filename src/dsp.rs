//! S-DSP (Synthesizer) emulator.
//!
//! The DSP produces one stereo sample per tick (32 kHz). Within a tick the voices are processed in ascending order,
//! since pitch modulation feeds each voice's output into the next voice's pitch.

use brr::{clamp16, decode_sample, nibble, Header};
use echo::{as_signed, Echo};
use envelope::{Envelope, Step};
use noise::Noise;
use registers::{DspFlags, DspRegisters, PerVoiceFlag, REGISTER_COUNT};
use tables::GAUSS_TABLE;

use crate::memory::Memory;
use crate::trace;

pub mod brr;
pub mod echo;
pub mod envelope;
pub mod noise;
pub mod registers;
pub mod tables;

#[cfg(test)] mod test;

/// Number of voices.
pub const VOICE_COUNT: usize = 8;

/// Ticks between a KON write being seen and the voice starting.
const KEY_ON_DELAY: u8 = 8;

/// Pitch counter units per decoded sample.
const PITCH_UNIT: i32 = 0x1000;

/// State of the S-DSP.
#[derive(Clone, Debug, Default)]
pub struct Dsp {
	/// Public DSP registers.
	pub registers:   DspRegisters,
	/// Internal voice state.
	voices:          [VoiceState; VOICE_COUNT],
	/// Shared noise generator.
	noise:           Noise,
	/// Echo delay line and filter.
	echo:            Echo,
	/// Last stereo sample (left, right) produced by the DSP.
	pub last_sample: [i16; 2],
}

impl Dsp {
	/// Create a new DSP instance.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a DSP whose registers are loaded from a bank of registers (e.g. a memory dump). All voices are silent.
	#[must_use]
	pub fn from_register_bank(register_bank: &[u8; REGISTER_COUNT]) -> Self {
		Self { registers: DspRegisters::from_bank(register_bank), ..Self::default() }
	}

	/// Internal state of a voice.
	#[must_use]
	pub fn voice(&self, voice: usize) -> &VoiceState {
		&self.voices[voice]
	}

	/// Current noise generator state.
	#[must_use]
	pub const fn noise(&self) -> &Noise {
		&self.noise
	}

	/// Current echo unit state.
	#[must_use]
	pub const fn echo(&self) -> &Echo {
		&self.echo
	}

	/// Produce one stereo sample. Voices whose bit is set in `channel_mask` run normally but are left out of the mix.
	#[allow(clippy::cast_possible_truncation)]
	pub fn tick(&mut self, memory: &mut Memory, channel_mask: u8) -> [i16; 2] {
		self.read_key_registers();
		self.noise.tick(self.registers.noise_rate());

		let mut main_sum = [0; 2];
		let mut echo_sum = [0; 2];
		let mut previous_output = 0;
		for voice in 0 .. VOICE_COUNT {
			let output = self.run_voice(voice, memory, previous_output);
			previous_output = output;
			if channel_mask & (1 << voice) != 0 {
				continue;
			}

			let registers = &self.registers.voices[voice];
			let volume = [registers.volume_left, registers.volume_right];
			let echo_enabled = self.registers.echo_enable.contains(PerVoiceFlag::voice(voice));
			for channel in 0 .. 2 {
				let amplified = (output * i32::from(as_signed(volume[channel]))) >> 7;
				main_sum[channel] = clamp16(main_sum[channel] + amplified);
				if echo_enabled {
					echo_sum[channel] = clamp16(echo_sum[channel] + amplified);
				}
			}
		}

		let fir_output = self.echo.process(&self.registers, memory, echo_sum);

		let sample = if self.registers.flags.contains(DspFlags::AMPLIFIER_MUTE) {
			[0; 2]
		} else {
			let main_volume = [self.registers.main_volume_left, self.registers.main_volume_right];
			let echo_volume = [self.registers.echo_volume_left, self.registers.echo_volume_right];
			std::array::from_fn(|channel| {
				clamp16(
					((main_sum[channel] * i32::from(as_signed(main_volume[channel]))) >> 7)
						+ ((fir_output[channel] * i32::from(as_signed(echo_volume[channel]))) >> 7),
				) as i16
			})
		};
		self.last_sample = sample;
		sample
	}

	/// Handles soft reset, KON and ENDX at the start of a tick.
	fn read_key_registers(&mut self) {
		if self.registers.flags.contains(DspFlags::SOFT_RESET) {
			for voice in &mut self.voices {
				voice.envelope.release();
				voice.envelope.level = 0;
			}
		}

		let key_on = self.registers.key_on;
		self.registers.voice_end.remove(key_on);
		let starting = key_on.difference(self.registers.key_off);
		self.registers.key_on.remove(starting);
		for voice in 0 .. VOICE_COUNT {
			if starting.contains(PerVoiceFlag::voice(voice)) {
				trace!("key on voice {}", voice);
				self.voices[voice].key_on_delay = KEY_ON_DELAY;
			}
		}
	}

	/// Runs a voice for one tick and returns its output before volume is applied.
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn run_voice(&mut self, index: usize, memory: &Memory, previous_output: i32) -> i32 {
		let flag = PerVoiceFlag::voice(index);
		let directory_entry = self
			.registers
			.sample_directory()
			.wrapping_add(u16::from(self.registers.voices[index].sample_number) * 4);
		let voice = &mut self.voices[index];
		let registers = &mut self.registers.voices[index];

		if voice.key_on_delay > 0 {
			voice.key_on_delay -= 1;
			if voice.key_on_delay == 0 {
				voice.start(memory.read_word(directory_entry));
			}
		}
		if voice.playing && self.registers.key_off.contains(flag) {
			voice.envelope.release();
			voice.key_on_delay = 0;
		}

		if !voice.playing || voice.envelope.step(registers.adsr_low, registers.adsr_high, registers.gain_settings) ==
			Step::Finished
		{
			voice.stop();
			registers.envelope_value = 0;
			registers.output_value = 0;
			return 0;
		}

		let mut pitch = registers.pitch();
		if index > 0 && self.registers.pitch_mod_enable.contains(flag) {
			pitch = (pitch * (previous_output + 32768)) >> 15;
		}

		if voice.decode(memory, directory_entry) {
			self.registers.voice_end.insert(flag);
		}

		let sample = if self.registers.noise_enable.contains(flag) {
			self.noise.sample()
		} else {
			voice.interpolate()
		};
		voice.pitch_counter += pitch;

		let output = ((i32::from(sample) * voice.envelope.level) >> 11) & !1;
		voice.output = output;
		registers.envelope_value = voice.envelope.envx();
		registers.output_value = (output >> 8) as u8;
		output
	}
}

/// Internal per-voice state that is not visible in registers.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoiceState {
	/// Whether the voice is producing sound.
	playing:            bool,
	/// Remaining ticks until a pending key-on takes effect; 0 if none is pending.
	key_on_delay:       u8,
	/// Current BRR read address.
	brr_address:        u16,
	/// Header of the BRR block currently in processing.
	header:             Header,
	/// Data bytes of the current block that are yet to be decoded; 0 means a header is read next.
	block_bytes_left:   u8,
	/// Whether the high nibble of the current byte was decoded already.
	high_nibble_done:   bool,
	/// Last 4 decoded samples, as a ring buffer.
	samples:            [i16; 4],
	/// Next write position in `samples`, which is also the oldest sample.
	sample_position:    usize,
	/// Fixed-point position between decoded samples. Samples are decoded while this is non-negative, and each
	/// decoded sample subtracts 0x1000; the interpolation fraction is taken from the remaining negative part.
	pitch_counter:      i32,
	/// Envelope generator state.
	pub envelope:       Envelope,
	/// Output of the last tick, before volume.
	output:             i32,
}

impl VoiceState {
	/// Whether the voice is producing sound.
	#[must_use]
	pub const fn is_playing(&self) -> bool {
		self.playing
	}

	/// Current BRR read address.
	#[must_use]
	pub const fn brr_address(&self) -> u16 {
		self.brr_address
	}

	/// Output of the last tick, before volume.
	#[must_use]
	pub const fn output(&self) -> i32 {
		self.output
	}

	/// Starts playback from the given sample address.
	fn start(&mut self, address: u16) {
		trace!("voice start at {:04x}", address);
		self.playing = true;
		self.brr_address = address;
		self.header = Header::default();
		self.block_bytes_left = 0;
		self.high_nibble_done = false;
		self.sample_position = 0;
		self.pitch_counter = 3 * PITCH_UNIT;
		self.envelope.key_on();
	}

	fn stop(&mut self) {
		self.playing = false;
		self.envelope.level = 0;
	}

	fn push_sample(&mut self, sample: i16) {
		self.samples[self.sample_position] = sample;
		self.sample_position = (self.sample_position + 1) % self.samples.len();
	}

	/// Decodes samples until the pitch counter has caught up. Returns whether the end of a block with the end flag
	/// was passed.
	fn decode(&mut self, memory: &Memory, directory_entry: u16) -> bool {
		let mut passed_end = false;
		while self.pitch_counter >= 0 {
			if self.block_bytes_left == 0 {
				if self.header.flags.is_end() {
					passed_end = true;
					if self.header.flags.is_loop() {
						self.brr_address = memory.read_word(directory_entry.wrapping_add(2));
					} else {
						self.stop();
						while self.pitch_counter >= 0 {
							self.push_sample(0);
							self.pitch_counter -= PITCH_UNIT;
						}
						break;
					}
				}
				self.header = Header::from(memory.read(self.brr_address, false));
				self.brr_address = self.brr_address.wrapping_add(1);
				self.block_bytes_left = 8;
			}

			let byte = memory.read(self.brr_address, false);
			let nibble = nibble(byte, !self.high_nibble_done);
			if self.high_nibble_done {
				self.brr_address = self.brr_address.wrapping_add(1);
				self.block_bytes_left -= 1;
			}
			self.high_nibble_done = !self.high_nibble_done;

			let old = self.samples[(self.sample_position + 3) % 4];
			let older = self.samples[(self.sample_position + 2) % 4];
			self.push_sample(decode_sample(nibble, self.header, old, older));
			self.pitch_counter -= PITCH_UNIT;
		}
		passed_end
	}

	/// Four-point Gaussian interpolation over the sample ring at the current fractional position.
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn interpolate(&self) -> i16 {
		let offset = ((self.pitch_counter >> 4) & 0xff) as usize;
		let sample = |age: usize| i32::from(self.samples[(self.sample_position + age) % 4]);

		let mut output = (GAUSS_TABLE[255 - offset] * sample(0)) >> 11;
		output += (GAUSS_TABLE[511 - offset] * sample(1)) >> 11;
		output += (GAUSS_TABLE[256 + offset] * sample(2)) >> 11;
		output = i32::from(output as i16);
		output += (GAUSS_TABLE[offset] * sample(3)) >> 11;
		(clamp16(output) & !1) as i16
	}
}
