use rstest::rstest;

use super::brr::{LPCFilter, LoopEndFlags};
use super::envelope::{EnvelopeState, MAX_LEVEL};
use super::tables::RATE_COUNTER_RESET;
use super::*;
use crate::memory::MEMORY_SIZE;

const DIRECTORY_PAGE: u8 = 0x02;
const SAMPLE_START: u16 = 0x0300;

/// A BRR block with all nibbles set to 1, at range 12 and filter 0.
fn constant_block(flags: u8) -> [u8; 9] {
	[0xC0 | flags, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11]
}

/// DSP with voice 0 set up to play `block` from a directory at page 2, at direct gain and full volume.
fn setup(block: [u8; 9]) -> (Dsp, Memory) {
	let mut memory = Memory::from_image(Box::new([0; MEMORY_SIZE]));
	let directory = u16::from(DIRECTORY_PAGE) << 8;
	memory.write_word(directory, SAMPLE_START);
	memory.write_word(directory + 2, SAMPLE_START);
	for (offset, byte) in block.iter().enumerate() {
		memory.write(SAMPLE_START + offset as u16, *byte);
	}

	let mut dsp = Dsp::new();
	for (address, value) in [
		(0x00, 0x7F), // VOLL
		(0x01, 0x7F), // VOLR
		(0x02, 0x00), // PITCHL
		(0x03, 0x10), // PITCHH
		(0x04, 0x00), // SRCN
		(0x05, 0x00), // ADSR1, gain mode
		(0x07, 0x7F), // GAIN, direct
		(0x0C, 0x7F), // MVOLL
		(0x1C, 0x7F), // MVOLR
		(0x5D, DIRECTORY_PAGE),
	] {
		dsp.registers.write(address, value);
	}
	(dsp, memory)
}

fn ticks(dsp: &mut Dsp, memory: &mut Memory, count: usize) -> [i16; 2] {
	(0 .. count).fold([0; 2], |_, _| dsp.tick(memory, 0))
}

#[rstest]
#[case::range_12(0xC0, 1, 0, 0, 4096)]
#[case::range_0_halves(0x00, 1, 0, 0, 0)]
#[case::negative(0xC0, -8, 0, 0, -32768)]
#[case::invalid_range_negative(0xD0, -1, 0, 0, -4096)]
#[case::invalid_range_positive(0xF0, 7, 0, 0, 0)]
#[case::filter_1(0x04, 0, 1000, 0, 936)]
#[case::filter_2(0x08, 0, 1000, 500, 1436)]
#[case::wraps_when_doubling(0xC4, 7, 32000, 0, -6864)]
fn brr_sample_decoding(
	#[case] header: u8,
	#[case] nibble: i8,
	#[case] old: i16,
	#[case] older: i16,
	#[case] expected: i16,
) {
	assert_eq!(decode_sample(nibble, Header::from(header), old, older), expected);
}

#[test]
fn brr_header() {
	let header = Header::from(0xB7);
	assert_eq!(header.range, 11);
	assert_eq!(header.filter, LPCFilter::One);
	assert_eq!(header.flags, LoopEndFlags::Loop);
	assert!(header.flags.is_end() && header.flags.is_loop());
	assert!(!LoopEndFlags::Ignored.is_end());
}

#[test]
fn nibbles_are_sign_extended() {
	assert_eq!(nibble(0x7F, true), 7);
	assert_eq!(nibble(0x7F, false), -1);
	assert_eq!(nibble(0x80, true), -8);
}

#[test]
fn envelope_attack_and_decay() {
	let mut envelope = Envelope::default();
	// AR = 15 (rate 31), sustain level 7.
	envelope.step(0x8F, 0xE0, 0);
	assert_eq!(envelope.level, 0x400);
	envelope.step(0x8F, 0xE0, 0);
	assert_eq!(envelope.level, MAX_LEVEL);
	assert_eq!(envelope.state, EnvelopeState::Decay);
	envelope.step(0x8F, 0xE0, 0);
	assert_eq!(envelope.state, EnvelopeState::Sustain);
}

#[test]
fn envelope_gain_modes() {
	let mut envelope = Envelope::default();
	envelope.step(0, 0, 0x40);
	assert_eq!(envelope.level, 0x400);
	// Linear increase at rate 31 steps every sample.
	envelope.step(0, 0, 0xDF);
	assert_eq!(envelope.level, 0x420);
	// Bent increase is slower above 0x600.
	envelope.level = 0x600;
	envelope.step(0, 0, 0xFF);
	assert_eq!(envelope.level, 0x608);
	envelope.level = 0x10;
	envelope.step(0, 0, 0x9F);
	assert_eq!(envelope.level, 0);
	envelope.level = 0x100;
	envelope.step(0, 0, 0xBF);
	assert_eq!(envelope.level, 0xFF);
}

#[test]
fn envelope_release() {
	let mut envelope = Envelope { level: 20, ..Envelope::default() };
	envelope.release();
	assert_eq!(envelope.step(0x8F, 0, 0), Step::Continue);
	assert_eq!(envelope.level, 12);
	envelope.step(0x8F, 0, 0);
	assert_eq!(envelope.step(0x8F, 0, 0), Step::Finished);
	assert_eq!(envelope.level, 0);
}

#[test]
fn adsr_to_gain_keeps_level() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x05, 0x8F);
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY));
	assert_eq!(dsp.voice(0).envelope.level, 0x400);
	assert_eq!(dsp.registers.read(0x08), 0x40);

	// Linear increase at rate 31 continues from the attack level.
	dsp.registers.write(0x05, 0x0F);
	dsp.registers.write(0x07, 0xDF);
	dsp.tick(&mut memory, 0);
	assert_eq!(dsp.voice(0).envelope.level, 0x420);
	assert_eq!(dsp.registers.read(0x08), 0x42);
	ticks(&mut dsp, &mut memory, 4);
	assert_eq!(dsp.voice(0).envelope.level, 0x4A0);
	assert_eq!(dsp.registers.read(0x08), 0x4A);
	assert_eq!(dsp.voice(0).envelope.state, EnvelopeState::Attack);
}

#[test]
fn gain_to_adsr_keeps_counter() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x07, 0x40);
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY));
	assert_eq!(dsp.voice(0).envelope.level, 0x400);

	// Linear increase at rate 20 needs 24 samples per step.
	dsp.registers.write(0x07, 0xD4);
	ticks(&mut dsp, &mut memory, 11);
	assert_eq!(dsp.voice(0).envelope.level, 0x400);
	assert_eq!(dsp.voice(0).envelope.counter, RATE_COUNTER_RESET - 11 * 0x500);

	// Attack at rate 21 picks up the partially run counter.
	dsp.registers.write(0x05, 0x8A);
	dsp.tick(&mut memory, 0);
	assert_eq!(dsp.voice(0).envelope.counter, RATE_COUNTER_RESET - 11 * 0x500 - 0x600);
	assert_eq!(dsp.registers.read(0x08), 0x40);
	ticks(&mut dsp, &mut memory, 9);
	assert_eq!(dsp.voice(0).envelope.level, 0x400);
	dsp.tick(&mut memory, 0);
	assert_eq!(dsp.voice(0).envelope.level, 0x420);
	assert_eq!(dsp.registers.read(0x08), 0x42);
	assert_eq!(dsp.voice(0).envelope.counter, RATE_COUNTER_RESET);
}

#[test]
fn key_on_is_delayed() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY) - 1);
	assert!(!dsp.voice(0).is_playing());
	// KON is consumed when it is read.
	assert_eq!(dsp.registers.read(0x4C), 0);

	let sample = dsp.tick(&mut memory, 0);
	assert!(dsp.voice(0).is_playing());
	assert!(sample[0] > 0);
	assert_eq!(sample[0], sample[1]);
	assert_eq!(dsp.registers.read(0x08), 0x7F);
}

#[test]
fn key_on_held_by_key_off() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4C, 0x01);
	dsp.registers.write(0x5C, 0x01);
	ticks(&mut dsp, &mut memory, 20);
	assert!(!dsp.voice(0).is_playing());
	assert_eq!(dsp.registers.read(0x4C), 0x01);
}

#[test]
fn looping_sample_sets_endx() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.voice_end = PerVoiceFlag::all();
	dsp.registers.write(0x4C, 0x01);
	dsp.tick(&mut memory, 0);
	// KON clears ENDX
	assert_eq!(dsp.registers.read(0x7C), 0xFE);
	ticks(&mut dsp, &mut memory, 7 + 12);
	assert_eq!(dsp.registers.read(0x7C) & 1, 0);
	ticks(&mut dsp, &mut memory, 2);
	assert_eq!(dsp.registers.read(0x7C) & 1, 1);
	assert!(dsp.voice(0).is_playing());
	assert_eq!(dsp.voice(0).brr_address(), SAMPLE_START + 2);
}

#[test]
fn sample_end_stops_voice() {
	let (mut dsp, mut memory) = setup(constant_block(0b01));
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY) + 20);
	assert!(!dsp.voice(0).is_playing());
	assert_eq!(dsp.registers.read(0x7C), 0x01);
	assert_eq!(ticks(&mut dsp, &mut memory, 1), [0; 2]);
	assert_eq!(dsp.registers.read(0x08), 0);
}

#[test]
fn key_off_releases() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY));
	dsp.registers.write(0x5C, 0x01);
	dsp.tick(&mut memory, 0);
	assert_eq!(dsp.voice(0).envelope.state, EnvelopeState::Release);
	assert!(dsp.voice(0).is_playing());
	ticks(&mut dsp, &mut memory, 0x7F0 / 8);
	assert!(!dsp.voice(0).is_playing());
}

#[test]
fn mute_and_channel_mask() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4C, 0x01);
	let audible = ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY) + 4);
	assert_ne!(audible, [0; 2]);

	assert_eq!(dsp.tick(&mut memory, 0x01), [0; 2]);
	// Masked voices keep running.
	assert!(dsp.voice(0).is_playing());
	assert_ne!(dsp.registers.read(0x09), 0);
	assert_ne!(dsp.tick(&mut memory, 0xFE), [0; 2]);

	dsp.registers.write(0x6C, 0x40);
	assert_eq!(dsp.tick(&mut memory, 0), [0; 2]);
}

#[test]
fn noise_replaces_sample() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x3D, 0x01);
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY));
	// Noise rate 0 holds the seed, which outputs -32768; at level 0x7F0 that is -32512.
	assert_eq!(dsp.voice(0).output(), -32512);
	assert_eq!(dsp.registers.read(0x09), 0x81);
}

#[test]
fn pitch_modulation_ignored_on_voice_0() {
	let (mut plain, mut plain_memory) = setup(constant_block(0b11));
	let (mut modulated, mut modulated_memory) = setup(constant_block(0b11));
	modulated.registers.write(0x2D, 0x01);
	for dsp in [&mut plain, &mut modulated] {
		dsp.registers.write(0x4C, 0x01);
	}
	for _ in 0 .. 40 {
		assert_eq!(plain.tick(&mut plain_memory, 0), modulated.tick(&mut modulated_memory, 0));
	}
}

/// Voice 0 loops a loud constant sample; voice 1 plays a single block once, from directory entry 1.
fn setup_modulation(pitch_modulation: bool) -> (Dsp, Memory) {
	let (mut dsp, mut memory) = setup([0xC3, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77]);
	let second_sample = SAMPLE_START + 0x20;
	let directory = u16::from(DIRECTORY_PAGE) << 8;
	memory.write_word(directory + 4, second_sample);
	memory.write_word(directory + 6, second_sample);
	for (offset, byte) in constant_block(0b01).iter().enumerate() {
		memory.write(second_sample + offset as u16, *byte);
	}

	for (address, value) in [
		(0x10, 0x7F), // VOLL
		(0x11, 0x7F), // VOLR
		(0x12, 0x00), // PITCHL
		(0x13, 0x10), // PITCHH
		(0x14, 0x01), // SRCN
		(0x15, 0x00), // ADSR1
		(0x17, 0x7F), // GAIN
	] {
		dsp.registers.write(address, value);
	}
	if pitch_modulation {
		dsp.registers.write(0x2D, 0x02);
	}
	dsp.registers.write(0x4C, 0x03);
	(dsp, memory)
}

#[test]
fn pitch_modulation_follows_previous_voice() {
	let (mut plain, mut plain_memory) = setup_modulation(false);
	let (mut modulated, mut modulated_memory) = setup_modulation(true);
	ticks(&mut plain, &mut plain_memory, usize::from(KEY_ON_DELAY) + 4);
	ticks(&mut modulated, &mut modulated_memory, usize::from(KEY_ON_DELAY) + 4);
	assert!(modulated.voice(0).output() > 0);
	assert_eq!(modulated.voice(0).output(), plain.voice(0).output());
	// A positive output raises the pitch, so the block is read faster.
	assert_eq!(plain.voice(1).brr_address(), SAMPLE_START + 0x25);
	assert!(modulated.voice(1).brr_address() > plain.voice(1).brr_address());

	ticks(&mut plain, &mut plain_memory, 6);
	ticks(&mut modulated, &mut modulated_memory, 6);
	assert!(plain.voice(1).is_playing());
	assert_eq!(plain.registers.read(0x7C) & 0x02, 0);
	assert!(!modulated.voice(1).is_playing());
	assert_eq!(modulated.registers.read(0x7C) & 0x02, 0x02);
}

#[test]
fn echo_writes_buffer() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4D, 0x01); // EON
	dsp.registers.write(0x6D, 0x80); // ESA
	dsp.registers.write(0x7D, 0x01); // EDL
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY));
	assert_eq!(dsp.echo().offset(), usize::from(KEY_ON_DELAY) * 4);
	let written = memory.read_word(0x8000 + (u16::from(KEY_ON_DELAY) - 1) * 4);
	assert_ne!(written, 0);
	assert_eq!(written & 1, 0);
	assert_eq!(memory.read_word(0x8000), 0);
}

#[test]
fn echo_write_disable() {
	let (mut dsp, mut memory) = setup(constant_block(0b11));
	dsp.registers.write(0x4D, 0x01);
	dsp.registers.write(0x6D, 0x80);
	dsp.registers.write(0x6C, 0x20);
	dsp.registers.write(0x4C, 0x01);
	ticks(&mut dsp, &mut memory, usize::from(KEY_ON_DELAY) + 10);
	assert_eq!(memory.read_word(0x8000), 0);
	// EDL = 0 keeps a single frame.
	assert_eq!(dsp.echo().offset(), 0);
}

#[test]
fn echo_feedback_through_fir() {
	let mut memory = Memory::from_image(Box::new([0; MEMORY_SIZE]));
	memory.write_word(0x8000, 0x1000);
	memory.write_word(0x8002, 0x1000);
	let mut registers = DspRegisters::default();
	registers.write(0x6D, 0x80);
	registers.write(0x7F, 0x40); // FIR7 applies to the newest sample
	registers.write(0x0D, 0x40); // EFB
	let mut echo = Echo::default();
	let output = echo.process(&registers, &mut memory, [0x100, 0]);
	assert_eq!(output, [0x800, 0x800]);
	assert_eq!(memory.read_word(0x8000), 0x100 + 0x400);
	assert_eq!(memory.read_word(0x8002), 0x400);
}
