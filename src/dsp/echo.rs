//! Echo unit: delay line in ARAM followed by an 8-tap FIR filter with feedback.

use super::brr::clamp16;
use super::registers::{DspFlags, DspRegisters};
use crate::memory::Memory;
use crate::trace;

/// Number of FIR filter taps.
const FIR_TAPS: usize = 8;

/// Echo unit state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Echo {
	/// Byte offset of the current frame within the echo buffer.
	offset:      usize,
	/// Last samples read from the buffer, per channel (left, right).
	fir_history: [[i32; FIR_TAPS]; 2],
	/// Position of the newest sample in the history.
	fir_head:    usize,
}

impl Echo {
	/// Current byte offset into the echo buffer.
	#[must_use]
	pub const fn offset(&self) -> usize {
		self.offset
	}

	/// Processes one stereo frame.
	///
	/// `echo_input` is the sum of all echo-enabled voices. The buffer frame at the current offset is read and
	/// filtered, the input plus feedback is written back (if echo writes are enabled) and the offset advances.
	/// Returns the FIR filter output for both channels.
	pub fn process(&mut self, registers: &DspRegisters, memory: &mut Memory, echo_input: [i32; 2]) -> [i32; 2] {
		#[allow(clippy::cast_possible_truncation)]
		let address = registers.echo_base_address().wrapping_add(self.offset as u16);
		let buffered = [
			echo_value_from_memory(memory.read_word(address)),
			echo_value_from_memory(memory.read_word(address.wrapping_add(2))),
		];

		self.fir_head = (self.fir_head + 1) % FIR_TAPS;
		let mut fir_output = [0; 2];
		for channel in 0 .. 2 {
			self.fir_history[channel][self.fir_head] = buffered[channel];
			// FIR0 applies to the oldest sample
			let sum: i32 = registers
				.fir_coefficients
				.iter()
				.enumerate()
				.map(|(tap, coefficient)| {
					let sample = self.fir_history[channel][(self.fir_head + 1 + tap) % FIR_TAPS];
					(sample * i32::from(as_signed(*coefficient))) >> 6
				})
				.sum();
			fir_output[channel] = clamp16(sum);
		}

		if !registers.flags.contains(DspFlags::ECHO_WRITE_DISABLE) {
			let feedback = i32::from(as_signed(registers.echo_feedback_volume));
			let written: [u16; 2] = std::array::from_fn(|channel| {
				echo_value_to_memory(clamp16(echo_input[channel] + ((fir_output[channel] * feedback) >> 7)) & !1)
			});
			memory.write_word(address, written[0]);
			memory.write_word(address.wrapping_add(2), written[1]);
			trace!("echo write {:04x}: {:?}", address, written);
		}

		self.offset += 4;
		if self.offset >= registers.echo_length() {
			self.offset = 0;
		}
		fir_output
	}
}

/// Reinterprets a volume or coefficient register as signed.
#[inline]
#[allow(clippy::cast_possible_wrap)]
pub const fn as_signed(value: u8) -> i8 {
	value as i8
}

/// Returns an echo sample value from its 16-bit memory representation; the lowest bit is dropped.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn echo_value_from_memory(word: u16) -> i32 {
	(word as i16 as i32) >> 1
}

/// Converts an echo sample to its memory representation.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn echo_value_to_memory(sample: i32) -> u16 {
	sample as i16 as u16
}
