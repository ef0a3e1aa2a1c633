//! Shared memory (ARAM) of the sound CPU and the DSP.

use crate::trace;

/// Size of ARAM and memory space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Start of the IPL ROM shadow at the top of the address space.
pub const IPL_ROM_START: u16 = 0xFFC0;

/// The 64-byte boot program that receives uploads from the main CPU.
pub const IPL_ROM: [u8; MEMORY_SIZE - IPL_ROM_START as usize] = [
	0xCD, 0xEF, 0xBD, 0xE8, 0x00, 0xC6, 0x1D, 0xD0, 0xFC, 0x8F, 0xAA, 0xF4, 0x8F, 0xBB, 0xF5, 0x78, //
	0xCC, 0xF4, 0xD0, 0xFB, 0x2F, 0x19, 0xEB, 0xF4, 0xD0, 0xFC, 0x7E, 0xF4, 0xD0, 0x0B, 0xE4, 0xF5, //
	0xCB, 0xF4, 0xD7, 0x00, 0xFC, 0xD0, 0xF3, 0xAB, 0x01, 0x10, 0xEF, 0x7E, 0xF4, 0x10, 0xEB, 0xBA, //
	0xF6, 0xDA, 0x00, 0xBA, 0xF4, 0xC4, 0xF4, 0xDD, 0x5D, 0xD0, 0xDB, 0x1F, 0x00, 0x00, 0xC0, 0xFF, //
];

/// Shared SMP-DSP memory.
#[derive(Clone)]
pub struct Memory {
	pub(crate) ram: Box<[u8; MEMORY_SIZE]>,
}

impl Default for Memory {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Memory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Memory").finish_non_exhaustive()
	}
}

impl Memory {
	/// Creates a new memory instance that reflects the hardware reset state.
	#[must_use]
	pub fn new() -> Self {
		let mut ram = Box::new([0; MEMORY_SIZE]);
		ram.chunks_exact_mut(32).enumerate().for_each(|(block, values)| {
			values.fill(if block & 1 == 0 { 0x00 } else { 0xff });
		});
		Self { ram }
	}

	/// Creates memory from a full RAM image.
	#[must_use]
	pub const fn from_image(ram: Box<[u8; MEMORY_SIZE]>) -> Self {
		Self { ram }
	}

	/// Performs a write to memory at the given address. I/O registers are handled by the CPU, not here.
	#[inline]
	pub fn write(&mut self, address: u16, value: u8) {
		trace!("write {0:04x} = {1:02x} ({1})", address, value);
		self.ram[address as usize] = value;
	}

	/// Performs a read from memory at the given address.
	#[inline]
	#[must_use]
	pub fn read(&self, address: u16, enable_boot_rom: bool) -> u8 {
		match address {
			IPL_ROM_START ..= 0xFFFF if enable_boot_rom => IPL_ROM[(address - IPL_ROM_START) as usize],
			_ => self.ram[address as usize],
		}
	}

	/// Performs a 16-bit little endian read from RAM at the given address, wrapping around the end of memory.
	#[inline]
	#[must_use]
	pub fn read_word(&self, address: u16) -> u16 {
		u16::from_le_bytes([self.ram[address as usize], self.ram[address.wrapping_add(1) as usize]])
	}

	/// Performs a 16-bit little endian write, wrapping around the end of memory.
	#[inline]
	pub fn write_word(&mut self, address: u16, value: u16) {
		let [low, high] = value.to_le_bytes();
		self.ram[address as usize] = low;
		self.ram[address.wrapping_add(1) as usize] = high;
	}

	/// Zeroes a region of memory; the region is clipped at the end of the address space.
	pub fn clear(&mut self, start: usize, length: usize) {
		let end = (start + length).min(MEMORY_SIZE);
		if start < end {
			self.ram[start .. end].fill(0);
		}
	}

	/// The complete RAM contents.
	#[must_use]
	pub fn as_slice(&self) -> &[u8; MEMORY_SIZE] {
		&self.ram
	}
}
