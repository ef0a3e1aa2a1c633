//! Restoring the sound subsystem from snapshot files.

use log::{debug, info};
use spcfile::{detect_format, parser, zst, CpuRegisters, Id666, SnapshotFormat, DSP_REGISTER_COUNT, RAM_SIZE};

use crate::dsp::Dsp;
use crate::error::LoadError;
use crate::memory::Memory;
use crate::smp::Smp;

/// DSP register that holds the echo buffer start page.
const ESA: usize = 0x6D;
/// DSP register that holds the echo delay.
const EDL: usize = 0x7D;
/// DSP register with the key-on bits.
const KON: usize = 0x4C;

/// Options that influence how a snapshot is restored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoadOptions {
	/// Zero the echo buffer after loading. Many dumping emulators did not emulate echo and left garbage in the echo
	/// region, which would otherwise play back as noise.
	pub clear_echo: bool,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self { clear_echo: true }
	}
}

/// Complete machine state, ready to be run.
#[derive(Clone, Debug)]
pub struct Machine {
	/// Shared memory.
	pub memory: Memory,
	/// The CPU.
	pub smp:    Smp,
	/// The DSP.
	pub dsp:    Dsp,
}

/// A machine restored from a snapshot, together with what was known about the snapshot.
#[derive(Clone, Debug)]
pub struct Snapshot {
	/// Restored machine.
	pub machine:  Machine,
	/// Format the snapshot was in.
	pub format:   SnapshotFormat,
	/// ID666 tag, for SPC files that have one.
	pub metadata: Option<Id666>,
}

/// Restores a machine from snapshot data of any supported format.
///
/// # Errors
/// [`LoadError::UnrecognizedFormat`] if the data is not a complete SPC file or ZSNES save state.
pub fn load(bytes: &[u8], options: LoadOptions) -> Result<Snapshot, LoadError> {
	let format = detect_format(bytes).ok_or(LoadError::UnrecognizedFormat)?;
	debug!("loading {} bytes of {} data", bytes.len(), format);

	let (registers, ram, dsp_registers, metadata) = match format {
		SnapshotFormat::Spc => {
			let file = parser::parse_from_bytes(bytes)?;
			(file.header.registers, file.memory.ram, *file.memory.dsp_registers, file.header.id666)
		},
		SnapshotFormat::Zst => {
			let file = zst::parse_from_bytes(bytes)?;
			let mut dsp_registers = *file.dsp_registers;
			// Voices that were playing are restarted from the beginning of their sample.
			dsp_registers[KON] |= file.voices_on_mask();
			(file.registers, file.ram, dsp_registers, None)
		},
	};

	if let Some(metadata) = &metadata {
		info!("{} - {} ({})", metadata.title, metadata.game, metadata.artist);
	}
	let machine = restore(&registers, ram, &dsp_registers, options);
	Ok(Snapshot { machine, format, metadata })
}

/// Builds a machine from raw snapshot contents.
fn restore(
	registers: &CpuRegisters,
	ram: Box<[u8; RAM_SIZE]>,
	dsp_registers: &[u8; DSP_REGISTER_COUNT],
	options: LoadOptions,
) -> Machine {
	let mut memory = Memory::from_image(ram);
	let smp = Smp::restore(registers, &memory);

	if options.clear_echo {
		let start = usize::from(dsp_registers[ESA]) << 8;
		let length = usize::from(dsp_registers[EDL]) << 11;
		debug!("clearing echo region {:04x} + {:#x}", start, length);
		memory.clear(start, length);
	}
	// The bank is taken verbatim, including ENDX.
	let dsp = Dsp::from_register_bank(dsp_registers);

	Machine { memory, smp, dsp }
}
