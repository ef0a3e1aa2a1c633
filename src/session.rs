//! Emulation sessions: one sound subsystem, driven by the host.

use std::sync::Arc;

use log::debug;
use spcfile::{Id666, SnapshotFormat};

use crate::dsp::{Dsp, VOICE_COUNT};
use crate::error::{InvalidArgument, LoadError};
use crate::memory::Memory;
use crate::smp::{Bus, Smp};
use crate::snapshot::{self, LoadOptions, Machine};
use crate::{trace, BYTES_PER_FRAME, CYCLES_PER_SAMPLE};

/// Number of communication ports between the main CPU and the SPC700.
pub const PORT_COUNT: usize = 4;

/// A session that can be handed between threads and shared between binding layers.
pub type SharedSession = Arc<parking_lot::Mutex<Session>>;

/// A complete, independently running SNES sound subsystem.
///
/// Sessions are created empty (a machine fresh out of reset, running the IPL ROM) and are normally filled from a
/// snapshot with [`Session::init`] or [`Session::from_snapshot`]. Audio is produced on demand by [`Session::run`].
#[derive(Clone, Debug)]
pub struct Session {
	memory:       Memory,
	smp:          Smp,
	dsp:          Dsp,
	/// CPU cycles of the last partially executed sample that are still owed.
	mix_left:     u64,
	channel_mask: u8,
	options:      LoadOptions,
	format:       Option<SnapshotFormat>,
	metadata:     Option<Id666>,
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}

impl Session {
	/// Create a session with a machine fresh out of reset.
	#[must_use]
	pub fn new() -> Self {
		let memory = Memory::new();
		let smp = Smp::new(&memory);
		Self {
			memory,
			smp,
			dsp: Dsp::new(),
			mix_left: 0,
			channel_mask: 0,
			options: LoadOptions::default(),
			format: None,
			metadata: None,
		}
	}

	/// Create a session from snapshot data.
	///
	/// # Errors
	/// If the data is not a supported snapshot.
	pub fn from_snapshot(bytes: &[u8], options: LoadOptions) -> Result<Self, LoadError> {
		let mut session = Self { options, ..Self::new() };
		session.init(bytes)?;
		Ok(session)
	}

	/// Replace the machine with the state from a snapshot. On failure the session is left untouched.
	///
	/// # Errors
	/// If the data is not a supported snapshot.
	pub fn init(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
		let snapshot = snapshot::load(bytes, self.options)?;
		let Machine { memory, smp, dsp } = snapshot.machine;
		self.memory = memory;
		self.smp = smp;
		self.dsp = dsp;
		self.mix_left = 0;
		self.channel_mask = 0;
		self.format = Some(snapshot.format);
		self.metadata = snapshot.metadata;
		debug!("session initialized from {} snapshot", snapshot.format);
		Ok(())
	}

	/// Run the machine and collect the audio it produces, as interleaved little-endian 16-bit stereo samples.
	///
	/// At most `max_output_bytes` (rounded down to whole frames) are produced. If `max_cycles` is given and would
	/// be reached before the output is full, emulation stops after that many CPU cycles instead; a sample that is
	/// only partially emulated by then is produced right away and its remaining cycles are run by the next call.
	/// Splitting a run into several calls therefore produces the same audio as a single call.
	pub fn run(&mut self, max_cycles: Option<u64>, max_output_bytes: usize) -> Vec<u8> {
		let frames = max_output_bytes / BYTES_PER_FRAME;
		let buffer_cycles =
			u64::try_from(frames).unwrap_or(u64::MAX).saturating_mul(CYCLES_PER_SAMPLE).saturating_add(self.mix_left);

		let mut output = Vec::with_capacity(frames * BYTES_PER_FRAME);
		match max_cycles {
			Some(cycles) if cycles < buffer_cycles => self.run_cycles(cycles, &mut output),
			_ => {
				let owed = std::mem::take(&mut self.mix_left);
				self.run_cpu(owed);
				for _ in 0 .. frames {
					self.mix(&mut output);
					self.run_cpu(CYCLES_PER_SAMPLE);
				}
			},
		}
		trace!("produced {} bytes, {} cycles owed", output.len(), self.mix_left);
		output
	}

	/// Run exactly `cycles` CPU cycles, producing a sample at the start of every (partial) sample period.
	fn run_cycles(&mut self, mut cycles: u64, output: &mut Vec<u8>) {
		if cycles < self.mix_left {
			self.run_cpu(cycles);
			self.mix_left -= cycles;
			return;
		}
		let owed = std::mem::take(&mut self.mix_left);
		self.run_cpu(owed);
		cycles -= owed;

		while cycles >= CYCLES_PER_SAMPLE {
			self.mix(output);
			self.run_cpu(CYCLES_PER_SAMPLE);
			cycles -= CYCLES_PER_SAMPLE;
		}
		if cycles > 0 {
			self.mix(output);
			self.run_cpu(cycles);
			self.mix_left = CYCLES_PER_SAMPLE - cycles;
		}
	}

	fn run_cpu(&mut self, cycles: u64) {
		if cycles == 0 {
			return;
		}
		let mut bus = Bus { memory: &mut self.memory, dsp: &mut self.dsp.registers };
		self.smp.run(cycles, &mut bus);
	}

	fn mix(&mut self, output: &mut Vec<u8>) {
		let [left, right] = self.dsp.tick(&mut self.memory, self.channel_mask);
		output.extend_from_slice(&left.to_le_bytes());
		output.extend_from_slice(&right.to_le_bytes());
	}

	/// Write a value to a port as the main CPU would; the program sees it when reading `$F4 + port`. Negative
	/// values are stored in two's complement.
	///
	/// # Errors
	/// If the port does not exist or the value does not fit into a byte.
	pub fn write_port(&mut self, port: usize, data: i32) -> Result<(), InvalidArgument> {
		check_port(port)?;
		if !(-128 ..= 255).contains(&data) {
			return Err(InvalidArgument::DataOutOfRange { data });
		}
		self.smp.ports.write_to_smp(port, data.to_le_bytes()[0]);
		Ok(())
	}

	/// Read the value the program last wrote to `$F4 + port`.
	///
	/// # Errors
	/// If the port does not exist.
	pub fn read_port(&self, port: usize) -> Result<u8, InvalidArgument> {
		check_port(port)?;
		Ok(self.smp.ports.read_from_smp(port))
	}

	/// Mute voices in the output mix; bit n mutes voice n. Muted voices keep running.
	pub fn set_channel_mask(&mut self, mask: u8) {
		debug!("channel mask {:0width$b}", mask, width = VOICE_COUNT);
		self.channel_mask = mask;
	}

	/// Currently muted voices.
	#[must_use]
	pub const fn channel_mask(&self) -> u8 {
		self.channel_mask
	}

	/// CPU cycles run since the snapshot was loaded.
	#[must_use]
	pub const fn total_cycles(&self) -> u64 {
		self.smp.total_cycles()
	}

	/// ID666 metadata, if the snapshot was an SPC file with a tag.
	#[must_use]
	pub const fn metadata(&self) -> Option<&Id666> {
		self.metadata.as_ref()
	}

	/// Format of the loaded snapshot; `None` if nothing was loaded yet.
	#[must_use]
	pub const fn format(&self) -> Option<SnapshotFormat> {
		self.format
	}

	/// The CPU, for inspection.
	#[must_use]
	pub const fn smp(&self) -> &Smp {
		&self.smp
	}

	/// The DSP, for inspection.
	#[must_use]
	pub const fn dsp(&self) -> &Dsp {
		&self.dsp
	}

	/// Audio RAM, for inspection.
	#[must_use]
	pub const fn memory(&self) -> &Memory {
		&self.memory
	}

	/// Wrap the session for sharing between threads.
	#[must_use]
	pub fn into_shared(self) -> SharedSession {
		Arc::new(parking_lot::Mutex::new(self))
	}
}

const fn check_port(port: usize) -> Result<(), InvalidArgument> {
	if port < PORT_COUNT { Ok(()) } else { Err(InvalidArgument::PortOutOfRange { port }) }
}
