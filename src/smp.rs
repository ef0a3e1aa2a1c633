//! S-SMP (SPC700 CPU) emulator.
//!
//! The CPU is emulated at instruction granularity: every instruction executes atomically and then accounts for its
//! documented cycle count. Time is handed to the CPU as a cycle budget; overshoot of the last instruction is carried
//! into the next budget so that long-running emulation does not drift.

use log::{debug, warn};
use spcfile::CpuRegisters;

use crate::dsp::registers::DspRegisters;
use crate::memory::Memory;
use crate::trace;

mod ops;
mod peripherals;

pub use peripherals::{ControlRegister, CpuIOPorts, ProgramStatusWord, RunState, TestRegister, Timers};

/// Vector used by BRK.
pub const BREAK_VECTOR: u16 = 0xFFDE;
/// Reset vector, inside the IPL ROM.
pub const RESET_VECTOR: u16 = 0xFFFE;

/// Memory-mapped I/O registers in page 0.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IoRegister {
	/// `$F0`, TEST
	Test,
	/// `$F1`, CONTROL
	Control,
	/// `$F2`, DSPADDR
	DspAddress,
	/// `$F3`, DSPDATA
	DspData,
	/// `$F4` - `$F7`, CPUIO0-3
	CpuIo(usize),
	/// `$FA` - `$FC`, T0DIV-T2DIV
	TimerDivisor(usize),
	/// `$FD` - `$FF`, T0OUT-T2OUT
	TimerOutput(usize),
}

impl IoRegister {
	/// Decodes an address into the I/O register it selects, if any. `$F8` and `$F9` are plain RAM.
	#[must_use]
	pub const fn from_address(address: u16) -> Option<Self> {
		Some(match address {
			0x00F0 => Self::Test,
			0x00F1 => Self::Control,
			0x00F2 => Self::DspAddress,
			0x00F3 => Self::DspData,
			0x00F4 ..= 0x00F7 => Self::CpuIo((address - 0x00F4) as usize),
			0x00FA ..= 0x00FC => Self::TimerDivisor((address - 0x00FA) as usize),
			0x00FD ..= 0x00FF => Self::TimerOutput((address - 0x00FD) as usize),
			_ => return None,
		})
	}
}

/// Everything the CPU can reach through its address space besides its own registers.
#[derive(Debug)]
pub struct Bus<'a> {
	/// ARAM.
	pub memory: &'a mut Memory,
	/// DSP register file, reached through DSPADDR and DSPDATA.
	pub dsp:    &'a mut DspRegisters,
}

/// State of the microprocessor.
#[derive(Clone, Debug)]
pub struct Smp {
	/// Accumulator.
	pub a:           u8,
	/// X index register.
	pub x:           u8,
	/// Y index register.
	pub y:           u8,
	/// Stack Pointer.
	pub sp:          u8,
	/// Program Counter.
	pub pc:          u16,
	/// Program Status Word (flags register).
	pub psw:         ProgramStatusWord,
	/// TEST register.
	pub test:        TestRegister,
	/// CONTROL register.
	pub control:     ControlRegister,
	/// DSPADDR register.
	pub dsp_address: u8,
	/// Main CPU I/O ports.
	pub ports:       CpuIOPorts,
	/// CPU-internal timers.
	pub timers:      Timers,
	run_state:       RunState,
	/// Cycles that may still be spent; negative if the last instruction overshot.
	budget:          i64,
	/// Total cycles executed or idled.
	cycle_counter:   u64,
}

impl Default for Smp {
	fn default() -> Self {
		Self {
			a:             0,
			x:             0,
			y:             0,
			sp:            0xEF,
			pc:            0,
			psw:           ProgramStatusWord::default(),
			test:          TestRegister::default(),
			control:       ControlRegister::default(),
			dsp_address:   0,
			ports:         CpuIOPorts::default(),
			timers:        Timers::new(),
			run_state:     RunState::Running,
			budget:        0,
			cycle_counter: 0,
		}
	}
}

impl Smp {
	/// Create a new reset CPU, starting at the reset vector of the IPL ROM.
	#[must_use]
	pub fn new(memory: &Memory) -> Self {
		let pc = u16::from_le_bytes([memory.read(RESET_VECTOR, true), memory.read(RESET_VECTOR + 1, true)]);
		Self { pc, ..Self::default() }
	}

	/// Restore a CPU from snapshot registers. The I/O latches are reconstructed from the page 0 mirror in `memory`:
	/// input ports from `$F4-$F7`, timer targets from `$FA-$FC`, timer outputs from `$FD-$FF`, CONTROL from `$F1` and
	/// DSPADDR from `$F2`.
	#[must_use]
	pub fn restore(registers: &CpuRegisters, memory: &Memory) -> Self {
		let ram = memory.as_slice();
		let mut smp = Self {
			a: registers.a,
			x: registers.x,
			y: registers.y,
			sp: registers.sp,
			pc: registers.pc,
			psw: ProgramStatusWord(registers.psw),
			control: ControlRegister(ram[0xF1]),
			dsp_address: ram[0xF2],
			..Self::default()
		};
		for timer in 0 .. 3 {
			smp.timers.timer_divisor[timer] = ram[0xFA + timer];
			smp.timers.timer_out[timer] = ram[0xFD + timer] & 0xf;
		}
		for port in 0 .. 4 {
			smp.ports.write_to_smp(port, ram[0xF4 + port]);
		}
		debug!(
			"restored CPU: PC={:04x} A={:02x} X={:02x} Y={:02x} SP={:02x} PSW={} CONTROL={:08b}",
			smp.pc, smp.a, smp.x, smp.y, smp.sp, smp.psw, smp.control.0
		);
		smp
	}

	/// Total number of cycles the CPU has run (or idled) since it was created.
	#[must_use]
	pub const fn total_cycles(&self) -> u64 {
		self.cycle_counter
	}

	/// Current execution state.
	#[must_use]
	pub const fn run_state(&self) -> RunState {
		self.run_state
	}

	/// Run the CPU for the given number of cycles. Instructions are executed as long as budget remains; the last
	/// instruction may overshoot, which is subtracted from the next run.
	pub fn run(&mut self, cycles: u64, bus: &mut Bus) {
		self.budget = self.budget.saturating_add(i64::try_from(cycles).unwrap_or(i64::MAX));
		while self.budget > 0 {
			if !self.run_state.is_running() {
				#[allow(clippy::cast_sign_loss)]
				let idle = self.budget as u64;
				self.budget = 0;
				self.tick_peripherals(idle);
				break;
			}
			let spent = self.step(bus);
			self.budget -= i64::from(spent);
		}
	}

	/// Execute a single instruction and return the number of cycles it took.
	pub fn step(&mut self, bus: &mut Bus) -> u8 {
		let pc = self.pc;
		let opcode = self.read_next_pc(bus);
		let cycles = ops::execute(self, bus, opcode);
		trace!(
			"{:04x}: {:02x} ({} cycles) A={:02x} X={:02x} Y={:02x} SP={:02x} {}",
			pc,
			opcode,
			cycles,
			self.a,
			self.x,
			self.y,
			self.sp,
			self.psw
		);
		self.tick_peripherals(u64::from(cycles));
		cycles
	}

	fn tick_peripherals(&mut self, cycles: u64) {
		self.cycle_counter += cycles;
		self.timers.advance(cycles, self.control);
	}

	/// Halt the CPU; it only consumes time from now on.
	pub(crate) fn halt(&mut self, state: RunState) {
		warn!("CPU halted ({:?}) at {:04x}", state, self.pc.wrapping_sub(1));
		self.run_state = state;
	}

	/// Read a byte through the CPU's view of the address space, including I/O side effects.
	pub fn read(&mut self, address: u16, bus: &mut Bus) -> u8 {
		match IoRegister::from_address(address) {
			Some(IoRegister::Test | IoRegister::Control | IoRegister::TimerDivisor(_)) => 0,
			Some(IoRegister::DspAddress) => self.dsp_address,
			Some(IoRegister::DspData) => bus.dsp.read(self.dsp_address & 0x7f),
			Some(IoRegister::CpuIo(port)) => self.ports.read(port),
			Some(IoRegister::TimerOutput(timer)) => self.timers.read_output(timer),
			None => bus.memory.read(address, self.control.contains(ControlRegister::BootRomEnable)),
		}
	}

	/// Write a byte through the CPU's view of the address space. The value always lands in RAM as well.
	pub fn write(&mut self, address: u16, value: u8, bus: &mut Bus) {
		match IoRegister::from_address(address) {
			Some(IoRegister::Test) => self.test_write(value),
			Some(IoRegister::Control) => self.control_write(value),
			Some(IoRegister::DspAddress) => self.dsp_address = value,
			Some(IoRegister::DspData) =>
				if self.dsp_address < 0x80 {
					trace!("DSP {:02x} = {:02x}", self.dsp_address, value);
					bus.dsp.write(self.dsp_address, value);
				},
			Some(IoRegister::CpuIo(port)) => self.ports.write(port, value),
			Some(IoRegister::TimerDivisor(timer)) => self.timers.timer_divisor[timer] = value,
			Some(IoRegister::TimerOutput(_)) | None => {},
		}
		bus.memory.write(address, value);
	}

	fn test_write(&mut self, value: u8) {
		warn!("TEST = {:08b}, ignored", value);
		self.test = TestRegister(value);
	}

	fn control_write(&mut self, value: u8) {
		trace!("CONTROL = {:08b}", value);
		let previous = self.control;
		self.control = ControlRegister(value);

		for timer in 0 .. 3 {
			if !previous.timer_enabled(timer) && self.control.timer_enabled(timer) {
				self.timers.restart(timer);
			}
		}

		if self.control.contains(ControlRegister::ResetPorts01) {
			self.ports.reset_port(0);
			self.ports.reset_port(1);
		}

		if self.control.contains(ControlRegister::ResetPorts23) {
			self.ports.reset_port(2);
			self.ports.reset_port(3);
		}
	}

	/// Read the byte at PC and advance PC.
	fn read_next_pc(&mut self, bus: &mut Bus) -> u8 {
		let value = self.read(self.pc, bus);
		self.pc = self.pc.wrapping_add(1);
		value
	}

	/// Read a little endian word at PC and advance PC.
	fn read_next_pc_word(&mut self, bus: &mut Bus) -> u16 {
		let low = self.read_next_pc(bus);
		let high = self.read_next_pc(bus);
		u16::from_le_bytes([low, high])
	}

	/// Direct page base, selected by the P flag.
	fn direct_page(&self) -> u16 {
		if self.psw.contains(ProgramStatusWord::DirectPage) { 0x100 } else { 0 }
	}

	/// Address within the direct page.
	fn direct_address(&self, offset: u8) -> u16 {
		self.direct_page() | u16::from(offset)
	}

	/// Reads a word from the direct page; the high byte wraps within the page.
	fn read_direct_word(&mut self, offset: u8, bus: &mut Bus) -> u16 {
		let low = self.read(self.direct_address(offset), bus);
		let high = self.read(self.direct_address(offset.wrapping_add(1)), bus);
		u16::from_le_bytes([low, high])
	}

	fn write_direct_word(&mut self, offset: u8, value: u16, bus: &mut Bus) {
		let [low, high] = value.to_le_bytes();
		self.write(self.direct_address(offset), low, bus);
		self.write(self.direct_address(offset.wrapping_add(1)), high, bus);
	}

	fn read_word(&mut self, address: u16, bus: &mut Bus) -> u16 {
		let low = self.read(address, bus);
		let high = self.read(address.wrapping_add(1), bus);
		u16::from_le_bytes([low, high])
	}

	fn push(&mut self, value: u8, bus: &mut Bus) {
		self.write(0x100 | u16::from(self.sp), value, bus);
		self.sp = self.sp.wrapping_sub(1);
	}

	fn pop(&mut self, bus: &mut Bus) -> u8 {
		self.sp = self.sp.wrapping_add(1);
		self.read(0x100 | u16::from(self.sp), bus)
	}

	fn push_word(&mut self, value: u16, bus: &mut Bus) {
		let [low, high] = value.to_le_bytes();
		self.push(high, bus);
		self.push(low, bus);
	}

	fn pop_word(&mut self, bus: &mut Bus) -> u16 {
		let low = self.pop(bus);
		let high = self.pop(bus);
		u16::from_le_bytes([low, high])
	}

	fn set_flag(&mut self, flag: ProgramStatusWord, value: bool) {
		self.psw.set(flag, value);
	}

	/// Sets N and Z from an 8-bit result.
	fn set_nz(&mut self, value: u8) {
		self.set_flag(ProgramStatusWord::Sign, value & 0x80 != 0);
		self.set_flag(ProgramStatusWord::Zero, value == 0);
	}

	/// Sets N and Z from a 16-bit result.
	fn set_nz16(&mut self, value: u16) {
		self.set_flag(ProgramStatusWord::Sign, value & 0x8000 != 0);
		self.set_flag(ProgramStatusWord::Zero, value == 0);
	}

	fn carry(&self) -> bool {
		self.psw.contains(ProgramStatusWord::Carry)
	}

	/// Y:A as a 16-bit value.
	const fn ya(&self) -> u16 {
		u16::from_le_bytes([self.a, self.y])
	}

	fn set_ya(&mut self, value: u16) {
		let [a, y] = value.to_le_bytes();
		self.a = a;
		self.y = y;
	}
}
