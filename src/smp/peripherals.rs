//! In-CPU peripherals: I/O ports, timers, CONTROL and TEST registers.

use bitflags::bitflags;

use crate::trace;

/// CPU execution state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RunState {
	/// Executing instructions.
	#[default]
	Running,
	/// Stopped by `SLEEP`; only a reset would continue execution.
	Sleeping,
	/// Stopped by `STOP`.
	Stopped,
}

impl RunState {
	/// Whether this is a running state (where the CPU executes instructions).
	#[inline]
	#[must_use]
	pub const fn is_running(self) -> bool {
		matches!(self, Self::Running)
	}
}

/// Main CPU I/O ports.
#[derive(Clone, Default, Debug)]
pub struct CpuIOPorts {
	/// S-SMP write ports (to main CPU)
	pub write_ports: [u8; 4],
	/// S-SMP read ports (from main CPU)
	pub read_ports:  [u8; 4],
}

impl CpuIOPorts {
	#[inline]
	#[track_caller]
	fn check_port_number(port_number: usize) {
		assert!(port_number <= 3, "Illegal port number {port_number}");
	}

	/// Perform a write to the main CPU.
	#[inline]
	#[track_caller]
	pub fn write(&mut self, port_number: usize, value: u8) {
		Self::check_port_number(port_number);

		trace!("Write CPUIO {0} = {1:02x} ({1})", port_number, value);
		self.write_ports[port_number] = value;
	}

	/// Perform a read from the main CPU.
	#[inline]
	#[track_caller]
	#[must_use]
	pub fn read(&self, port_number: usize) -> u8 {
		Self::check_port_number(port_number);

		trace!("Read CPUIO {0} = {1:02x} ({1})", port_number, self.read_ports[port_number]);
		self.read_ports[port_number]
	}

	/// Reset the main CPU input port to 0.
	#[inline]
	#[track_caller]
	pub fn reset_port(&mut self, port_number: usize) {
		Self::check_port_number(port_number);

		trace!("Reset CPUIO {0}", port_number);
		self.read_ports[port_number] = 0;
	}

	/// Perform a read from the SMP, as the main CPU would.
	#[inline]
	#[track_caller]
	#[must_use]
	pub fn read_from_smp(&self, port_number: usize) -> u8 {
		Self::check_port_number(port_number);

		trace!("[SNES-CPU] read CPUIO {port_number} = {0:02x} ({0})", self.write_ports[port_number]);
		self.write_ports[port_number]
	}

	/// Perform a write to the SMP, as the main CPU would.
	#[inline]
	#[track_caller]
	pub fn write_to_smp(&mut self, port_number: usize, value: u8) {
		Self::check_port_number(port_number);

		trace!("[SNES-CPU] write CPUIO {port_number} = {0:02x} ({0})", value);
		self.read_ports[port_number] = value;
	}
}

/// Internal CPU timers.
#[derive(Clone, Copy, Debug)]
pub struct Timers {
	/// Current timer output value (`TnOUT`), 4 bits.
	pub timer_out:     [u8; 3],
	/// Timer divisor values (`TnDIV`), where 0 means 256.
	pub timer_divisor: [u8; 3],
	/// Internal stage 2 counter that counts up to the divisor.
	position:          [u16; 3],
	/// CPU cycles accumulated towards the next stage 2 step.
	prescaler:         [u64; 3],
}

impl Default for Timers {
	fn default() -> Self {
		Self::new()
	}
}

impl Timers {
	/// CPU cycles per step of timers 0 and 1 (8 kHz).
	pub const T01_CLOCKS_PER_STEP: u64 = 128;
	/// CPU cycles per step of timer 2 (64 kHz).
	pub const T2_CLOCKS_PER_STEP: u64 = 16;
	const TIMER_CLOCKS_PER_STEP: [u64; 3] =
		[Self::T01_CLOCKS_PER_STEP, Self::T01_CLOCKS_PER_STEP, Self::T2_CLOCKS_PER_STEP];

	/// Create new timers.
	#[must_use]
	pub const fn new() -> Self {
		Self { timer_out: [0; 3], timer_divisor: [0; 3], position: [0; 3], prescaler: [0; 3] }
	}

	/// The effective divisor of a timer; a divisor register of 0 divides by 256.
	#[inline]
	#[must_use]
	pub fn divisor(&self, timer: usize) -> u16 {
		match self.timer_divisor[timer] {
			0 => 256,
			divisor => u16::from(divisor),
		}
	}

	/// Advance the timers by the given number of CPU cycles. Only enabled timers count.
	pub fn advance(&mut self, cycles: u64, control: ControlRegister) {
		for timer in 0 .. 3 {
			self.prescaler[timer] += cycles;
			let period = Self::TIMER_CLOCKS_PER_STEP[timer];
			while self.prescaler[timer] >= period {
				self.prescaler[timer] -= period;
				if control.timer_enabled(timer) {
					self.step(timer);
				}
			}
		}
	}

	fn step(&mut self, timer: usize) {
		self.position[timer] += 1;
		if self.position[timer] >= self.divisor(timer) {
			self.position[timer] = 0;
			self.timer_out[timer] = (self.timer_out[timer] + 1) & 0xf;
			trace!("Timer {} step to {} (/ {})", timer, self.timer_out[timer], self.divisor(timer));
		}
	}

	/// Restart a timer, which happens when it is enabled.
	pub fn restart(&mut self, timer: usize) {
		self.position[timer] = 0;
		self.timer_out[timer] = 0;
	}

	/// Reads a timer output; the counter is cleared by the read.
	pub fn read_output(&mut self, timer: usize) -> u8 {
		let value = self.timer_out[timer];
		self.timer_out[timer] = 0;
		value
	}
}

/// Internal TEST register. Writes are kept but have no effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct TestRegister(pub(crate) u8);

impl Default for TestRegister {
	fn default() -> Self {
		Self(0x0A)
	}
}

/// Internal CONTROL register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct ControlRegister(pub(crate) u8);

impl Default for ControlRegister {
	fn default() -> Self {
		Self(0xB0)
	}
}

impl ControlRegister {
	/// Whether the given timer (0-2) is enabled.
	#[inline]
	#[must_use]
	pub fn timer_enabled(self, timer: usize) -> bool {
		self.contains([Self::Timer0Enable, Self::Timer1Enable, Self::Timer2Enable][timer])
	}
}

/// Program Status Word (flags register).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct ProgramStatusWord(pub(crate) u8);

bitflags! {
	impl ControlRegister: u8 {
		/// Enable Timer 0
		const Timer0Enable = 0b0000_0001;
		/// Enable Timer 1
		const Timer1Enable = 0b0000_0010;
		/// Enable Timer 2
		const Timer2Enable = 0b0000_0100;
		/// Reset CPUIO 0 & 1 latches
		const ResetPorts01 = 0b0001_0000;
		/// Reset CPUIO 2 & 3 latches
		const ResetPorts23 = 0b0010_0000;
		/// Enable Boot ROM with flag = 1
		const BootRomEnable = 0b1000_0000;
	}

	impl ProgramStatusWord: u8 {
		/// N
		const Sign = 0b1000_0000;
		/// V
		const Overflow = 0b0100_0000;
		/// P
		const DirectPage = 0b0010_0000;
		/// B
		const Break = 0b0001_0000;
		/// H
		const HalfCarry = 0b0000_1000;
		/// I
		const Interrupt = 0b0000_0100;
		/// Z
		const Zero = 0b0000_0010;
		/// C
		const Carry = 0b0000_0001;
	}
}

impl std::fmt::Display for ProgramStatusWord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{}{}{}{}{}{}{}{}",
			if self.contains(Self::Sign) { "N" } else { "-" },
			if self.contains(Self::Overflow) { "V" } else { "-" },
			if self.contains(Self::DirectPage) { "P" } else { "-" },
			if self.contains(Self::Break) { "B" } else { "-" },
			if self.contains(Self::HalfCarry) { "H" } else { "-" },
			if self.contains(Self::Interrupt) { "I" } else { "-" },
			if self.contains(Self::Zero) { "Z" } else { "-" },
			if self.contains(Self::Carry) { "C" } else { "-" },
		)
	}
}
