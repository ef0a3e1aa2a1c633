//! Implementations of machine instructions in the emulated CPU.
//!
//! Instructions execute atomically; the documented cycle count of each opcode is taken from [`CYCLE_TABLE`], and
//! conditional branches add two cycles when they are taken.
//!
//! The opcode map is regular in large parts: column 0 holds flag operations and conditional branches, columns 1 to 3
//! hold TCALL, SET1/CLR1 and BBS/BBC with the bit (or call) number in the upper nibble, and columns 4 to 9 of rows 0
//! to B are the six arithmetic/logic operations over the same ten addressing modes. Everything else is decoded
//! individually.

#![allow(clippy::cast_possible_truncation, clippy::cast_lossless)]

use super::{Bus, ProgramStatusWord, RunState, Smp, BREAK_VECTOR};
use crate::trace;

/// Base cycle count of every opcode.
#[rustfmt::skip]
pub const CYCLE_TABLE: [u8; 256] = [
	//  0  1  2  3  4  5  6  7  8  9  A  B  C  D  E  F
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 6, 5, 4, 5, 4, 6, 8, // 0
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 6, 5, 2, 2, 4, 6, // 1
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 6, 5, 4, 5, 4, 5, 4, // 2
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 6, 5, 2, 2, 3, 8, // 3
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 6, 4, 4, 5, 4, 6, 6, // 4
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 4, 5, 2, 2, 4, 3, // 5
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 6, 4, 4, 5, 4, 5, 5, // 6
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 5, 5, 2, 2, 3, 6, // 7
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 6, 5, 4, 5, 2, 4, 5, // 8
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 5, 5, 2, 2,12, 5, // 9
	    3, 8, 4, 5, 3, 4, 3, 6, 2, 6, 4, 4, 5, 2, 4, 4, // A
	    2, 8, 4, 5, 4, 5, 5, 6, 5, 5, 5, 5, 2, 2, 3, 4, // B
	    3, 8, 4, 5, 4, 5, 4, 7, 2, 5, 6, 4, 5, 2, 4, 9, // C
	    2, 8, 4, 5, 5, 6, 6, 7, 4, 5, 5, 5, 2, 2, 6, 3, // D
	    2, 8, 4, 5, 3, 4, 3, 6, 2, 4, 5, 3, 4, 3, 4, 3, // E
	    2, 8, 4, 5, 4, 5, 5, 6, 3, 4, 5, 4, 2, 2, 4, 3, // F
];

/// Extra cycles spent by a taken conditional branch.
const BRANCH_TAKEN_CYCLES: u8 = 2;

/// Memory addressing modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AddressingMode {
	/// `dp`
	Direct,
	/// `dp+X`
	DirectX,
	/// `dp+Y`
	DirectY,
	/// `!abs`
	Absolute,
	/// `!abs+X`
	AbsoluteX,
	/// `!abs+Y`
	AbsoluteY,
	/// `(X)`
	IndirectX,
	/// `[dp+X]`
	IndexedIndirect,
	/// `[dp]+Y`
	IndirectIndexed,
}

/// Arithmetic and logic operations of the regular opcode block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AluOperation {
	Or,
	And,
	Eor,
	Cmp,
	Adc,
	Sbc,
}

impl AluOperation {
	const fn from_row(row: u8) -> Self {
		match row >> 1 {
			0 => Self::Or,
			1 => Self::And,
			2 => Self::Eor,
			3 => Self::Cmp,
			4 => Self::Adc,
			_ => Self::Sbc,
		}
	}
}

/// Register or memory operand of read-modify-write instructions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Target {
	A,
	X,
	Y,
	Memory(u16),
}

/// Execute an instruction whose opcode was already fetched. Returns the number of cycles the instruction took.
pub(super) fn execute(cpu: &mut Smp, bus: &mut Bus, opcode: u8) -> u8 {
	let row = opcode >> 4;
	let column = opcode & 0xf;
	let extra_cycles = match (row, column) {
		(0x0 ..= 0xB, 0x4 ..= 0x9) => {
			alu_block(cpu, bus, row, column);
			0
		},
		(_, 0x0) if row & 1 == 0 => {
			flag_operation(cpu, row);
			0
		},
		(_, 0x0) => {
			let condition = match row {
				0x1 => !cpu.psw.contains(ProgramStatusWord::Sign),
				0x3 => cpu.psw.contains(ProgramStatusWord::Sign),
				0x5 => !cpu.psw.contains(ProgramStatusWord::Overflow),
				0x7 => cpu.psw.contains(ProgramStatusWord::Overflow),
				0x9 => !cpu.carry(),
				0xB => cpu.carry(),
				0xD => !cpu.psw.contains(ProgramStatusWord::Zero),
				_ => cpu.psw.contains(ProgramStatusWord::Zero),
			};
			branch(cpu, bus, condition)
		},
		(_, 0x1) => {
			let vector = BREAK_VECTOR - 2 * u16::from(row);
			let target = cpu.read_word(vector, bus);
			call(cpu, bus, target);
			0
		},
		(_, 0x2) => {
			let address = direct_operand(cpu, bus);
			let value = cpu.read(address, bus);
			let bit = 1 << (row >> 1);
			let value = if row & 1 == 0 { value | bit } else { value & !bit };
			cpu.write(address, value, bus);
			0
		},
		(_, 0x3) => {
			let address = direct_operand(cpu, bus);
			let value = cpu.read(address, bus);
			let is_set = value & (1 << (row >> 1)) != 0;
			branch(cpu, bus, is_set == (row & 1 == 0))
		},
		_ => single_operation(cpu, bus, opcode),
	};
	CYCLE_TABLE[opcode as usize] + extra_cycles
}

/// Columns 4 to 9 of rows 0 to B.
fn alu_block(cpu: &mut Smp, bus: &mut Bus, row: u8, column: u8) {
	let operation = AluOperation::from_row(row);
	let even_row = row & 1 == 0;
	match (column, even_row) {
		(0x9, true) => {
			let source = direct_operand(cpu, bus);
			let source = cpu.read(source, bus);
			let destination = direct_operand(cpu, bus);
			alu_to_memory(cpu, bus, operation, destination, source);
		},
		(0x8, false) => {
			let immediate = cpu.read_next_pc(bus);
			let destination = direct_operand(cpu, bus);
			alu_to_memory(cpu, bus, operation, destination, immediate);
		},
		(0x9, false) => {
			let source = cpu.direct_address(cpu.y);
			let source = cpu.read(source, bus);
			let destination = cpu.direct_address(cpu.x);
			alu_to_memory(cpu, bus, operation, destination, source);
		},
		(0x8, true) => {
			let immediate = cpu.read_next_pc(bus);
			let a = cpu.a;
			cpu.a = alu(cpu, operation, a, immediate);
		},
		_ => {
			let mode = match (column, even_row) {
				(0x4, true) => AddressingMode::Direct,
				(0x5, true) => AddressingMode::Absolute,
				(0x6, true) => AddressingMode::IndirectX,
				(0x7, true) => AddressingMode::IndexedIndirect,
				(0x4, false) => AddressingMode::DirectX,
				(0x5, false) => AddressingMode::AbsoluteX,
				(0x6, false) => AddressingMode::AbsoluteY,
				_ => AddressingMode::IndirectIndexed,
			};
			let address = effective_address(cpu, bus, mode);
			let operand = cpu.read(address, bus);
			let a = cpu.a;
			cpu.a = alu(cpu, operation, a, operand);
		},
	}
}

/// Even rows of column 0.
fn flag_operation(cpu: &mut Smp, row: u8) {
	match row {
		0x0 => {},
		0x2 => cpu.set_flag(ProgramStatusWord::DirectPage, false),
		0x4 => cpu.set_flag(ProgramStatusWord::DirectPage, true),
		0x6 => cpu.set_flag(ProgramStatusWord::Carry, false),
		0x8 => cpu.set_flag(ProgramStatusWord::Carry, true),
		0xA => cpu.set_flag(ProgramStatusWord::Interrupt, true),
		0xC => cpu.set_flag(ProgramStatusWord::Interrupt, false),
		_ => cpu.psw.remove(ProgramStatusWord::Overflow | ProgramStatusWord::HalfCarry),
	}
}

/// All opcodes outside the regular blocks. Returns extra cycles spent.
#[allow(clippy::too_many_lines)]
fn single_operation(cpu: &mut Smp, bus: &mut Bus, opcode: u8) -> u8 {
	match opcode {
		// Bit operations on memory bits.
		0x0A | 0x2A | 0x4A | 0x6A | 0x8A | 0xAA => {
			let (address, bit) = bit_operand(cpu, bus);
			let value = cpu.read(address, bus) & (1 << bit) != 0;
			let carry = cpu.carry();
			let carry = match opcode {
				0x0A => carry | value,
				0x2A => carry | !value,
				0x4A => carry & value,
				0x6A => carry & !value,
				0x8A => carry ^ value,
				_ => value,
			};
			cpu.set_flag(ProgramStatusWord::Carry, carry);
		},
		0xCA => {
			let (address, bit) = bit_operand(cpu, bus);
			let value = cpu.read(address, bus);
			let value = if cpu.carry() { value | (1 << bit) } else { value & !(1 << bit) };
			cpu.write(address, value, bus);
		},
		0xEA => {
			let (address, bit) = bit_operand(cpu, bus);
			let value = cpu.read(address, bus) ^ (1 << bit);
			cpu.write(address, value, bus);
		},
		0x0E | 0x4E => {
			let address = cpu.read_next_pc_word(bus);
			let value = cpu.read(address, bus);
			cpu.set_nz(cpu.a.wrapping_sub(value));
			let value = if opcode == 0x0E { value | cpu.a } else { value & !cpu.a };
			cpu.write(address, value, bus);
		},

		// Shifts, rotates, increments and decrements.
		0x0B | 0x0C | 0x1B | 0x1C | 0x2B | 0x2C | 0x3B | 0x3C | 0x4B | 0x4C | 0x5B | 0x5C | 0x6B | 0x6C | 0x7B
		| 0x7C | 0x8B | 0x8C | 0x9B | 0x9C | 0xAB | 0xAC | 0xBB | 0xBC => {
			let target = match opcode & 0x1f {
				0x0B => Target::Memory(direct_operand(cpu, bus)),
				0x0C => Target::Memory(cpu.read_next_pc_word(bus)),
				0x1B => Target::Memory(effective_address(cpu, bus, AddressingMode::DirectX)),
				_ => Target::A,
			};
			let operation: fn(&mut Smp, u8) -> u8 = match opcode >> 5 {
				0 => shift_left,
				1 => rotate_left,
				2 => shift_right,
				3 => rotate_right,
				4 => decrement,
				_ => increment,
			};
			modify(cpu, bus, target, operation);
		},
		0x1D => modify(cpu, bus, Target::X, decrement),
		0x3D => modify(cpu, bus, Target::X, increment),
		0xDC => modify(cpu, bus, Target::Y, decrement),
		0xFC => modify(cpu, bus, Target::Y, increment),

		// Comparisons with X and Y.
		0x1E | 0x3E | 0xC8 | 0x5E | 0x7E | 0xAD => {
			let operand = match opcode {
				0x1E | 0x5E => {
					let address = cpu.read_next_pc_word(bus);
					cpu.read(address, bus)
				},
				0x3E | 0x7E => {
					let address = direct_operand(cpu, bus);
					cpu.read(address, bus)
				},
				_ => cpu.read_next_pc(bus),
			};
			let register = if matches!(opcode, 0x1E | 0x3E | 0xC8) { cpu.x } else { cpu.y };
			compare(cpu, register, operand);
		},

		// 16-bit operations.
		0x1A | 0x3A => {
			let offset = cpu.read_next_pc(bus);
			let value = cpu.read_direct_word(offset, bus);
			let value = if opcode == 0x1A { value.wrapping_sub(1) } else { value.wrapping_add(1) };
			cpu.write_direct_word(offset, value, bus);
			cpu.set_nz16(value);
		},
		0x5A => {
			let offset = cpu.read_next_pc(bus);
			let value = cpu.read_direct_word(offset, bus);
			let ya = cpu.ya();
			cpu.set_flag(ProgramStatusWord::Carry, ya >= value);
			cpu.set_nz16(ya.wrapping_sub(value));
		},
		0x7A | 0x9A => {
			let offset = cpu.read_next_pc(bus);
			let value = cpu.read_direct_word(offset, bus);
			let result = if opcode == 0x7A { add_word(cpu, value) } else { subtract_word(cpu, value) };
			cpu.set_ya(result);
		},
		0xBA => {
			let offset = cpu.read_next_pc(bus);
			let value = cpu.read_direct_word(offset, bus);
			cpu.set_ya(value);
			cpu.set_nz16(value);
		},
		0xDA => {
			let offset = cpu.read_next_pc(bus);
			cpu.write_direct_word(offset, cpu.ya(), bus);
		},

		// Multiplication, division and decimal adjust.
		0xCF => {
			let result = u16::from(cpu.y) * u16::from(cpu.a);
			cpu.set_ya(result);
			cpu.set_nz(cpu.y);
		},
		0x9E => divide(cpu),
		0xDF => {
			if cpu.carry() || cpu.a > 0x99 {
				cpu.a = cpu.a.wrapping_add(0x60);
				cpu.set_flag(ProgramStatusWord::Carry, true);
			}
			if cpu.psw.contains(ProgramStatusWord::HalfCarry) || cpu.a & 0xf > 9 {
				cpu.a = cpu.a.wrapping_add(6);
			}
			cpu.set_nz(cpu.a);
		},
		0xBE => {
			if !cpu.carry() || cpu.a > 0x99 {
				cpu.a = cpu.a.wrapping_sub(0x60);
				cpu.set_flag(ProgramStatusWord::Carry, false);
			}
			if !cpu.psw.contains(ProgramStatusWord::HalfCarry) || cpu.a & 0xf > 9 {
				cpu.a = cpu.a.wrapping_sub(6);
			}
			cpu.set_nz(cpu.a);
		},
		0x9F => {
			cpu.a = cpu.a.rotate_left(4);
			cpu.set_nz(cpu.a);
		},
		0xED => cpu.psw.toggle(ProgramStatusWord::Carry),

		// Control flow.
		0x0F => {
			cpu.push_word(cpu.pc, bus);
			cpu.push(cpu.psw.0, bus);
			cpu.set_flag(ProgramStatusWord::Break, true);
			cpu.set_flag(ProgramStatusWord::Interrupt, false);
			cpu.pc = cpu.read_word(BREAK_VECTOR, bus);
		},
		0x1F => {
			let address = cpu.read_next_pc_word(bus).wrapping_add(u16::from(cpu.x));
			cpu.pc = cpu.read_word(address, bus);
		},
		0x2E | 0xDE => {
			let address = if opcode == 0x2E {
				direct_operand(cpu, bus)
			} else {
				effective_address(cpu, bus, AddressingMode::DirectX)
			};
			let not_equal = cpu.read(address, bus) != cpu.a;
			return branch(cpu, bus, not_equal);
		},
		0x2F => {
			branch(cpu, bus, true);
		},
		0x3F => {
			let target = cpu.read_next_pc_word(bus);
			call(cpu, bus, target);
		},
		0x4F => {
			let offset = cpu.read_next_pc(bus);
			call(cpu, bus, 0xFF00 | u16::from(offset));
		},
		0x5F => cpu.pc = cpu.read_next_pc_word(bus),
		0x6E => {
			let address = direct_operand(cpu, bus);
			let value = cpu.read(address, bus).wrapping_sub(1);
			cpu.write(address, value, bus);
			return branch(cpu, bus, value != 0);
		},
		0xFE => {
			cpu.y = cpu.y.wrapping_sub(1);
			let not_zero = cpu.y != 0;
			return branch(cpu, bus, not_zero);
		},
		0x6F => cpu.pc = cpu.pop_word(bus),
		0x7F => {
			cpu.psw = ProgramStatusWord(cpu.pop(bus));
			cpu.pc = cpu.pop_word(bus);
		},
		0xEF => cpu.halt(RunState::Sleeping),
		0xFF => cpu.halt(RunState::Stopped),

		// Stack.
		0x0D => cpu.push(cpu.psw.0, bus),
		0x2D => cpu.push(cpu.a, bus),
		0x4D => cpu.push(cpu.x, bus),
		0x6D => cpu.push(cpu.y, bus),
		0x8E => cpu.psw = ProgramStatusWord(cpu.pop(bus)),
		0xAE => cpu.a = cpu.pop(bus),
		0xCE => cpu.x = cpu.pop(bus),
		0xEE => cpu.y = cpu.pop(bus),

		// Register transfers.
		0x5D => {
			cpu.x = cpu.a;
			cpu.set_nz(cpu.x);
		},
		0x7D => {
			cpu.a = cpu.x;
			cpu.set_nz(cpu.a);
		},
		0x9D => {
			cpu.x = cpu.sp;
			cpu.set_nz(cpu.x);
		},
		0xBD => cpu.sp = cpu.x,
		0xDD => {
			cpu.a = cpu.y;
			cpu.set_nz(cpu.a);
		},
		0xFD => {
			cpu.y = cpu.a;
			cpu.set_nz(cpu.y);
		},

		// Loads.
		0x8D | 0xCD | 0xE8 => {
			let immediate = cpu.read_next_pc(bus);
			let target = match opcode {
				0x8D => Target::Y,
				0xCD => Target::X,
				_ => Target::A,
			};
			load(cpu, target, immediate);
		},
		0xE4 | 0xE5 | 0xE6 | 0xE7 | 0xF4 | 0xF5 | 0xF6 | 0xF7 => {
			let mode = match opcode {
				0xE4 => AddressingMode::Direct,
				0xE5 => AddressingMode::Absolute,
				0xE6 => AddressingMode::IndirectX,
				0xE7 => AddressingMode::IndexedIndirect,
				0xF4 => AddressingMode::DirectX,
				0xF5 => AddressingMode::AbsoluteX,
				0xF6 => AddressingMode::AbsoluteY,
				_ => AddressingMode::IndirectIndexed,
			};
			let address = effective_address(cpu, bus, mode);
			let value = cpu.read(address, bus);
			load(cpu, Target::A, value);
		},
		0xBF => {
			let address = cpu.direct_address(cpu.x);
			let value = cpu.read(address, bus);
			cpu.x = cpu.x.wrapping_add(1);
			load(cpu, Target::A, value);
		},
		0xE9 | 0xF8 | 0xF9 | 0xEB | 0xEC | 0xFB => {
			let (mode, target) = match opcode {
				0xE9 => (AddressingMode::Absolute, Target::X),
				0xF8 => (AddressingMode::Direct, Target::X),
				0xF9 => (AddressingMode::DirectY, Target::X),
				0xEB => (AddressingMode::Direct, Target::Y),
				0xEC => (AddressingMode::Absolute, Target::Y),
				_ => (AddressingMode::DirectX, Target::Y),
			};
			let address = effective_address(cpu, bus, mode);
			let value = cpu.read(address, bus);
			load(cpu, target, value);
		},

		// Stores.
		0xC4 | 0xC5 | 0xC6 | 0xC7 | 0xD4 | 0xD5 | 0xD6 | 0xD7 => {
			let mode = match opcode {
				0xC4 => AddressingMode::Direct,
				0xC5 => AddressingMode::Absolute,
				0xC6 => AddressingMode::IndirectX,
				0xC7 => AddressingMode::IndexedIndirect,
				0xD4 => AddressingMode::DirectX,
				0xD5 => AddressingMode::AbsoluteX,
				0xD6 => AddressingMode::AbsoluteY,
				_ => AddressingMode::IndirectIndexed,
			};
			let address = effective_address(cpu, bus, mode);
			cpu.write(address, cpu.a, bus);
		},
		0xAF => {
			let address = cpu.direct_address(cpu.x);
			cpu.write(address, cpu.a, bus);
			cpu.x = cpu.x.wrapping_add(1);
		},
		0xC9 | 0xD8 | 0xD9 | 0xCB | 0xCC | 0xDB => {
			let (mode, value) = match opcode {
				0xC9 => (AddressingMode::Absolute, cpu.x),
				0xD8 => (AddressingMode::Direct, cpu.x),
				0xD9 => (AddressingMode::DirectY, cpu.x),
				0xCB => (AddressingMode::Direct, cpu.y),
				0xCC => (AddressingMode::Absolute, cpu.y),
				_ => (AddressingMode::DirectX, cpu.y),
			};
			let address = effective_address(cpu, bus, mode);
			cpu.write(address, value, bus);
		},
		0x8F => {
			let immediate = cpu.read_next_pc(bus);
			let address = direct_operand(cpu, bus);
			cpu.write(address, immediate, bus);
		},
		0xFA => {
			let source = direct_operand(cpu, bus);
			let value = cpu.read(source, bus);
			let destination = direct_operand(cpu, bus);
			cpu.write(destination, value, bus);
		},

		_ => unreachable!("opcode {opcode:02x} is decoded by a regular block"),
	}
	0
}

/// Reads a direct page offset operand and returns the address it refers to.
fn direct_operand(cpu: &mut Smp, bus: &mut Bus) -> u16 {
	let offset = cpu.read_next_pc(bus);
	cpu.direct_address(offset)
}

/// Reads a `mem.bit` operand: 13-bit absolute address and bit number in the upper 3 bits.
fn bit_operand(cpu: &mut Smp, bus: &mut Bus) -> (u16, u8) {
	let operand = cpu.read_next_pc_word(bus);
	(operand & 0x1fff, (operand >> 13) as u8)
}

/// Reads the operands of an addressing mode and computes the address it selects.
fn effective_address(cpu: &mut Smp, bus: &mut Bus, mode: AddressingMode) -> u16 {
	match mode {
		AddressingMode::Direct => direct_operand(cpu, bus),
		AddressingMode::DirectX => {
			let offset = cpu.read_next_pc(bus);
			cpu.direct_address(offset.wrapping_add(cpu.x))
		},
		AddressingMode::DirectY => {
			let offset = cpu.read_next_pc(bus);
			cpu.direct_address(offset.wrapping_add(cpu.y))
		},
		AddressingMode::Absolute => cpu.read_next_pc_word(bus),
		AddressingMode::AbsoluteX => cpu.read_next_pc_word(bus).wrapping_add(u16::from(cpu.x)),
		AddressingMode::AbsoluteY => cpu.read_next_pc_word(bus).wrapping_add(u16::from(cpu.y)),
		AddressingMode::IndirectX => cpu.direct_address(cpu.x),
		AddressingMode::IndexedIndirect => {
			let offset = cpu.read_next_pc(bus);
			cpu.read_direct_word(offset.wrapping_add(cpu.x), bus)
		},
		AddressingMode::IndirectIndexed => {
			let offset = cpu.read_next_pc(bus);
			cpu.read_direct_word(offset, bus).wrapping_add(u16::from(cpu.y))
		},
	}
}

/// Reads a relative branch operand and branches if the condition holds. Returns the extra cycles spent.
#[allow(clippy::cast_possible_wrap)]
fn branch(cpu: &mut Smp, bus: &mut Bus, condition: bool) -> u8 {
	let offset = cpu.read_next_pc(bus) as i8;
	if condition {
		cpu.pc = cpu.pc.wrapping_add_signed(i16::from(offset));
		trace!("branch taken to {:04x}", cpu.pc);
		BRANCH_TAKEN_CYCLES
	} else {
		0
	}
}

fn call(cpu: &mut Smp, bus: &mut Bus, target: u16) {
	cpu.push_word(cpu.pc, bus);
	cpu.pc = target;
}

/// Loads a register and sets N and Z. Memory targets are not loads and are ignored.
fn load(cpu: &mut Smp, target: Target, value: u8) {
	match target {
		Target::A => cpu.a = value,
		Target::X => cpu.x = value,
		Target::Y => cpu.y = value,
		Target::Memory(_) => return,
	}
	cpu.set_nz(value);
}

fn modify(cpu: &mut Smp, bus: &mut Bus, target: Target, operation: fn(&mut Smp, u8) -> u8) {
	match target {
		Target::A => {
			let value = cpu.a;
			cpu.a = operation(cpu, value);
		},
		Target::X => {
			let value = cpu.x;
			cpu.x = operation(cpu, value);
		},
		Target::Y => {
			let value = cpu.y;
			cpu.y = operation(cpu, value);
		},
		Target::Memory(address) => {
			let value = cpu.read(address, bus);
			let value = operation(cpu, value);
			cpu.write(address, value, bus);
		},
	}
}

/// Applies an operation to memory. CMP only sets flags.
fn alu_to_memory(cpu: &mut Smp, bus: &mut Bus, operation: AluOperation, destination: u16, source: u8) {
	let value = cpu.read(destination, bus);
	let result = alu(cpu, operation, value, source);
	if operation != AluOperation::Cmp {
		cpu.write(destination, result, bus);
	}
}

/// Computes `left op right` and sets flags. CMP returns `left` unchanged.
fn alu(cpu: &mut Smp, operation: AluOperation, left: u8, right: u8) -> u8 {
	let result = match operation {
		AluOperation::Or => left | right,
		AluOperation::And => left & right,
		AluOperation::Eor => left ^ right,
		AluOperation::Cmp => {
			compare(cpu, left, right);
			return left;
		},
		AluOperation::Adc => return add_with_carry(cpu, left, right),
		AluOperation::Sbc => return add_with_carry(cpu, left, !right),
	};
	cpu.set_nz(result);
	result
}

fn compare(cpu: &mut Smp, left: u8, right: u8) {
	cpu.set_flag(ProgramStatusWord::Carry, left >= right);
	cpu.set_nz(left.wrapping_sub(right));
}

/// ADC; SBC is ADC with the inverted operand.
fn add_with_carry(cpu: &mut Smp, left: u8, right: u8) -> u8 {
	let sum = u16::from(left) + u16::from(right) + u16::from(cpu.carry());
	let result = sum as u8;
	cpu.set_flag(ProgramStatusWord::Overflow, !(left ^ right) & (left ^ result) & 0x80 != 0);
	cpu.set_flag(ProgramStatusWord::HalfCarry, (left ^ right ^ result) & 0x10 != 0);
	cpu.set_flag(ProgramStatusWord::Carry, sum > 0xff);
	cpu.set_nz(result);
	result
}

fn add_word(cpu: &mut Smp, value: u16) -> u16 {
	let ya = cpu.ya();
	let sum = u32::from(ya) + u32::from(value);
	let result = sum as u16;
	cpu.set_flag(ProgramStatusWord::Carry, sum > 0xffff);
	cpu.set_flag(ProgramStatusWord::HalfCarry, (ya & 0xfff) + (value & 0xfff) > 0xfff);
	cpu.set_flag(ProgramStatusWord::Overflow, !(ya ^ value) & (ya ^ result) & 0x8000 != 0);
	cpu.set_nz16(result);
	result
}

fn subtract_word(cpu: &mut Smp, value: u16) -> u16 {
	let ya = cpu.ya();
	let result = ya.wrapping_sub(value);
	cpu.set_flag(ProgramStatusWord::Carry, ya >= value);
	cpu.set_flag(ProgramStatusWord::HalfCarry, ya & 0xfff >= value & 0xfff);
	cpu.set_flag(ProgramStatusWord::Overflow, (ya ^ value) & (ya ^ result) & 0x8000 != 0);
	cpu.set_nz16(result);
	result
}

/// DIV YA,X, including the hardware's results for quotients that do not fit into 8 bits.
fn divide(cpu: &mut Smp) {
	let ya = u32::from(cpu.ya());
	let x = u32::from(cpu.x);
	let y = u32::from(cpu.y);
	cpu.set_flag(ProgramStatusWord::Overflow, y >= x);
	cpu.set_flag(ProgramStatusWord::HalfCarry, (y & 0xf) >= (x & 0xf));
	let (quotient, remainder) = if y < x * 2 {
		let quotient = ya / x;
		(quotient, ya - quotient * x)
	} else {
		let excess = ya - x * 0x200;
		(255u32.wrapping_sub(excess / (256 - x)), x + excess % (256 - x))
	};
	cpu.a = quotient as u8;
	cpu.y = remainder as u8;
	cpu.set_nz(cpu.a);
}

fn shift_left(cpu: &mut Smp, value: u8) -> u8 {
	cpu.set_flag(ProgramStatusWord::Carry, value & 0x80 != 0);
	let result = value << 1;
	cpu.set_nz(result);
	result
}

fn rotate_left(cpu: &mut Smp, value: u8) -> u8 {
	let result = (value << 1) | u8::from(cpu.carry());
	cpu.set_flag(ProgramStatusWord::Carry, value & 0x80 != 0);
	cpu.set_nz(result);
	result
}

fn shift_right(cpu: &mut Smp, value: u8) -> u8 {
	cpu.set_flag(ProgramStatusWord::Carry, value & 1 != 0);
	let result = value >> 1;
	cpu.set_nz(result);
	result
}

fn rotate_right(cpu: &mut Smp, value: u8) -> u8 {
	let result = (value >> 1) | (u8::from(cpu.carry()) << 7);
	cpu.set_flag(ProgramStatusWord::Carry, value & 1 != 0);
	cpu.set_nz(result);
	result
}

fn increment(cpu: &mut Smp, value: u8) -> u8 {
	let result = value.wrapping_add(1);
	cpu.set_nz(result);
	result
}

fn decrement(cpu: &mut Smp, value: u8) -> u8 {
	let result = value.wrapping_sub(1);
	cpu.set_nz(result);
	result
}
