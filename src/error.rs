//! Errors reported by the engine's public surface.

use miette::Diagnostic;
use thiserror::Error;

/// Reasons why a snapshot could not be loaded into a session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[allow(clippy::module_name_repetitions)]
pub enum LoadError {
	/// The data is neither a complete SPC file nor a complete ZSNES save state.
	#[error("Input is neither an SPC file nor a ZSNES save state")]
	#[diagnostic(
		code(spcemu::unrecognized_format),
		severity(Error),
		help("SPC files start with \"SNES-SPC700 Sound File Data\" and are at least 65920 bytes long; truncated files \
		      are rejected as well")
	)]
	UnrecognizedFormat,

	/// The snapshot was recognized, but contains values the engine cannot represent.
	#[error("Snapshot could not be restored: {reason}")]
	#[diagnostic(code(spcemu::internal), severity(Error))]
	Internal {
		/// What went wrong.
		reason: String,
	},
}

impl From<spcfile::ParseError> for LoadError {
	fn from(_: spcfile::ParseError) -> Self {
		Self::UnrecognizedFormat
	}
}

/// Rejected arguments to the communication port accessors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum InvalidArgument {
	/// Only ports 0 to 3 exist.
	#[error("Port {port} does not exist, valid ports are 0-3")]
	#[diagnostic(code(spcemu::port_out_of_range), severity(Error))]
	PortOutOfRange {
		/// Requested port.
		port: usize,
	},

	/// Port data must fit into a byte, either signed or unsigned.
	#[error("Port data {data} does not fit into a byte")]
	#[diagnostic(
		code(spcemu::data_out_of_range),
		severity(Error),
		help("Valid values are -128 to 255; negative values are stored in two's complement")
	)]
	DataOutOfRange {
		/// Rejected value.
		data: i32,
	},
}
