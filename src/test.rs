use rstest::rstest;

use crate::snapshot::test::{spc_image, DSP, RAM};
use crate::{InvalidArgument, LoadError, LoadOptions, Session, SnapshotFormat, BYTES_PER_FRAME};

/// Copies input port 0 to output port 1, forever.
///
/// ```asm
/// loop: mov a, $f4
///       mov $f5, a
///       bra loop
/// ```
const PORT_ECHO: [u8; 6] = [0xE4, 0xF4, 0xC4, 0xF5, 0x2F, 0xFA];

/// A looping sample block with a bit of variation.
const SAMPLE: [u8; 9] = [0xC3, 0x13, 0x57, 0x9B, 0xDF, 0xFD, 0xB9, 0x75, 0x31];

/// Snapshot running [`PORT_ECHO`] while voice 0 plays [`SAMPLE`].
fn snapshot() -> Vec<u8> {
	spc_image(|bytes| {
		// PC = $0200, SP = $EF
		bytes[0x25] = 0x00;
		bytes[0x26] = 0x02;
		bytes[0x2B] = 0xEF;

		let ram = &mut bytes[RAM .. RAM + 0x10000];
		ram[0x0200 .. 0x0206].copy_from_slice(&PORT_ECHO);
		ram[0x0300 .. 0x0304].copy_from_slice(&[0x00, 0x04, 0x00, 0x04]);
		ram[0x0400 .. 0x0409].copy_from_slice(&SAMPLE);

		let dsp = &mut bytes[DSP .. DSP + 0x80];
		dsp[0x00] = 0x40; // VOLL
		dsp[0x01] = 0x40; // VOLR
		dsp[0x03] = 0x08; // PITCHH
		dsp[0x07] = 0x7F; // GAIN
		dsp[0x0C] = 0x7F; // MVOLL
		dsp[0x1C] = 0x7F; // MVOLR
		dsp[0x4C] = 0x01; // KON
		dsp[0x5D] = 0x03; // DIR
		dsp[0x6C] = 0x20; // FLG: echo writes off
	})
}

fn session() -> Session {
	Session::from_snapshot(&snapshot(), LoadOptions::default()).unwrap()
}

const BUFFER: usize = 1 << 16;

#[test]
fn loads_snapshot() {
	let session = session();
	assert_eq!(session.format(), Some(SnapshotFormat::Spc));
	assert!(session.metadata().is_none());
	assert_eq!(session.channel_mask(), 0);
	assert_eq!(session.total_cycles(), 0);
	assert_eq!(session.smp().pc, 0x0200);
}

#[test]
fn exposes_id666_title() {
	let mut bytes = snapshot();
	bytes[0x23] = 26;
	bytes[0x2E .. 0x2E + 5].copy_from_slice(b"Title");
	let session = Session::from_snapshot(&bytes, LoadOptions::default()).unwrap();
	assert_eq!(session.metadata().map(|tag| tag.title.as_str()), Some("Title"));
}

#[test]
fn produces_audio() {
	let mut session = session();
	let output = session.run(None, 100 * BYTES_PER_FRAME);
	assert_eq!(output.len(), 100 * BYTES_PER_FRAME);
	assert!(output.iter().any(|byte| *byte != 0));
	// Equal volumes on both sides.
	for frame in output.chunks_exact(BYTES_PER_FRAME) {
		assert_eq!(frame[0 .. 2], frame[2 .. 4]);
	}
	assert!((100 * 32 .. 100 * 32 + 12).contains(&session.total_cycles()));
}

#[rstest]
#[case::partial_frame(None, 7, 4)]
#[case::empty_buffer(None, 3, 0)]
#[case::no_cycles(Some(0), BUFFER, 0)]
#[case::one_cycle(Some(1), BUFFER, 4)]
#[case::whole_samples(Some(64), BUFFER, 8)]
#[case::partial_sample(Some(65), BUFFER, 12)]
#[case::buffer_is_limit(Some(1000), 16, 16)]
fn output_is_whole_frames(#[case] cycles: Option<u64>, #[case] buffer: usize, #[case] expected: usize) {
	let output = session().run(cycles, buffer);
	assert_eq!(output.len(), expected);
	assert_eq!(output.len() % BYTES_PER_FRAME, 0);
}

#[test]
fn split_cycle_runs_match_single_run() {
	let whole = session().run(Some(10_000), BUFFER);

	let mut split = session();
	let mut output = Vec::new();
	for cycles in [1234, 5000, 3, 3763] {
		output.extend(split.run(Some(cycles), BUFFER));
	}
	assert_eq!(output, whole);
	assert_eq!(whole.len(), 313 * BYTES_PER_FRAME);
}

#[test]
fn split_buffer_runs_match_single_run() {
	let whole = session().run(None, 800);

	let mut split = session();
	let mut output = split.run(None, 400);
	output.extend(split.run(None, 400));
	assert_eq!(output, whole);
}

#[test]
fn owed_cycles_run_before_buffer() {
	let mut session = session();
	session.run(Some(40), BUFFER);
	session.run(None, 2 * BYTES_PER_FRAME);
	assert!(session.total_cycles() >= 40 + 24 + 64);
}

#[test]
fn total_cycles_follow_budget() {
	let mut session = session();
	session.run(Some(1000), BUFFER);
	// The last instruction may overshoot by at most its own length.
	assert!((1000 .. 1012).contains(&session.total_cycles()));
}

#[test]
fn runs_are_deterministic() {
	let mut first = session();
	let mut second = session();
	for cycles in [500, 32, 7_000, 1] {
		assert_eq!(first.run(Some(cycles), BUFFER), second.run(Some(cycles), BUFFER));
	}
}

#[test]
fn channel_mask_mutes_voices() {
	let mut session = session();
	session.set_channel_mask(0x01);
	assert_eq!(session.channel_mask(), 0x01);
	let output = session.run(None, 100 * BYTES_PER_FRAME);
	assert!(output.iter().all(|byte| *byte == 0));

	// The voice kept playing in the meantime.
	session.set_channel_mask(0xFE);
	let output = session.run(None, 16 * BYTES_PER_FRAME);
	assert!(output.iter().any(|byte| *byte != 0));
}

#[test]
fn ports_are_separate() {
	let mut session = session();
	session.write_port(0, 0x5A).unwrap();
	session.run(Some(100), BUFFER);
	assert_eq!(session.read_port(1), Ok(0x5A));
	assert_eq!(session.read_port(0), Ok(0));

	session.write_port(0, -1).unwrap();
	session.run(Some(100), BUFFER);
	assert_eq!(session.read_port(1), Ok(0xFF));
}

#[rstest]
#[case::port(4, 0, InvalidArgument::PortOutOfRange { port: 4 })]
#[case::too_large(0, 256, InvalidArgument::DataOutOfRange { data: 256 })]
#[case::too_small(3, -129, InvalidArgument::DataOutOfRange { data: -129 })]
fn rejects_invalid_port_access(#[case] port: usize, #[case] data: i32, #[case] expected: InvalidArgument) {
	let mut session = session();
	assert_eq!(session.write_port(port, data), Err(expected));
}

#[test]
fn rejects_invalid_port_read() {
	assert_eq!(session().read_port(7), Err(InvalidArgument::PortOutOfRange { port: 7 }));
}

#[test]
fn failed_init_keeps_session() {
	let mut session = session();
	session.run(Some(500), BUFFER);
	let cycles = session.total_cycles();
	assert_eq!(session.init(b"not a snapshot"), Err(LoadError::UnrecognizedFormat));
	assert_eq!(session.total_cycles(), cycles);
	assert_eq!(session.format(), Some(SnapshotFormat::Spc));
	assert!(Session::from_snapshot(&snapshot()[.. 0x1000], LoadOptions::default()).is_err());
}

#[test]
fn reinit_resets_state() {
	let mut session = session();
	session.set_channel_mask(0xFF);
	session.run(Some(333), BUFFER);
	session.init(&snapshot()).unwrap();
	assert_eq!(session.channel_mask(), 0);
	assert_eq!(session.total_cycles(), 0);
	assert_eq!(session.run(Some(10_000), BUFFER), self::session().run(Some(10_000), BUFFER));
}

#[test]
fn fresh_session_is_silent() {
	let mut session = Session::new();
	assert_eq!(session.format(), None);
	let output = session.run(None, 512 * BYTES_PER_FRAME);
	assert!(output.iter().all(|byte| *byte == 0));
	// The IPL ROM initializes the port to $BBAA and waits for the main CPU.
	assert_eq!(session.read_port(0), Ok(0xAA));
	assert_eq!(session.read_port(1), Ok(0xBB));
}

#[test]
fn sessions_can_be_shared() {
	fn assert_send<T: Send>() {}
	assert_send::<Session>();

	let shared = session().into_shared();
	let worker = {
		let shared = shared.clone();
		std::thread::spawn(move || shared.lock().run(None, 16).len())
	};
	assert_eq!(worker.join().unwrap(), 16);
	assert!(shared.lock().total_cycles() >= 4 * 32);
}
