//! Audio regression tests.
//!
//! Each fixture is played for two minutes and the output is hashed. This only detects changes to the output; the
//! expected values are not known to be "correct", so a failure should be reviewed by listening to the output before
//! the checksum is updated.
//!
//! Fixtures are SPC files in `tests/data/<name>.spc`. They are not part of the repository, so these tests are
//! ignored by default; run them with `cargo test -- --ignored` once the fixtures are in place.

use std::path::PathBuf;

use md5::{Digest, Md5};
use rstest::rstest;
use spcemu::{LoadOptions, Session, BYTES_PER_FRAME, SAMPLE_RATE};

/// Seconds of audio that are hashed.
const RUNTIME: usize = 120;

#[rstest]
// Random song testing for nothing specific.
#[case::basic("basic", "39a192ba5ecc7e5b72a16bb7f92399dc")]
#[case::noise("noise", "017966aa138044486f39842501e1d2b1")]
#[case::pitch_mod("pitch_mod", "731237f5c50f95c54d071874a5787c40")]
// A BRR filter that is intentionally driven unstable.
#[case::brr_noise("brr_noise", "d289407278f2788a4a8bd73db7b393b1")]
// An incorrect BRR filter generates noise here where it shouldn't.
#[case::brr_no_noise("brr_no_noise", "6755c5deb6585a09347ee4f5a6626095")]
// Envelope modes change mid-note, which depends on the timing between CPU and DSP.
#[case::env_timing("env_timing", "11e10a64915495d50f4eb4a6eaba6045")]
#[case::direct_env("direct_env", "130a83c49b3af1d4930cf3cd4b4def4e")]
#[ignore = "needs the fixtures in tests/data"]
fn regression(#[case] name: &str, #[case] expected: &str) {
	let _ = simple_logger::SimpleLogger::new().with_level(log::LevelFilter::Warn).init();

	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(format!("{name}.spc"));
	let data = std::fs::read(&path).unwrap_or_else(|error| panic!("cannot read {}: {error}", path.display()));

	let mut session = Session::from_snapshot(&data, LoadOptions::default()).unwrap();
	let mut hasher = Md5::new();
	for _ in 0 .. RUNTIME {
		let second = session.run(None, SAMPLE_RATE as usize * BYTES_PER_FRAME);
		assert_eq!(second.len(), SAMPLE_RATE as usize * BYTES_PER_FRAME);
		hasher.update(&second);
	}
	let actual = format!("{:x}", hasher.finalize());
	assert_eq!(actual, expected, "{name} output changed");
}
