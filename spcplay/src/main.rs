//! Command-line player for SPC files and ZSNES save states.

use std::fs::{self, File};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn, LevelFilter};
use rand::seq::SliceRandom;
use spcemu::{LoadOptions, Session, SnapshotFormat, BYTES_PER_FRAME, CPU_RATE, SAMPLE_RATE};
use time::macros::format_description;

/// Play time if neither the command line nor the snapshot says otherwise.
const DEFAULT_DURATION: Duration = Duration::from_secs(180);

/// Snapshot format that can be forced on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
	/// SPC file.
	Spc,
	/// ZSNES save state.
	Zst,
}

impl From<InputFormat> for SnapshotFormat {
	fn from(format: InputFormat) -> Self {
		match format {
			InputFormat::Spc => Self::Spc,
			InputFormat::Zst => Self::Zst,
		}
	}
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct CliArguments {
	/// Snapshots to play, one after the other.
	#[arg(required = true)]
	inputs:        Vec<PathBuf>,
	/// Reject inputs that are not in this format.
	#[arg(long)]
	format:        Option<InputFormat>,
	/// Verbosity level to use.
	#[arg(long, short, action = clap::ArgAction::Count)]
	verbose:       u8,
	/// Seconds to play each snapshot. Defaults to the length in the SPC tag, or 3 minutes.
	#[arg(long, short)]
	seconds:       Option<u64>,
	/// CPU cycles to execute per snapshot at maximum.
	#[arg(long)]
	cycles:        Option<u64>,
	/// Write a WAV file instead of raw 16-bit stereo PCM on standard output.
	#[arg(long, short)]
	output:        Option<PathBuf>,
	/// Voices to mute; bit n mutes voice n.
	#[arg(long, short, default_value_t = 0)]
	mask:          u8,
	/// Play the inputs in random order.
	#[arg(long)]
	shuffle:       bool,
	/// Keep whatever the snapshot has in its echo buffer.
	#[arg(long)]
	no_echo_clear: bool,
}

/// Where the audio goes.
enum Sink {
	Wav(hound::WavWriter<BufWriter<File>>),
	Raw(BufWriter<Stdout>),
}

impl Sink {
	fn new(output: Option<&Path>) -> Result<Self> {
		Ok(match output {
			Some(path) => {
				let spec = hound::WavSpec {
					channels:        2,
					sample_rate:     SAMPLE_RATE,
					bits_per_sample: 16,
					sample_format:   hound::SampleFormat::Int,
				};
				Self::Wav(
					hound::WavWriter::create(path, spec)
						.with_context(|| format!("could not create {}", path.display()))?,
				)
			},
			None => Self::Raw(BufWriter::new(io::stdout())),
		})
	}

	/// Write interleaved little-endian samples.
	fn write(&mut self, audio: &[u8]) -> Result<()> {
		match self {
			Self::Wav(writer) =>
				for sample in audio.chunks_exact(2) {
					writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
				},
			Self::Raw(writer) => writer.write_all(audio)?,
		}
		Ok(())
	}

	fn finish(self) -> Result<()> {
		match self {
			Self::Wav(writer) => writer.finalize()?,
			Self::Raw(mut writer) => writer.flush()?,
		}
		Ok(())
	}
}

fn load(path: &Path, arguments: &CliArguments) -> Result<Session> {
	let data = fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
	if let Some(format) = arguments.format {
		let detected = spcfile::detect_format(&data);
		if detected != Some(format.into()) {
			bail!("{} is not a {:?} snapshot", path.display(), format);
		}
	}

	let options = LoadOptions { clear_echo: !arguments.no_echo_clear };
	let mut session =
		Session::from_snapshot(&data, options).with_context(|| format!("could not load {}", path.display()))?;
	session.set_channel_mask(arguments.mask);
	Ok(session)
}

fn duration(session: &Session, arguments: &CliArguments) -> Duration {
	arguments.seconds.map_or_else(
		|| {
			session
				.metadata()
				.map(|tag| tag.duration + tag.fade_duration)
				.filter(|duration| !duration.is_zero())
				.unwrap_or(DEFAULT_DURATION)
		},
		Duration::from_secs,
	)
}

#[allow(clippy::cast_precision_loss)]
fn play(path: &Path, arguments: &CliArguments, sink: &mut Sink) -> Result<()> {
	let mut session = load(path, arguments)?;
	match session.metadata() {
		Some(tag) => info!("Playing {}: \"{}\" from {} by {}", path.display(), tag.title, tag.game, tag.artist),
		None => info!("Playing {}", path.display()),
	}

	let duration = duration(&session, arguments);
	let mut frames_left = duration.as_secs() * u64::from(SAMPLE_RATE) +
		u64::from(duration.subsec_millis()) * u64::from(SAMPLE_RATE) / 1000;
	debug!("{} frames ({:.2?}) to play", frames_left, duration);

	let second = SAMPLE_RATE as usize * BYTES_PER_FRAME;
	let start_time = Instant::now();
	while frames_left > 0 {
		let chunk = usize::try_from(frames_left).map_or(second, |frames| second.min(frames * BYTES_PER_FRAME));
		let cycles_left = arguments.cycles.map(|cycles| cycles.saturating_sub(session.total_cycles()));
		if cycles_left == Some(0) {
			warn!("Cycle limit reached");
			break;
		}
		let audio = session.run(cycles_left, chunk);
		sink.write(&audio)?;
		frames_left = frames_left.saturating_sub((audio.len() / BYTES_PER_FRAME) as u64);
	}

	let elapsed = start_time.elapsed();
	let cycles = session.total_cycles();
	let frequency = cycles as f64 / elapsed.as_secs_f64();
	info!(
		"Ran {} cycles in {:.2?}, {:6.0} kHz, {:5.2}× realtime",
		cycles,
		elapsed,
		frequency / 1000.,
		frequency / CPU_RATE as f64
	);
	Ok(())
}

fn main() -> Result<()> {
	human_panic::setup_panic!(human_panic::metadata!());

	let mut arguments = CliArguments::parse();
	let log_level = match arguments.verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		3 .. => LevelFilter::Trace,
	};
	simple_logger::SimpleLogger::new()
		.with_level(log_level)
		.with_local_timestamps()
		.with_timestamp_format(format_description!(version = 2, "[hour]:[minute]:[second]"))
		.init()?;

	if arguments.shuffle {
		arguments.inputs.shuffle(&mut rand::thread_rng());
	}

	let mut sink = Sink::new(arguments.output.as_deref())?;
	for input in &arguments.inputs {
		play(input, &arguments, &mut sink)?;
	}
	sink.finish()
}
