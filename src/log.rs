/// Trace message for per-instruction and per-register events. Compiled out on release builds; in debug builds the
/// arguments are only formatted if trace logging is enabled.
#[macro_export]
macro_rules! trace {
	($($arg:tt)+) => {
		if cfg!(debug_assertions) && ::log::log_enabled!(::log::Level::Trace) {
			::log::trace!($($arg)+);
		}
	};
}
