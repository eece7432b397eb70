use log::{LevelFilter, Record, SetLoggerError};
use std::io::{self, Write};

/// Environment variable holding `env_logger` filter directives, e.g. `debug`
/// or `mmu_walk=trace`.
pub const LOG_ENV: &str = "PTWALK_LOG";

/// Install the stderr logger at `warn`, or as configured by [`LOG_ENV`].
///
/// # Errors
/// Fails if another logger is already installed.
pub fn init() -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();

    builder
        .filter_level(LevelFilter::Warn)
        .parse_env(LOG_ENV)
        .format(write_record)
        .try_init()
}

fn write_record<W: Write>(out: &mut W, record: &Record<'_>) -> io::Result<()> {
    writeln!(
        out,
        "[{}] {}: {}",
        record.level(),
        record.target(),
        record.args()
    )
}
