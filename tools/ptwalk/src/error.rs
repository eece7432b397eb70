use mmu_walk::RegisterUnavailable;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read image {}: {source}", .path.display())]
    ReadImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Register(#[from] RegisterUnavailable),
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
    #[error("failed to install logger: {0}")]
    Logger(log::SetLoggerError),
}
