//! Redirection of the process's standard output and error to a file.

use snafu::prelude::*;
use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{OpenStdoutFileSnafu, RedirectError};

/// Point stdout and stderr at `path`, opened for appending.
///
/// Returns `Ok(false)` on platforms without file descriptor redirection.
pub fn redirect_output(path: &Path) -> Result<bool, RedirectError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(OpenStdoutFileSnafu { path })?;

    #[cfg(unix)]
    {
        use crate::error::DupSnafu;
        use nix::libc::{STDERR_FILENO, STDOUT_FILENO};
        use nix::unistd::dup2;
        use std::io::Write;
        use std::os::unix::io::AsRawFd;
        use tracing::info;

        info!("Redirecting stdout and stderr to {}", path.display());
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        let fd = file.as_raw_fd();
        dup2(fd, STDOUT_FILENO)
            .map_err(std::io::Error::from)
            .context(DupSnafu {
                stream: "stdout",
                path,
            })?;
        dup2(fd, STDERR_FILENO)
            .map_err(std::io::Error::from)
            .context(DupSnafu {
                stream: "stderr",
                path,
            })?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        drop(file);
        Ok(false)
    }
}
