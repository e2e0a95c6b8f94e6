//! Background process management for long-running commands.
//!
//! Used for `rollout cleanup --every`, which runs until interrupted.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// A background process handle; the process is killed on drop.
pub struct BackgroundProcess {
    child: Child,
}

impl BackgroundProcess {
    /// Spawn a new background process with stdout and stderr discarded.
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        let child = command.spawn()?;
        Ok(Self { child })
    }

    /// Whether the process is still running.
    pub fn is_running(&mut self) -> std::io::Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Wait for the process to exit with a timeout.
    pub fn wait_timeout(
        &mut self,
        timeout: Duration,
    ) -> std::io::Result<Option<std::process::ExitStatus>> {
        let start = std::time::Instant::now();
        loop {
            match self.child.try_wait()? {
                Some(status) => return Ok(Some(status)),
                None => {
                    if start.elapsed() > timeout {
                        return Ok(None);
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }

    /// Kill the process.
    pub fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill()
    }
}

impl Drop for BackgroundProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll `check` every `interval` until it returns true or `timeout` passes.
pub fn wait_until<F>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        std::thread::sleep(interval);
    }
    check()
}
