use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::config::PlayerConfig;
use crate::player::PlayerError;

/// How a player process ended on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// Clean exit, i.e. the track played to the end.
    Finished,
    Lost(String),
}

/// A running external player.
#[async_trait::async_trait]
pub trait PlayerProcess: Send {
    fn suspend(&mut self) -> Result<(), PlayerError>;

    fn resume(&mut self) -> Result<(), PlayerError>;

    /// Asks the process to exit, waits up to `grace`, then kills it.
    async fn terminate(&mut self, grace: Duration) -> Result<(), PlayerError>;

    /// Resolves when the process exits by itself. Must be cancel safe.
    async fn wait(&mut self) -> ProcessExit;
}

pub trait PlayerLauncher: Send + Sync {
    fn spawn(&self, stream_locator: &str) -> Result<Box<dyn PlayerProcess>, PlayerError>;
}

/// Launches the configured command line player (ffplay by default).
pub struct CommandLauncher {
    command: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

impl PlayerLauncher for CommandLauncher {
    fn spawn(&self, stream_locator: &str) -> Result<Box<dyn PlayerProcess>, PlayerError> {
        let program =
            find_player(&self.command).ok_or_else(|| PlayerError::PlayerNotFound(self.command.clone()))?;

        let child = Command::new(&program)
            .args(&self.args)
            .arg(stream_locator)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlayerError::SpawnFailed {
                command: program.display().to_string(),
                source,
            })?;

        tracing::debug!(pid = ?child.id(), "Spawned {}", program.display());
        Ok(Box::new(ChildProcess {
            child,
            suspended: false,
        }))
    }
}

/// Full path of `command`, looking in `PATH` first and then in the usual
/// Homebrew prefixes on macOS.
pub fn find_player(command: &str) -> Option<PathBuf> {
    if let Ok(path) = which::which(command) {
        return Some(path);
    }

    if cfg!(target_os = "macos") {
        return ["/opt/homebrew/bin", "/usr/local/bin"]
            .iter()
            .map(|dir| Path::new(dir).join(command))
            .find(|path| path.is_file());
    }

    None
}

struct ChildProcess {
    child: Child,
    suspended: bool,
}

impl ChildProcess {
    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> Result<(), PlayerError> {
        // Already reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        // SAFETY: `pid` is our own child and has not been reaped, so it cannot have been reused.
        let result = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if result == 0 {
            Ok(())
        } else {
            Err(PlayerError::Signal(std::io::Error::last_os_error()))
        }
    }
}

#[async_trait::async_trait]
impl PlayerProcess for ChildProcess {
    #[cfg(unix)]
    fn suspend(&mut self) -> Result<(), PlayerError> {
        self.signal(libc::SIGSTOP)?;
        self.suspended = true;
        Ok(())
    }

    #[cfg(not(unix))]
    fn suspend(&mut self) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported)
    }

    #[cfg(unix)]
    fn resume(&mut self) -> Result<(), PlayerError> {
        self.signal(libc::SIGCONT)?;
        self.suspended = false;
        Ok(())
    }

    #[cfg(not(unix))]
    fn resume(&mut self) -> Result<(), PlayerError> {
        Err(PlayerError::Unsupported)
    }

    async fn terminate(&mut self, grace: Duration) -> Result<(), PlayerError> {
        #[cfg(unix)]
        {
            // A stopped process only acts on SIGTERM once continued.
            if self.suspended {
                self.signal(libc::SIGCONT)?;
                self.suspended = false;
            }
            self.signal(libc::SIGTERM)?;

            if tokio::time::timeout(grace, self.child.wait()).await.is_ok() {
                return Ok(());
            }
            tracing::warn!("Player ignored SIGTERM for {:?}, killing it", grace);
        }
        #[cfg(not(unix))]
        let _ = grace;

        self.child.kill().await.map_err(PlayerError::Signal)
    }

    async fn wait(&mut self) -> ProcessExit {
        match self.child.wait().await {
            Ok(status) if status.success() => ProcessExit::Finished,
            Ok(status) => ProcessExit::Lost(format!("player exited with {}", status)),
            Err(e) => ProcessExit::Lost(format!("failed to wait for player: {}", e)),
        }
    }
}
