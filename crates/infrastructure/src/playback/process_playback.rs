use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use domain::playback::{Playback, PlaybackError};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

struct Session {
    generation: u64,
    stop_tx: oneshot::Sender<()>,
    watchdog: JoinHandle<()>,
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

/// How long a player gets to exit after SIGTERM before it is killed
const KILL_GRACE: Duration = Duration::from_secs(2);

fn lock(sessions: &Sessions) -> MutexGuard<'_, HashMap<String, Session>> {
    sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs an external video player per asset.
///
/// Each player runs in its own process group, so wrapper scripts that fork
/// the real player are stopped along with it. A watchdog task ends the group
/// when the deadline passes or a stop is requested. Playing an asset that is
/// already showing replaces the running instance.
pub struct ProcessPlayback {
    program: String,
    args: Vec<String>,
    sessions: Sessions,
    next_generation: AtomicU64,
}

/// Substitute `{asset}`, `{offset}` (`HH:MM:SS`) and `{layer}` in an argument template
pub fn render_args(template: &[String], asset_id: &str, start_offset: Duration, layer: u8) -> Vec<String> {
    let secs = start_offset.as_secs();
    let offset = format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    template
        .iter()
        .map(|arg| {
            arg.replace("{asset}", asset_id)
                .replace("{offset}", &offset)
                .replace("{layer}", &layer.to_string())
        })
        .collect()
}

impl ProcessPlayback {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Whether a player for `asset_id` is still running
    pub fn is_playing(&self, asset_id: &str) -> bool {
        lock(&self.sessions).contains_key(asset_id)
    }
}

/// Send `signal` to the process group led by `pid`
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    // SAFETY: killpg takes plain integers and touches no memory
    let rc = unsafe { libc::killpg(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// End the player and everything it forked: SIGTERM to the group, then
/// SIGKILL if it has not exited within the grace period.
async fn terminate(child: &mut Child, asset: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        match signal_group(pid, libc::SIGTERM) {
            Ok(()) => {
                if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
                    return;
                }
                warn!(asset = %asset, "Player ignored SIGTERM");
            }
            Err(e) => warn!(asset = %asset, error = %e, "Failed to signal player group"),
        }
        let _ = signal_group(pid, libc::SIGKILL);
    }

    if let Err(e) = child.kill().await {
        warn!(asset = %asset, error = %e, "Failed to kill player");
    }
}

#[async_trait]
impl Playback for ProcessPlayback {
    async fn play(
        &self,
        asset_id: &str,
        start_offset: Duration,
        duration: Duration,
        layer: u8,
    ) -> Result<(), PlaybackError> {
        self.stop(asset_id).await?;

        let args = render_args(&self.args, asset_id, start_offset, layer);
        debug!(program = %self.program, ?args, "Launching player");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| PlaybackError::StartFailed {
                asset: asset_id.to_string(),
                reason: e.to_string(),
            })?;

        info!(asset = %asset_id, layer, duration_secs = duration.as_secs_f64(), "🎬 Player started");

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        // Zero duration plays until stopped or the player exits
        let deadline = (!duration.is_zero()).then(|| Instant::now() + duration);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let sessions = self.sessions.clone();
        let asset = asset_id.to_string();

        // Registered before the watchdog can run, so an instant exit still clears it
        let mut active = lock(&self.sessions);
        let watchdog = tokio::spawn(async move {
            let expired = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let still_running = tokio::select! {
                _ = expired => {
                    debug!(asset = %asset, "Playback deadline reached");
                    true
                }
                _ = stop_rx => true,
                status = child.wait() => {
                    debug!(asset = %asset, ?status, "Player exited");
                    false
                }
            };

            if still_running {
                terminate(&mut child, &asset).await;
            }

            let mut sessions = lock(&sessions);
            if sessions.get(&asset).is_some_and(|s| s.generation == generation) {
                sessions.remove(&asset);
            }
        });

        active.insert(
            asset_id.to_string(),
            Session {
                generation,
                stop_tx,
                watchdog,
            },
        );
        Ok(())
    }

    async fn stop(&self, asset_id: &str) -> Result<(), PlaybackError> {
        let session = lock(&self.sessions).remove(asset_id);
        let Some(session) = session else {
            return Ok(());
        };

        // The watchdog may already be finishing on its own
        let _ = session.stop_tx.send(());
        session
            .watchdog
            .await
            .map_err(|e| PlaybackError::StopFailed {
                asset: asset_id.to_string(),
                reason: e.to_string(),
            })?;

        info!(asset = %asset_id, "⏹️ Player stopped");
        Ok(())
    }
}
