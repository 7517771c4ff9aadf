//! Audio player backed by a local command-line player process.
//!
//! The blob is written to a temp file and handed to the first available of
//! `ffplay`, `mpg123` or `afplay` (or the binary named by `AUDIO_PLAYER`).
//! Pause/resume suspend the process with SIGSTOP/SIGCONT on Unix.
//!
//! Env overrides:
//! - AUDIO_PLAYER, AUDIO_TEMP_DIR, AUDIO_KEEP_FILES

use super::player::{AudioBlob, AudioPlayer, PlaybackTicket};
use super::utils::{gen_id, get_from_env_or_path, get_from_path};
use crate::config::env_string;
use crate::{Result, WaysideError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct ProcessPlayerConfig {
    pub temp_dir: PathBuf,
    pub player_bin: Option<PathBuf>,
    /// Keep the temp audio files after playback ends.
    pub keep_files: bool,
}

impl Default for ProcessPlayerConfig {
    fn default() -> Self {
        let temp_dir = env_string("AUDIO_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let player_bin = get_from_env_or_path("AUDIO_PLAYER", "ffplay")
            .or_else(|| get_from_path("mpg123"))
            .or_else(|| get_from_path("afplay"));
        let keep_files = env_string("AUDIO_KEEP_FILES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            temp_dir,
            player_bin,
            keep_files,
        }
    }
}

struct CurrentPlayback {
    pid: Option<u32>,
    kill_tx: oneshot::Sender<()>,
}

pub struct ProcessPlayer {
    cfg: ProcessPlayerConfig,
    current: Mutex<Option<CurrentPlayback>>,
}

impl ProcessPlayer {
    pub fn new(cfg: Option<ProcessPlayerConfig>) -> Self {
        let cfg = cfg.unwrap_or_default();
        match cfg.player_bin {
            Some(ref p) => info!(target: "audio", bin = ?p, "Detected audio player binary"),
            None => warn!(
                target: "audio",
                "No audio player detected (ffplay/mpg123/afplay missing); audio will be kept on disk"
            ),
        }
        Self {
            cfg,
            current: Mutex::new(None),
        }
    }

    async fn signal_current(&self, signal: &str) -> Result<()> {
        let pid = match self.current.lock().await.as_ref().and_then(|c| c.pid) {
            Some(pid) => pid,
            None => return Ok(()),
        };
        send_signal(pid, signal).await
    }
}

fn player_command(bin: &Path, file: &Path) -> Command {
    let name = bin.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let mut cmd = Command::new(bin);
    match name {
        "ffplay" => {
            cmd.arg("-autoexit")
                .arg("-nodisp")
                .arg("-loglevel")
                .arg("quiet")
                .arg(file);
        }
        "mpg123" => {
            cmd.arg("-q").arg(file);
        }
        _ => {
            cmd.arg(file);
        }
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

#[cfg(unix)]
async fn send_signal(pid: u32, signal: &str) -> Result<()> {
    let status = Command::new("kill")
        .arg(signal)
        .arg(pid.to_string())
        .status()
        .await?;
    if !status.success() {
        return Err(WaysideError::PlaybackError(format!(
            "kill {signal} {pid} exited with {status}"
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
async fn send_signal(_pid: u32, signal: &str) -> Result<()> {
    Err(WaysideError::PlaybackError(format!(
        "{signal} is not supported on this platform"
    )))
}

#[async_trait]
impl AudioPlayer for ProcessPlayer {
    async fn play(&self, audio: AudioBlob, ticket: PlaybackTicket) -> Result<()> {
        self.stop().await?;

        let path = self
            .cfg
            .temp_dir
            .join(format!("wayside_{}.{}", gen_id(), audio.format()));
        tokio::fs::write(&path, audio.data()).await?;
        debug!(target: "audio", path = ?path, bytes = audio.len(), "Wrote audio file");

        let Some(bin) = self.cfg.player_bin.clone() else {
            info!(target: "audio", path = ?path, "No audio player found; kept audio on disk");
            ticket.finished();
            return Ok(());
        };

        let mut child = player_command(&bin, &path).spawn().map_err(|e| {
            WaysideError::PlaybackError(format!("Failed to spawn {}: {}", bin.display(), e))
        })?;
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let keep_files = self.cfg.keep_files;

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(s) if s.success() => ticket.finished(),
                    Ok(s) => ticket.failed(format!("audio player exited with {s}")),
                    Err(e) => ticket.failed(format!("failed to wait for audio player: {e}")),
                },
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!(target: "audio", error = %e, "Failed to kill audio player");
                    }
                }
            }
            if !keep_files {
                let _ = tokio::fs::remove_file(&path).await;
            }
        });

        info!(target: "audio", pid = ?pid, bytes = audio.len(), "Playback started");
        *self.current.lock().await = Some(CurrentPlayback { pid, kill_tx });
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.signal_current("-STOP").await
    }

    async fn resume(&self) -> Result<()> {
        self.signal_current("-CONT").await
    }

    async fn stop(&self) -> Result<()> {
        if let Some(current) = self.current.lock().await.take() {
            debug!(target: "audio", pid = ?current.pid, "Stopping playback");
            // A paused process must be continued for the kill to be reaped promptly.
            if let Some(pid) = current.pid {
                let _ = send_signal(pid, "-CONT").await;
            }
            let _ = current.kill_tx.send(());
        }
        Ok(())
    }
}
