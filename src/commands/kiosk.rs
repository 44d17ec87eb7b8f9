use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Context;
use crate::config::{self, KioskConfig};
use crate::kiosk::{
    spawn_heartbeat, start_control_server, AnalyticsSink, AudioOutput, CommandAudio, EventLog,
    KioskCommand, KioskPlayer, KioskSession, PlaybackState, PlayerExit, PlayerStatus, SilentAudio,
};

/// Run kiosk sessions until Ctrl-C. A remote restart reloads the config
/// and starts a fresh session.
pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let ctx = Context::load(config_path)?;
    let kiosk = kiosk_section(&ctx)?;

    let log_dir = config::data_dir()
        .context("Cannot determine a data directory")?
        .join("logs");
    let (events, writer) = EventLog::open(&log_dir)
        .await
        .context("Failed to open analytics log")?;
    let events: Arc<dyn AnalyticsSink> = Arc::new(events);

    let (tx, mut rx) = mpsc::channel::<KioskCommand>(32);
    spawn_stdin_toggle(tx.clone());
    let mut inputs = vec![spawn_ctrl_c(tx.clone())];

    // The listener lives for the whole process; a reload keeps the first address.
    if let Some(addr) = &kiosk.control_addr {
        match start_control_server(addr, tx.clone()).await {
            Ok((bound, handle)) => {
                info!(%bound, "kiosk control listening");
                inputs.push(handle);
            }
            Err(e) => warn!(%addr, %e, "control listener unavailable, continuing without it"),
        }
    }
    drop(tx);

    let mut ctx = ctx;
    let mut kiosk = kiosk;
    loop {
        let exit = run_session(&ctx, &kiosk, events.clone(), &mut rx).await;
        if exit == PlayerExit::Shutdown {
            break;
        }

        info!("reloading kiosk configuration");
        match Context::load(config_path).and_then(|c| kiosk_section(&c).map(|k| (c, k))) {
            Ok((next_ctx, next_kiosk)) => {
                ctx = next_ctx;
                kiosk = next_kiosk;
            }
            Err(e) => warn!(%e, "reload failed, keeping previous configuration"),
        }
    }

    for input in inputs {
        input.abort();
    }
    drop(events);
    let _ = writer.await;
    Ok(())
}

fn kiosk_section(ctx: &Context) -> anyhow::Result<KioskConfig> {
    match &ctx.config.kiosk {
        Some(kiosk) => Ok(kiosk.clone()),
        None => bail!("No kiosk section in the config"),
    }
}

async fn run_session(
    ctx: &Context,
    kiosk: &KioskConfig,
    events: Arc<dyn AnalyticsSink>,
    commands: &mut mpsc::Receiver<KioskCommand>,
) -> PlayerExit {
    let items = ctx.resolver(true).resolve_playlist(&kiosk.playlist).await;
    info!(
        kiosk_id = %kiosk.kiosk_id,
        location_id = %kiosk.location_id,
        items = items.len(),
        mode = ?kiosk.mode,
        "starting kiosk session"
    );

    let audio: Arc<dyn AudioOutput> = match kiosk
        .audio_command
        .as_deref()
        .and_then(CommandAudio::from_command_line)
    {
        Some(command) => Arc::new(command),
        None => Arc::new(SilentAudio),
    };

    let session = KioskSession {
        kiosk_id: kiosk.kiosk_id.clone(),
        location_id: kiosk.location_id.clone(),
    };
    let (player, status) = KioskPlayer::new(
        items,
        kiosk.mode,
        StdRng::from_entropy(),
        session,
        audio,
        events,
    );

    let mut side_tasks = vec![spawn_status_printer(status.clone())];
    if let Some(url) = &kiosk.heartbeat_url {
        side_tasks.push(spawn_heartbeat(
            ctx.client.clone(),
            url.clone(),
            kiosk.kiosk_id.clone(),
            kiosk.heartbeat_interval(),
            status,
        ));
    }

    let exit = player.run(commands).await;
    for task in side_tasks {
        task.abort();
    }
    exit
}

fn spawn_ctrl_c(tx: mpsc::Sender<KioskCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(KioskCommand::Shutdown).await;
        }
    })
}

/// Enter on stdin stands in for a tap on the screen.
///
/// Runs on a detached thread: a pending stdin read cannot be cancelled and
/// must not keep the runtime alive at shutdown.
fn spawn_stdin_toggle(tx: mpsc::Sender<KioskCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() || tx.blocking_send(KioskCommand::Toggle).is_err() {
                break;
            }
        }
    });
}

/// Print a line whenever the visible spot or state changes.
fn spawn_status_printer(mut status: watch::Receiver<PlayerStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shown: Option<(PlaybackState, Option<String>, Option<String>)> = None;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            let key = (current.state, current.spot_id.clone(), current.message.clone());
            if shown.as_ref() == Some(&key) {
                continue;
            }
            println!("{}", describe(&current));
            shown = Some(key);
        }
    })
}

fn describe(status: &PlayerStatus) -> String {
    match status.state {
        PlaybackState::Idle => "[idle] nothing to play".to_string(),
        PlaybackState::Playing | PlaybackState::Paused => {
            let label = if status.state == PlaybackState::Playing {
                "playing"
            } else {
                "paused"
            };
            format!(
                "[{label}] #{} {}",
                status.index.map(|i| i + 1).unwrap_or(0),
                status.title.as_deref().unwrap_or("")
            )
        }
        PlaybackState::Disabled => format!("[disabled] {}", status.message.as_deref().unwrap_or("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_formats_each_state() {
        let playing = PlayerStatus {
            state: PlaybackState::Playing,
            index: Some(1),
            spot_id: Some("s1".into()),
            title: Some("Crystal Lake".into()),
            progress: 0.0,
            message: None,
        };
        assert_eq!(describe(&playing), "[playing] #2 Crystal Lake");

        let disabled = PlayerStatus {
            state: PlaybackState::Disabled,
            index: None,
            spot_id: None,
            title: None,
            progress: 0.0,
            message: Some("Closed".into()),
        };
        assert_eq!(describe(&disabled), "[disabled] Closed");
    }
}
