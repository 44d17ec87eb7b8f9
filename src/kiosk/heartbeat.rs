use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::player::PlayerStatus;
use crate::util::now_millis;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub status: &'static str,
    pub kiosk_id: String,
    pub current_spot_id: Option<String>,
    pub timestamp: u64,
}

impl Heartbeat {
    pub fn online(kiosk_id: &str, status: &PlayerStatus) -> Self {
        Self {
            status: "online",
            kiosk_id: kiosk_id.to_string(),
            current_spot_id: status.spot_id.clone(),
            timestamp: now_millis(),
        }
    }
}

/// Report liveness to `url` every `interval` until the task is aborted or
/// the player's status channel closes. Failures are logged and skipped.
pub fn spawn_heartbeat(
    client: reqwest::Client,
    url: String,
    kiosk_id: String,
    interval: Duration,
    mut status: watch::Receiver<PlayerStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let beat = Heartbeat::online(&kiosk_id, &status.borrow_and_update());
            send(&client, &url, &beat).await;
        }
    })
}

async fn send(client: &reqwest::Client, url: &str, beat: &Heartbeat) {
    let response = client
        .post(url)
        .header("User-Agent", "cavetour-kiosk")
        .json(beat)
        .send()
        .await;

    // Network errors are expected on a kiosk; never surface them.
    match response {
        Ok(r) if r.status().is_success() => {}
        Ok(r) => debug!(status = %r.status(), "heartbeat rejected"),
        Err(e) => debug!(%e, "heartbeat failed"),
    }
}
