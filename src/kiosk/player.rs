use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::analytics::{AnalyticsEvent, AnalyticsSink};
use super::audio::AudioOutput;
use super::control::ControlMessage;
use super::machine::{Entered, Phase, PlaylistMachine};
use crate::model::KioskMode;
use crate::resolver::PlaylistItem;

/// Progress bar refresh rate.
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

pub const DEFAULT_DISABLED_MESSAGE: &str = "This kiosk is temporarily unavailable.";

/// Inputs the player reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum KioskCommand {
    /// Click/tap anywhere.
    Toggle,
    Control(ControlMessage),
    Shutdown,
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerExit {
    /// Remote restart: the host reloads configuration and starts over.
    Reload,
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Disabled,
}

/// What the presentation layer renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub index: Option<usize>,
    pub spot_id: Option<String>,
    pub title: Option<String>,
    /// Percent of the current item's duration, 0–100.
    pub progress: f64,
    pub message: Option<String>,
}

impl PlayerStatus {
    fn idle() -> Self {
        Self {
            state: PlaybackState::Idle,
            index: None,
            spot_id: None,
            title: None,
            progress: 0.0,
            message: None,
        }
    }
}

/// Identifies the kiosk in analytics events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KioskSession {
    pub kiosk_id: String,
    pub location_id: String,
}

/// Drives a [`PlaylistMachine`] with real timers, audio and analytics.
pub struct KioskPlayer<R> {
    machine: PlaylistMachine<R>,
    session: KioskSession,
    audio: Arc<dyn AudioOutput>,
    analytics: Arc<dyn AnalyticsSink>,
    status: watch::Sender<PlayerStatus>,
}

impl<R: Rng + Send> KioskPlayer<R> {
    pub fn new(
        items: Vec<PlaylistItem>,
        mode: KioskMode,
        rng: R,
        session: KioskSession,
        audio: Arc<dyn AudioOutput>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> (Self, watch::Receiver<PlayerStatus>) {
        let (status, rx) = watch::channel(PlayerStatus::idle());
        let player = Self {
            machine: PlaylistMachine::new(items, mode, rng),
            session,
            audio,
            analytics,
            status,
        };
        (player, rx)
    }

    /// Run until shut down or told to reload. Dropping every command
    /// sender counts as shutdown.
    ///
    /// The receiver is borrowed so the next session can keep reading from
    /// the same inputs after a reload.
    pub async fn run(mut self, commands: &mut mpsc::Receiver<KioskCommand>) -> PlayerExit {
        let mut ticker = tokio::time::interval(PROGRESS_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        match self.machine.start(Instant::now()) {
            Some(entered) => self.on_enter(entered, &mut ticker).await,
            None => {
                info!("kiosk playlist is empty");
                self.publish();
            }
        }

        loop {
            // Both timers derive from the machine's phase on every pass, so a
            // spot change or pause never leaves a stale tick running.
            let deadline = self.machine.deadline();
            tokio::select! {
                _ = sleep_until(deadline) => {
                    if let Some(entered) = self.machine.advance(Instant::now()) {
                        self.on_enter(entered, &mut ticker).await;
                    }
                }
                _ = ticker.tick(), if self.machine.is_playing() => self.publish(),
                command = commands.recv() => match command {
                    Some(KioskCommand::Toggle) => self.toggle(&mut ticker).await,
                    Some(KioskCommand::Control(message)) => {
                        if let Some(exit) = self.apply_control(message, &mut ticker).await {
                            return exit;
                        }
                    }
                    Some(KioskCommand::Shutdown) | None => {
                        self.audio.stop().await;
                        return PlayerExit::Shutdown;
                    }
                },
            }
        }
    }

    async fn on_enter(&mut self, entered: Entered, ticker: &mut Interval) {
        let item = &self.machine.items()[entered.index];
        let spot_id = item.spot.id.clone();
        let audio_url = item.spot.audio_url.clone().filter(|u| !u.trim().is_empty());
        debug!(index = entered.index, %spot_id, "kiosk entering spot");

        self.audio.stop().await;
        if let Some(url) = audio_url {
            if let Err(e) = self.audio.play(&url).await {
                warn!(%spot_id, %e, "narration playback failed");
            }
        }

        let session = &self.session;
        self.emit(AnalyticsEvent::spot_view(
            &session.kiosk_id,
            &session.location_id,
            &spot_id,
        ));
        if let Some(from) = entered.from {
            let from_id = &self.machine.items()[from].spot.id;
            self.emit(AnalyticsEvent::spot_edge(
                &session.kiosk_id,
                &session.location_id,
                from_id,
                &spot_id,
            ));
        }

        ticker.reset();
        self.publish();
    }

    async fn toggle(&mut self, ticker: &mut Interval) {
        match self.machine.toggle(Instant::now()) {
            Some(entered) => self.on_enter(entered, ticker).await,
            None => {
                if matches!(self.machine.phase(), Phase::Paused { .. }) {
                    self.audio.stop().await;
                }
                self.publish();
            }
        }
    }

    async fn apply_control(
        &mut self,
        message: ControlMessage,
        ticker: &mut Interval,
    ) -> Option<PlayerExit> {
        if message.requests_reload() {
            info!("kiosk restart requested");
            self.audio.stop().await;
            return Some(PlayerExit::Reload);
        }

        match message.enabled {
            Some(false) => {
                info!("kiosk disabled remotely");
                self.machine.disable(message.message);
                self.audio.stop().await;
                self.publish();
            }
            Some(true) => {
                if let Some(entered) = self.machine.enable(Instant::now()) {
                    info!("kiosk re-enabled");
                    self.on_enter(entered, ticker).await;
                }
            }
            None => {
                // A bare message only updates the text of a disabled screen.
                if matches!(self.machine.phase(), Phase::Disabled { .. }) {
                    if let Some(text) = message.message {
                        self.machine.disable(Some(text));
                        self.publish();
                    }
                }
            }
        }
        None
    }

    fn emit(&self, event: AnalyticsEvent) {
        let sink = self.analytics.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(event).await {
                warn!(%e, "analytics event dropped");
            }
        });
    }

    fn publish(&self) {
        let now = Instant::now();
        let progress = self.machine.progress(now);
        let status = match self.machine.phase() {
            Phase::Idle => PlayerStatus::idle(),
            Phase::Playing { index, .. } | Phase::Paused { index, .. } => {
                let spot = &self.machine.items()[*index].spot;
                PlayerStatus {
                    state: if self.machine.is_playing() {
                        PlaybackState::Playing
                    } else {
                        PlaybackState::Paused
                    },
                    index: Some(*index),
                    spot_id: Some(spot.id.clone()),
                    title: Some(spot.title.clone()),
                    progress,
                    message: None,
                }
            }
            Phase::Disabled { message } => PlayerStatus {
                state: PlaybackState::Disabled,
                message: Some(
                    message
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DISABLED_MESSAGE.to_string()),
                ),
                ..PlayerStatus::idle()
            },
        };
        self.status.send_replace(status);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kiosk::analytics::testing::RecordingSink;
    use crate::kiosk::audio::testing::RecordingAudio;
    use crate::kiosk::control::ControlAction;
    use crate::model::fixtures::spot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::task::JoinHandle;

    struct Harness {
        tx: mpsc::Sender<KioskCommand>,
        status: watch::Receiver<PlayerStatus>,
        audio: Arc<RecordingAudio>,
        sink: Arc<RecordingSink>,
        handle: JoinHandle<PlayerExit>,
    }

    impl Harness {
        fn index(&self) -> Option<usize> {
            self.status.borrow().index
        }

        fn state(&self) -> PlaybackState {
            self.status.borrow().state
        }
    }

    fn items(n: usize, secs: u64) -> Vec<PlaylistItem> {
        (0..n)
            .map(|i| PlaylistItem {
                spot: spot(&format!("s{i}"), "cave", i as i64),
                duration: Duration::from_secs(secs),
            })
            .collect()
    }

    fn spawn_player(
        items: Vec<PlaylistItem>,
        mode: KioskMode,
        audio: RecordingAudio,
        sink: RecordingSink,
    ) -> Harness {
        let audio = Arc::new(audio);
        let sink = Arc::new(sink);
        let (player, status) = KioskPlayer::new(
            items,
            mode,
            StdRng::seed_from_u64(42),
            KioskSession {
                kiosk_id: "kiosk-1".into(),
                location_id: "cave".into(),
            },
            audio.clone(),
            sink.clone(),
        );
        let (tx, mut rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move { player.run(&mut rx).await });
        Harness {
            tx,
            status,
            audio,
            sink,
            handle,
        }
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_mode_advances_in_order_and_wraps() {
        let h = spawn_player(items(3, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());

        wait(50).await;
        assert_eq!(h.index(), Some(0));
        wait(5_000).await;
        assert_eq!(h.index(), Some(1));
        wait(5_000).await;
        assert_eq!(h.index(), Some(2));
        wait(5_000).await;
        assert_eq!(h.index(), Some(0));
        assert_eq!(h.state(), PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_ticks_while_playing() {
        let h = spawn_player(items(2, 10), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());

        wait(5_050).await;
        let progress = h.status.borrow().progress;
        assert!((45.0..=55.0).contains(&progress), "progress was {progress}");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_advancing_until_resumed() {
        let h = spawn_player(items(2, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());

        wait(2_000).await;
        h.tx.send(KioskCommand::Toggle).await.unwrap();
        wait(50).await;
        assert_eq!(h.state(), PlaybackState::Paused);
        let frozen = h.status.borrow().progress;

        wait(20_000).await;
        assert_eq!(h.index(), Some(0));
        assert_eq!(h.state(), PlaybackState::Paused);
        assert_eq!(h.status.borrow().progress, frozen);

        h.tx.send(KioskCommand::Toggle).await.unwrap();
        wait(4_900).await;
        assert_eq!(h.index(), Some(0));
        assert_eq!(h.state(), PlaybackState::Playing);
        wait(200).await;
        assert_eq!(h.index(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn analytics_records_views_and_edges() {
        let h = spawn_player(items(3, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());

        wait(10_050).await;
        let events = h.sink.events();
        let views: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AnalyticsEvent::SpotView { spot_id, .. } => Some(spot_id.as_str()),
                _ => None,
            })
            .collect();
        let edges: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AnalyticsEvent::SpotEdge { from_spot_id, to_spot_id, .. } => {
                    Some((from_spot_id.as_str(), to_spot_id.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(views, ["s0", "s1", "s2"]);
        assert_eq!(edges, [("s0", "s1"), ("s1", "s2")]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_side_channels_do_not_block_playback() {
        let audio = RecordingAudio {
            fail: true,
            ..Default::default()
        };
        let mut playlist = items(2, 5);
        playlist[0].spot.audio_url = Some("https://cdn.example.com/s0.mp3".into());
        let h = spawn_player(playlist, KioskMode::Loop, audio, RecordingSink::failing());

        wait(5_050).await;
        assert_eq!(h.index(), Some(1));
        assert!(h
            .audio
            .calls()
            .contains(&"play:https://cdn.example.com/s0.mp3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn shuffle_mode_never_repeats_a_spot() {
        let h = spawn_player(items(3, 1), KioskMode::Shuffle, RecordingAudio::default(), RecordingSink::default());

        let mut previous = None;
        wait(10).await;
        for _ in 0..50 {
            let current = h.index();
            assert_ne!(current, previous);
            previous = current;
            wait(1_000).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn remote_disable_and_enable() {
        let h = spawn_player(items(3, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());
        wait(5_050).await;
        assert_eq!(h.index(), Some(1));

        h.tx
            .send(KioskCommand::Control(ControlMessage {
                enabled: Some(false),
                message: Some("Closed for cleaning".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        wait(30_000).await;
        {
            let status = h.status.borrow();
            assert_eq!(status.state, PlaybackState::Disabled);
            assert_eq!(status.message.as_deref(), Some("Closed for cleaning"));
            assert_eq!(status.index, None);
        }
        assert_eq!(h.audio.calls().last().map(String::as_str), Some("stop"));

        h.tx
            .send(KioskCommand::Control(ControlMessage {
                enabled: Some(true),
                ..Default::default()
            }))
            .await
            .unwrap();
        wait(50).await;
        assert_eq!(h.index(), Some(0));
        assert_eq!(h.state(), PlaybackState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_is_ignored_while_disabled() {
        let h = spawn_player(items(2, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());
        h.tx
            .send(KioskCommand::Control(ControlMessage {
                enabled: Some(false),
                ..Default::default()
            }))
            .await
            .unwrap();
        h.tx.send(KioskCommand::Toggle).await.unwrap();
        wait(50).await;

        let status = h.status.borrow().clone();
        assert_eq!(status.state, PlaybackState::Disabled);
        assert_eq!(status.message.as_deref(), Some(DEFAULT_DISABLED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_action_ends_session_with_reload() {
        let h = spawn_player(items(2, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());
        h.tx
            .send(KioskCommand::Control(ControlMessage {
                action: Some(ControlAction::Restart),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(h.handle.await.unwrap(), PlayerExit::Reload);
    }

    #[tokio::test(start_paused = true)]
    async fn force_reload_ends_session_with_reload() {
        let h = spawn_player(items(2, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());
        h.tx
            .send(KioskCommand::Control(ControlMessage {
                force_reload: Some(true),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(h.handle.await.unwrap(), PlayerExit::Reload);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_commands_shuts_down() {
        let Harness { tx, handle, audio, .. } =
            spawn_player(items(2, 5), KioskMode::Loop, RecordingAudio::default(), RecordingSink::default());
        drop(tx);
        assert_eq!(handle.await.unwrap(), PlayerExit::Shutdown);
        assert_eq!(audio.calls().last().map(String::as_str), Some("stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_playlist_idles_without_events() {
        let h = spawn_player(Vec::new(), KioskMode::Shuffle, RecordingAudio::default(), RecordingSink::default());
        wait(60_000).await;
        assert_eq!(h.state(), PlaybackState::Idle);
        assert!(h.sink.events().is_empty());

        h.tx.send(KioskCommand::Shutdown).await.unwrap();
        assert_eq!(h.handle.await.unwrap(), PlayerExit::Shutdown);
    }
}
