//! Scheduled-playlist kiosk: a timed state machine, its async driver and
//! the side channels around it (remote control, heartbeat, analytics and
//! narration audio).

pub mod analytics;
pub mod audio;
pub mod control;
pub mod heartbeat;
pub mod machine;
pub mod player;

pub use analytics::{AnalyticsEvent, AnalyticsSink, EventLog};
pub use audio::{AudioOutput, CommandAudio, SilentAudio};
pub use control::{start_control_server, ControlAction, ControlMessage};
pub use heartbeat::spawn_heartbeat;
pub use machine::{Phase, PlaylistMachine};
pub use player::{KioskCommand, KioskPlayer, KioskSession, PlaybackState, PlayerExit, PlayerStatus};
