use serde::{Deserialize, Serialize};

/// A top-level explorable place (cave, heritage site).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mini_map: Option<MiniMap>,
}

/// Overview graph drawn next to the viewer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniMap {
    #[serde(default)]
    pub nodes: Vec<MapNode>,
    #[serde(default)]
    pub edges: Vec<MapEdge>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEdge {
    pub from: String,
    pub to: String,
}

/// How a viewer should present a spot's image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Auto,
    Flat,
    Panorama,
}

/// One viewable point of interest within a location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: String,
    /// Older records still carry the pre-rename `caveId` field.
    #[serde(alias = "caveId")]
    pub location_id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default)]
    pub view_type: ViewType,
    /// Haptic pattern in milliseconds (vibrate, pause, vibrate, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration_pattern: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotspots: Option<Vec<Hotspot>>,
}

/// In-scene marker that navigates to another spot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub position: [f64; 3],
    pub target_spot_id: String,
}

/// The offline bundle of one location plus all of its spots at save time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot {
    pub location: Location,
    pub spots: Vec<Spot>,
    /// Capture time, Unix epoch milliseconds.
    pub timestamp: u64,
}

/// Admin-authored kiosk playlist entry, resolved to a spot at play time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub spot_id: String,
    pub duration_seconds: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KioskMode {
    #[default]
    Loop,
    Shuffle,
}

fn default_true() -> bool {
    true
}

/// Sort spots by ascending display order. Stable, so equal orders keep
/// their stored sequence.
pub fn sort_by_order(spots: &mut [Spot]) {
    spots.sort_by_key(|s| s.order);
}
