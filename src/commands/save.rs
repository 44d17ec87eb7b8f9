use anyhow::{bail, Context as _};
use tracing::info;

use super::Context;

/// Fetch a location fresh from the content store and save it offline,
/// waiting for its media to finish caching.
pub async fn run(ctx: &Context, location_id: &str) -> anyhow::Result<()> {
    let content = ctx.content()?;

    let Some(location) = content
        .fetch_location(location_id)
        .await
        .context("Failed to fetch location")?
    else {
        bail!("Location {location_id} not found");
    };
    let spots = content
        .fetch_spots(location_id)
        .await
        .context("Failed to fetch spots")?;

    let receipt = ctx
        .cache
        .save_location_for_offline(&location, &spots)
        .await
        .context("Failed to save location for offline use")?;
    println!(
        "Saved {} ({} spots); caching media...",
        location.name, receipt.spot_count
    );

    match receipt.media.await {
        Ok(report) => {
            info!(cached = report.cached, failed = report.failed.len(), "media caching finished");
            println!("Available offline: {}", receipt.location_id);
        }
        Err(e) => bail!("Media caching task failed: {e}"),
    }
    Ok(())
}
