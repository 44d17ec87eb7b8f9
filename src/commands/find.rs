use anyhow::bail;

use super::Context;

/// Print the spot and its siblings as JSON. A miss is an error so scripts
/// can branch on the exit code.
pub async fn run(ctx: &Context, spot_id: &str, offline_only: bool) -> anyhow::Result<()> {
    let found = ctx.resolver(!offline_only).resolve_spot(spot_id).await;
    println!("{}", serde_json::to_string_pretty(&found)?);
    if found.spot.is_none() {
        bail!("Spot {spot_id} is not available");
    }
    Ok(())
}
