use super::Context;

pub async fn run(ctx: &Context, location_id: Option<&str>) -> anyhow::Result<()> {
    if let Some(id) = location_id {
        if ctx.cache.is_location_available_offline(id).await {
            println!("{id}: available offline");
        } else {
            println!("{id}: not available offline");
        }
        return Ok(());
    }

    let locations = ctx.cache.offline_locations().await;
    if locations.is_empty() {
        println!("No locations saved for offline use");
        return Ok(());
    }
    for loc in locations {
        println!(
            "{:<24} {:<32} {:>4} spots  saved {}",
            loc.id,
            loc.name,
            loc.spot_count,
            loc.timestamp / 1000
        );
    }
    Ok(())
}
