use anyhow::Context as _;

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    ctx.cache
        .clear_offline_cache()
        .await
        .context("Failed to clear offline cache")?;
    println!("Offline cache cleared");
    Ok(())
}
