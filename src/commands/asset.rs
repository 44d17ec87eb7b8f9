use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context as _};

use super::Context;

pub async fn run(ctx: &Context, url: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let Some(response) = ctx.cache.get_cached_asset(url).await else {
        bail!("{url} is not in the offline cache");
    };

    match out {
        Some(path) => {
            tokio::fs::write(path, &response.body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} bytes ({}) to {}",
                response.body.len(),
                response.content_type.as_deref().unwrap_or("unknown type"),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&response.body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
