#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cavetour_lib::run().await
}
