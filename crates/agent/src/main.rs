use fluxtail_agent::runtime::{boot, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    boot::init_logging();
    let (state, pipeline) = boot::boot().await?;
    serve::serve(state, pipeline).await
}
