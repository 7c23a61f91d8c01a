#[tokio::main]
async fn main() -> anyhow::Result<()> {
    web_app_bot::run_from_default_config().await
}
