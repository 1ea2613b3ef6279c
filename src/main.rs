#[tokio::main]
async fn main() -> std::io::Result<()> {
    orrery::frameworks::server::run_with_config().await
}
