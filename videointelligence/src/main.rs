#[tokio::main]
async fn main() -> eyre::Result<()> {
    videointelligence::App::new().run().await
}
