#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = assessmate_rust::run().await {
        eprintln!("assessmate-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
