#[tokio::main]
async fn main() {
    if let Err(e) = toleranceai_lib::run().await {
        eprintln!("toleranceai: {e}");
        std::process::exit(1);
    }
}
