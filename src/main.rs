use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(error) = billcycle::run().await {
        error!("billcycle exited with error: {}", error);
        std::process::exit(1);
    }
}
