#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    doc_chat_lib::init_tracing();
    doc_chat_lib::run().await
}
