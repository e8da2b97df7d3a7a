#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ticket_terminal_lib::run().await
}
