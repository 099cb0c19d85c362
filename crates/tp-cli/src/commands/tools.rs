use std::sync::Arc;

use tp_harness::{Session, ToolClient};

/// Print the exposed tools, one per line.
pub async fn run(session: Arc<dyn Session>, require: &[String]) -> anyhow::Result<()> {
    let client = ToolClient::new(session);
    let tools = client.list_available().await?;

    for name in tools.names() {
        println!("{name}");
    }
    println!("\n{} tool(s)", tools.len());

    let required: Vec<&str> = require.iter().map(String::as_str).collect();
    let missing = tools.missing(&required);
    if !missing.is_empty() {
        anyhow::bail!("missing required tool(s): {}", missing.join(", "));
    }
    Ok(())
}
