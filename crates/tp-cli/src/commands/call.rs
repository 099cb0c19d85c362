use std::sync::Arc;

use tp_harness::mcp::ContentItem;
use tp_harness::{Session, ToolCall, ToolCallResult, ToolClient};

use super::parse_args;

pub async fn run(
    session: Arc<dyn Session>,
    tool: &str,
    raw_args: &str,
    expect_error: bool,
) -> anyhow::Result<()> {
    let call = ToolCall::with_raw_arguments(tool, parse_args(raw_args)?);
    let client = ToolClient::new(session);

    let result = if expect_error {
        client.call_expecting_error(call).await?
    } else {
        client.call(call).await?
    };
    print!("{}", render(&result));
    Ok(())
}

/// Text items verbatim, embedded text resources by their inner text.
fn render(result: &ToolCallResult) -> String {
    let mut out = String::new();
    for item in &result.content {
        match item {
            ContentItem::Text { text } => out.push_str(text),
            ContentItem::Resource { resource } => match item.resource_text() {
                Some(text) => out.push_str(text),
                None => out.push_str(&resource.to_string()),
            },
            ContentItem::Image { mime_type, data } => {
                out.push_str(&format!("<{mime_type} image, {} bytes base64>", data.len()));
            }
            ContentItem::Unknown => out.push_str("<unknown content>"),
        }
        out.push('\n');
    }
    out
}
