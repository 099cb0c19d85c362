use std::sync::Arc;
use std::time::Duration;

use tp_harness::load::run_concurrent;
use tp_harness::pacing::Pacer;
use tp_harness::{Session, ToolCall, ToolClient};

use super::parse_args;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub tool: String,
    pub args: String,
    pub workers: usize,
    pub ops: usize,
    pub delay_ms: u64,
}

pub async fn run(session: Arc<dyn Session>, opts: LoadOptions) -> anyhow::Result<()> {
    let call = ToolCall::with_raw_arguments(opts.tool.as_str(), parse_args(&opts.args)?);
    let client = ToolClient::new(session);
    let pacer = Pacer::new(Duration::from_millis(opts.delay_ms));

    tracing::info!(
        tool = %opts.tool,
        workers = opts.workers,
        ops = opts.ops,
        "starting load run"
    );
    let report = run_concurrent(opts.workers, opts.ops, move |_, _| {
        let client = client.clone();
        let call = call.clone();
        async move {
            client.call(call).await?;
            pacer.wait().await;
            Ok(())
        }
    })
    .await?;

    println!("{report}");
    Ok(())
}
