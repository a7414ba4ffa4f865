//! Output formatting shared by the commands.

use clap::ValueEnum;
use keyloom_events::{ChangeEvent, ChangeReceiver};
use serde::Serialize;

use crate::theme::Theme;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable, colored.
    #[default]
    Pretty,
    /// One JSON document per result.
    Json,
}

impl OutputFormat {
    pub(crate) fn is_json(self) -> bool {
        self == Self::Json
    }
}

/// Print `value` as a single-line JSON document.
pub(crate) fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print one change event.
pub(crate) fn print_event(event: &ChangeEvent, format: OutputFormat) -> anyhow::Result<()> {
    if format.is_json() {
        print_json(&serde_json::json!({ "event": event }))
    } else {
        println!("{}", Theme::event(&event.label()));
        Ok(())
    }
}

/// Print every event already queued on `stream`, returning how many.
pub(crate) fn drain_events(stream: &mut ChangeReceiver, format: OutputFormat) -> anyhow::Result<usize> {
    let mut count = 0usize;
    while let Some(event) = stream.try_recv() {
        print_event(&event, format)?;
        count = count.saturating_add(1);
    }
    Ok(count)
}
