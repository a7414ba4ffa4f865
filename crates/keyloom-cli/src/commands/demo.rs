//! Demo command: the reference scenarios against in-memory backends.

use keyloom_cache::{CacheStats, CacheSynchronizer};
use keyloom_core::{BackendId, ErrorKind, StorageResult};
use serde::Serialize;
use tracing::warn;

use crate::formatter::{OutputFormat, print_event, print_json};
use crate::theme::Theme;

/// Result of one scenario.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScenarioOutcome {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
    pub(crate) passed: bool,
    pub(crate) detail: String,
}

impl ScenarioOutcome {
    fn from_result(
        name: &'static str,
        summary: &'static str,
        result: StorageResult<(bool, String)>,
    ) -> Self {
        let (passed, detail) = result.unwrap_or_else(|e| (false, format!("{} ({})", e, e.kind())));
        Self {
            name,
            summary,
            passed,
            detail,
        }
    }
}

const DEMO_KEY: &str = "demo_mmkv_value";
const TOKEN_KEY: &str = "userToken";

async fn fast_round_trip(sync: &CacheSynchronizer) -> StorageResult<(bool, String)> {
    sync.write(BackendId::Fast, DEMO_KEY, "Hello").await?;
    let value = sync.cached_read(BackendId::Fast, DEMO_KEY).await?;
    Ok((value.as_deref() == Some("Hello"), format!("read back {value:?}")))
}

async fn secure_delete_is_idempotent(sync: &CacheSynchronizer) -> StorageResult<(bool, String)> {
    sync.write(BackendId::Secure, TOKEN_KEY, "tok-1").await?;
    sync.remove(BackendId::Secure, TOKEN_KEY).await?;
    let value = sync.cached_read(BackendId::Secure, TOKEN_KEY).await?;
    sync.remove(BackendId::Secure, TOKEN_KEY).await?;
    Ok((
        value.is_none(),
        format!("read after remove {value:?}, second remove ok"),
    ))
}

async fn secure_refuses_enumeration(sync: &CacheSynchronizer) -> StorageResult<(bool, String)> {
    Ok(match sync.enumerate(BackendId::Secure).await {
        Err(e) if e.kind() == ErrorKind::Unsupported => (true, e.to_string()),
        Err(e) => (false, format!("unexpected error: {e}")),
        Ok(keys) => (false, format!("enumeration returned {} key(s)", keys.len())),
    })
}

async fn concurrent_durable_writes(sync: &CacheSynchronizer) -> StorageResult<(bool, String)> {
    let (a, b) = tokio::join!(
        sync.write(BackendId::Durable, "k", "A"),
        sync.write(BackendId::Durable, "k", "B"),
    );
    a?;
    b?;
    let value = sync.cached_read(BackendId::Durable, "k").await?;
    let passed = matches!(value.as_deref(), Some("A" | "B"));
    Ok((passed, format!("cached read {value:?}")))
}

/// Run scenarios A to D in order.
pub(crate) async fn run_scenarios(sync: &CacheSynchronizer) -> Vec<ScenarioOutcome> {
    vec![
        ScenarioOutcome::from_result(
            "A",
            "fast write then read",
            fast_round_trip(sync).await,
        ),
        ScenarioOutcome::from_result(
            "B",
            "secure write, remove, read, remove again",
            secure_delete_is_idempotent(sync).await,
        ),
        ScenarioOutcome::from_result(
            "C",
            "secure enumeration is unsupported",
            secure_refuses_enumeration(sync).await,
        ),
        ScenarioOutcome::from_result(
            "D",
            "concurrent durable writes, then cached read",
            concurrent_durable_writes(sync).await,
        ),
    ]
}

#[derive(Serialize)]
struct DemoReport<'a> {
    scenarios: &'a [ScenarioOutcome],
    cache: CacheStats,
}

/// Run the demo, printing change events as they are published.
pub(crate) async fn run_demo(sync: &CacheSynchronizer, format: OutputFormat) -> anyhow::Result<()> {
    let _printer = sync.notifier().subscribe_fn("demo-printer", move |event| {
        if let Err(e) = print_event(event, format) {
            warn!(error = %e, "failed to print change event");
        }
    });

    if !format.is_json() {
        println!("{}", Theme::header("Keyloom storage demo"));
        println!("{}", Theme::separator());
    }

    let outcomes = run_scenarios(sync).await;
    let failed = outcomes.iter().filter(|o| !o.passed).count();

    if format.is_json() {
        print_json(&DemoReport {
            scenarios: &outcomes,
            cache: sync.stats(),
        })?;
    } else {
        println!("{}", Theme::separator());
        for outcome in &outcomes {
            let line = format!("{}: {} ({})", outcome.name, outcome.summary, outcome.detail);
            if outcome.passed {
                println!("{}", Theme::success(&line));
            } else {
                println!("{}", Theme::error(&line));
            }
        }
        let stats = sync.stats();
        println!(
            "{}",
            Theme::dimmed(&format!(
                "cache: {} hit(s), {} miss(es), {} invalidation(s), {} entr(ies)",
                stats.hits, stats.misses, stats.invalidations, stats.entries
            ))
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} demo scenario(s) failed");
    }
    Ok(())
}
