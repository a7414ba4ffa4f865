//! Storage commands: get, set, rm, keys, reset.
//!
//! Every command goes through the cache synchronizer so that change events
//! are published exactly as a library caller would see them.

use clap::ValueEnum;
use keyloom_cache::CacheSynchronizer;
use keyloom_core::value::{decode_bool, decode_json, decode_number};
use keyloom_core::{BackendId, StorageResult, StoredValue};
use serde_json::json;

use crate::formatter::{OutputFormat, drain_events, print_json};
use crate::theme::Theme;

/// How a value is written or read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum ValueKind {
    /// Stored verbatim.
    #[default]
    Text,
    /// A finite number.
    Number,
    /// `true` or `false`.
    Bool,
    /// Any JSON document.
    Json,
}

/// Turn command-line text into the value to store.
pub(crate) fn parse_value(kind: ValueKind, raw: &str) -> StorageResult<StoredValue> {
    Ok(match kind {
        ValueKind::Text => StoredValue::Text(raw.to_owned()),
        ValueKind::Number => StoredValue::Number(decode_number(raw)?),
        ValueKind::Bool => StoredValue::Bool(decode_bool(raw)?),
        ValueKind::Json => StoredValue::Json(decode_json(raw)?),
    })
}

/// Decode a stored payload as `kind`.
pub(crate) fn decode_payload(kind: ValueKind, payload: &str) -> StorageResult<serde_json::Value> {
    Ok(match kind {
        ValueKind::Text => serde_json::Value::String(payload.to_owned()),
        ValueKind::Number => serde_json::Value::from(decode_number(payload)?),
        ValueKind::Bool => serde_json::Value::Bool(decode_bool(payload)?),
        ValueKind::Json => decode_json(payload)?,
    })
}

pub(crate) async fn get(
    sync: &CacheSynchronizer,
    backend: BackendId,
    key: &str,
    kind: ValueKind,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let value = match sync.cached_read(backend, key).await? {
        Some(payload) => Some(decode_payload(kind, &payload)?),
        None => None,
    };

    if format.is_json() {
        return print_json(&json!({ "backend": backend, "key": key, "value": value }));
    }
    match value {
        Some(serde_json::Value::String(text)) => println!("{text}"),
        Some(other) => println!("{other}"),
        None => println!("{}", Theme::info(&format!("{backend}/{key} is absent"))),
    }
    Ok(())
}

pub(crate) async fn set(
    sync: &CacheSynchronizer,
    backend: BackendId,
    key: &str,
    raw: &str,
    kind: ValueKind,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let value = parse_value(kind, raw)?;
    let mut stream = sync.notifier().stream();
    sync.write(backend, key, value).await?;

    if !format.is_json() {
        println!("{}", Theme::success(&format!("{backend}/{key} written")));
    }
    drain_events(&mut stream, format)?;
    Ok(())
}

pub(crate) async fn remove(
    sync: &CacheSynchronizer,
    backend: BackendId,
    key: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut stream = sync.notifier().stream();
    sync.remove(backend, key).await?;

    if !format.is_json() {
        println!("{}", Theme::success(&format!("{backend}/{key} removed")));
    }
    drain_events(&mut stream, format)?;
    Ok(())
}

pub(crate) async fn keys(
    sync: &CacheSynchronizer,
    backend: BackendId,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let keys = sync.enumerate(backend).await?;

    if format.is_json() {
        return print_json(&json!({ "backend": backend, "keys": keys }));
    }
    if keys.is_empty() {
        println!("{}", Theme::info(&format!("{backend} has no keys")));
    }
    for key in &keys {
        println!("{key}");
    }
    Ok(())
}

pub(crate) async fn reset(
    sync: &CacheSynchronizer,
    backend: BackendId,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut stream = sync.notifier().stream();
    let removed = sync.reset(backend).await?;

    if format.is_json() {
        print_json(&json!({ "backend": backend, "removed": removed }))?;
    } else {
        println!(
            "{}",
            Theme::success(&format!("{backend} cleared, {} key(s) removed", removed.len()))
        );
    }
    drain_events(&mut stream, format)?;
    Ok(())
}
