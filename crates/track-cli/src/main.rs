//! Walkthrough: create a user and a fruit, edit the fruit as that user, then
//! rewind and redact its history.

use serde_json::{json, Value};
use track_history::{ForgetScope, ReplayDepth, RevisionSelector};
use track_store::{InMemoryRecordStore, TrackedCollection};
use track_types::{AuthorOverride, PolicyOverride, RecordType, Schema, Snapshot, TrackingPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn fields(value: Value) -> Snapshot {
    match value {
        Value::Object(map) => map,
        _ => Snapshot::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let default = TrackingPolicy::default().merged(&PolicyOverride::from_env());
    let with_author = PolicyOverride {
        author: AuthorOverride { enable: Some(true) },
        ..Default::default()
    };

    let users = TrackedCollection::new(
        RecordType::new("User", Schema::new(), &default, None),
        InMemoryRecordStore::new(),
    );
    let fruits = TrackedCollection::new(
        RecordType::new("Fruit", Schema::new().ignore("sku")?, &default, Some(&with_author)),
        InMemoryRecordStore::new(),
    );

    let user = users.create(fields(json!({ "name": "Steve" })), None).await?;
    let created = fruits
        .create(fields(json!({ "name": "Banana", "color": "yellow", "sku": "b-1" })), None)
        .await?;
    tracing::info!(user_id = %user.id(), fruit_id = %created.id(), "records created");

    let Some(mut fruit) = fruits.load(created.id()).await? else {
        return Err(format!("fruit {} vanished", created.id()).into());
    };
    fruit.set("color", "blue")?;
    fruit.set("sku", "b-2")?;
    fruit.set_author(user.id());
    let edit_id = fruits.save(&mut fruit).await?;

    println!("history of fruit {}:", fruit.id());
    for entry in fruit.history().iter() {
        for change in &entry.changes {
            println!(
                "  [{}] {} author={} path={} before={} after={}",
                entry.id,
                change.kind.code(),
                entry.author.as_deref().unwrap_or("-"),
                change.path,
                change.before.as_ref().map_or_else(|| "-".to_string(), Value::to_string),
                change.after,
            );
        }
    }

    if let Some(edit_id) = edit_id {
        let selector = RevisionSelector::Id(edit_id.clone());
        if let Some((reverted, report)) = fruits.revert(fruit.id(), &selector, ReplayDepth::Shallow).await? {
            println!(
                "reverted {}: color={} applied={} failures={}",
                edit_id,
                reverted.get("color")?,
                report.applied,
                report.failures.len()
            );
        }

        let forgotten = fruits.forget(fruit.id(), &edit_id, ForgetScope::Single).await?;
        println!("forgot {forgotten} entry");
    }

    if let Some(stored) = fruits.load(fruit.id()).await? {
        println!("{}", serde_json::to_string_pretty(stored.record())?);
    }
    Ok(())
}
