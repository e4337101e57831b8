//! Draft command handlers for the CLI.
//!
//! Each handler wires the engine components around one shared store, runs a
//! single flow end-to-end and prints the result as plain tables.

use std::sync::Arc;

use vehdraft_client::DraftApiClient;
use vehdraft_core::{
    load_field_schema, AppConfig, Draft, FieldKind, FieldSchema, FieldValue, IdentifierType,
    SourceStatus,
};
use vehdraft_engine::{
    AutoFillOrchestrator, DraftPersistence, DraftRestore, DraftStore, LookupOutcome,
    PersistenceConfig, ResyncCoordinator, ResyncPhase, RestoreOutcome, SaveOutcome, SaveTrigger,
};

const MISSING: &str = "\u{2014}";

/// Run a lookup and print the fields it certified and the per-source status.
///
/// # Errors
///
/// Returns an error when the lookup fails outright or every source failed.
pub(crate) async fn run_lookup(
    client: DraftApiClient,
    identifier: &str,
    kind: IdentifierType,
) -> anyhow::Result<()> {
    let store = DraftStore::new();
    let orchestrator = AutoFillOrchestrator::new(client, store.clone());

    match orchestrator.lookup(identifier, kind).await {
        LookupOutcome::Applied { state, sources, .. } => {
            println!("lookup {state:?}");
            print_fields(&store.snapshot());
            print_sources(&sources);
            Ok(())
        }
        LookupOutcome::AllSourcesFailed { sources } => {
            print_sources(&sources);
            anyhow::bail!("lookup failed: all services unavailable")
        }
        LookupOutcome::Failed { message, .. } => anyhow::bail!("lookup failed: {message}"),
        LookupOutcome::Superseded => anyhow::bail!("lookup was superseded"),
    }
}

/// Load a saved draft and print its fields, score and photos.
///
/// # Errors
///
/// Returns an error if the field schema cannot be loaded or the draft cannot
/// be restored.
pub(crate) async fn run_restore(
    config: &AppConfig,
    client: DraftApiClient,
    listing_id: &str,
) -> anyhow::Result<()> {
    let schema = Arc::new(load_field_schema(&config.field_schema_path)?);
    let store = DraftStore::new();
    let restore = DraftRestore::new(client, store.clone(), schema);

    if let RestoreOutcome::Restored(summary) = restore.restore(listing_id).await? {
        println!(
            "restored {} ({} fields, {} certified, {} photos)",
            summary.listing_id, summary.field_count, summary.certified_count, summary.photo_count
        );
    }
    let draft = store.snapshot();
    print_fields(&draft);
    print_score(&draft);
    for photo in &draft.photos {
        println!("photo {:>2}  {}", photo.position, photo.url);
    }
    Ok(())
}

/// Apply `name=value` edits to a draft and save it.
///
/// With `listing` the saved draft is restored first and each edit is synced
/// on its own; otherwise a new draft is started, optionally pre-filled from a
/// plate lookup, and the final save creates the listing.
///
/// # Errors
///
/// Returns an error for unknown fields or unparseable values, a failed
/// restore or lookup, or a failed save.
pub(crate) async fn run_edit(
    config: &AppConfig,
    client: DraftApiClient,
    listing: Option<&str>,
    plate: Option<&str>,
    edits: &[String],
) -> anyhow::Result<()> {
    let schema = Arc::new(load_field_schema(&config.field_schema_path)?);
    let parsed = edits
        .iter()
        .map(|raw| parse_edit(raw, &schema))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let store = DraftStore::new();
    if let Some(listing_id) = listing {
        DraftRestore::new(client.clone(), store.clone(), Arc::clone(&schema))
            .restore(listing_id)
            .await?;
    } else if let Some(plate) = plate {
        let orchestrator = AutoFillOrchestrator::new(client.clone(), store.clone());
        if let LookupOutcome::Failed { message, .. } =
            orchestrator.lookup(plate, IdentifierType::Plate).await
        {
            anyhow::bail!("lookup failed: {message}");
        }
    }

    let persistence = DraftPersistence::new(
        client,
        store.clone(),
        PersistenceConfig::from_app_config(config),
    );
    for (name, value) in parsed {
        tracing::debug!(field = %name, "applying edit");
        persistence.update_field(&name, value);
    }
    persistence.flush().await;

    match persistence.save_draft(SaveTrigger::Manual).await? {
        SaveOutcome::Saved { listing_id } => {
            println!("saved {}", listing_id.as_deref().unwrap_or(MISSING));
        }
        other => println!("save skipped: {other:?}"),
    }
    let draft = store.snapshot();
    print_fields(&draft);
    print_score(&draft);
    Ok(())
}

/// Run a lookup, then resync its degraded sources if there are any.
///
/// # Errors
///
/// Returns an error if the initial lookup fails or the resync call itself
/// fails.
pub(crate) async fn run_resync(
    client: DraftApiClient,
    identifier: &str,
    kind: IdentifierType,
) -> anyhow::Result<()> {
    let store = DraftStore::new();
    let orchestrator = Arc::new(AutoFillOrchestrator::new(client, store));
    if let LookupOutcome::Failed { message, .. } = orchestrator.lookup(identifier, kind).await {
        anyhow::bail!("lookup failed: {message}");
    }

    let resync = ResyncCoordinator::new(Arc::clone(&orchestrator));
    let Some(view) = resync.check() else {
        println!("all sources healthy, nothing to resync");
        return Ok(());
    };
    println!("degraded sources:");
    print_sources(&view.degraded);

    match resync.on_resync().await {
        ResyncPhase::Done(result) => {
            println!("resync updated {} fields", result.updated_field_count);
            if !result.failed_adapters.is_empty() {
                println!("still failing: {}", result.failed_adapters.join(", "));
            }
            Ok(())
        }
        ResyncPhase::Error(message) => anyhow::bail!("resync failed: {message}"),
        other => {
            println!("resync ended in {other:?}");
            Ok(())
        }
    }
}

/// Parse one `name=value` edit against the field schema.
///
/// An empty value clears the field. Number fields must hold a JSON number.
pub(crate) fn parse_edit(
    raw: &str,
    schema: &FieldSchema,
) -> anyhow::Result<(String, Option<FieldValue>)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("edit '{raw}' is not of the form name=value"))?;
    let name = name.trim();
    let spec = schema
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("unknown field '{name}'"))?;

    let value = value.trim();
    if value.is_empty() {
        return Ok((name.to_owned(), None));
    }
    let value = match spec.kind {
        FieldKind::Number => {
            let number: serde_json::Number = value
                .parse()
                .map_err(|_| anyhow::anyhow!("field '{name}' expects a number, got '{value}'"))?;
            FieldValue::Number(number)
        }
        FieldKind::Text | FieldKind::Date => FieldValue::from(value),
    };
    Ok((name.to_owned(), Some(value)))
}

fn print_fields(draft: &Draft) {
    if draft.fields.is_empty() {
        println!("no fields");
        return;
    }
    println!("{:<24}{:<28}{:<11}SOURCE", "FIELD", "VALUE", "STATUS");
    for (name, state) in &draft.fields {
        let value = state
            .value
            .as_ref()
            .map_or_else(|| MISSING.to_owned(), ToString::to_string);
        let mut source = state.certified_source().unwrap_or(MISSING).to_owned();
        if let Some(original) = &state.original_certified_value {
            source = format!("{source} (was {original})");
        }
        println!("{name:<24}{value:<28}{:<11}{source}", state.status().to_string());
    }
}

fn print_sources(sources: &[SourceStatus]) {
    println!("{:<16}{:<10}{:<8}ERROR", "ADAPTER", "STATUS", "CACHE");
    for source in sources {
        let status = format!("{:?}", source.status).to_lowercase();
        let cache = source
            .cache_status
            .map_or_else(|| MISSING.to_owned(), |c| format!("{c:?}").to_lowercase());
        println!(
            "{:<16}{status:<10}{cache:<8}{}",
            source.adapter_key,
            source.error_message.as_deref().unwrap_or("")
        );
    }
}

fn print_score(draft: &Draft) {
    let score = draft
        .visibility_score
        .map_or_else(|| MISSING.to_owned(), |s| format!("{s:.1}"));
    let completion = draft
        .completion_percentage
        .map_or_else(|| MISSING.to_owned(), |c| format!("{c:.0}%"));
    println!(
        "visibility {score} ({}), completion {completion}",
        draft.visibility_label.as_deref().unwrap_or(MISSING)
    );
}
