// # OVH Provider Real Environment Validation Tool
//
// Runs the four zone operations against the real OVH API and checks the
// outcomes that matter: the TTL floor, validation before any call, minimal
// set-records diffs and idempotence.
//
// NEVER point this at a zone used in production: it creates and deletes
// records at the apex and under `a`, `b`, `ttl0`, `redirect` and
// `_escaped_text`.
//
// ## Usage
//
// ```bash
// ZONECTL_OVH_ENDPOINT=ovh-eu \
// ZONECTL_OVH_APPLICATION_KEY=... \
// ZONECTL_OVH_APPLICATION_SECRET=... \
// ZONECTL_OVH_CONSUMER_KEY=... \
// ZONECTL_TEST_ZONE=sandbox.example.com \
// cargo run -p zonectl-demos --bin ovh_validation
// ```

use std::env;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zonectl_core::traits::{RecordAppender, RecordDeleter, RecordGetter, RecordSetter};
use zonectl_core::{ProviderConfig, ProviderRegistry, Record};

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

fn rec(name: &str, record_type: &str, data: &str, ttl_secs: u64) -> Record {
    Record::new(name, record_type, data, Duration::from_secs(ttl_secs))
}

#[tokio::main]
async fn main() -> DemoResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== OVH Provider Real Environment Validation ===");

    let zone = env::var("ZONECTL_TEST_ZONE").unwrap_or_else(|_| {
        tracing::error!("ZONECTL_TEST_ZONE environment variable is required");
        std::process::exit(1);
    });

    let config = ProviderConfig::ovh_from_env()?;
    tracing::info!("Configuration: {:?}", config);
    tracing::info!("  Zone: {}", zone);

    let registry = ProviderRegistry::new();
    zonectl_provider_ovh::register(&registry);
    let provider = registry.create_provider(&config)?;
    let cancel = CancellationToken::new();

    tracing::info!("--- Step 1: Listing zone records ---");
    let records = provider.get_records(&cancel, &zone).await?;
    for record in &records {
        tracing::info!("  {}", record);
    }
    tracing::info!("✓ {} record(s) listed", records.len());

    tracing::info!("--- Step 2: Appending records ---");
    let appended_input = [
        rec("ttl0", "A", "1.2.3.4", 0),
        rec("redirect", "CNAME", "example.com.", 180),
        rec("_escaped_text", "TXT", r#"quotes " backslashes \000 del: \x7F"#, 180),
    ];
    let appended = provider.append_records(&cancel, &zone, &appended_input).await?;
    for record in &appended {
        tracing::info!("  {}", record);
    }
    if appended.len() != appended_input.len() {
        return Err(format!("appended {} of {} records", appended.len(), appended_input.len()).into());
    }
    if appended[0].ttl < Duration::from_secs(60) {
        return Err("TTL below 60 seconds was accepted".into());
    }
    tracing::info!("✓ Append: OK (TTL floor applied)");

    match provider
        .append_records(&cancel, &zone, &[Record::template("empty", "")])
        .await
    {
        Err(e) if matches!(e, zonectl_core::Error::Validation(_)) => {
            tracing::info!("✓ Record without type rejected: {}", e)
        }
        other => return Err(format!("expected a validation error, got {:?}", other).into()),
    }

    tracing::info!("--- Step 3: Deleting appended records ---");
    let deleted = provider.delete_records(&cancel, &zone, &appended_input).await?;
    for record in &deleted {
        tracing::info!("  {}", record);
    }
    tracing::info!("✓ Delete: {} record(s) removed", deleted.len());

    tracing::info!("--- Step 4: Set records, apex group ---");
    let original = [
        rec("@", "A", "192.0.2.1", 3600),
        rec("@", "A", "192.0.2.2", 3600),
        rec("@", "TXT", "hello world", 3600),
    ];
    provider.set_records(&cancel, &zone, &original).await?;

    let input = [rec("@", "A", "192.0.2.3", 3600)];
    let created = provider.set_records(&cancel, &zone, &input).await?;
    if created.len() != 1 {
        return Err(format!("expected 1 created record, not {}", created.len()).into());
    }
    tracing::info!("✓ Set: replaced the apex A group with one record");

    let again = provider.set_records(&cancel, &zone, &input).await?;
    if !again.is_empty() {
        return Err(format!("second identical set created {} record(s)", again.len()).into());
    }
    tracing::info!("✓ Idempotency verified");

    provider.delete_records(&cancel, &zone, &original).await?;
    provider.delete_records(&cancel, &zone, &input).await?;

    tracing::info!("--- Step 5: Set records, named groups ---");
    let original = [
        rec("a", "AAAA", "2001:db8::1", 3600),
        rec("a", "AAAA", "2001:db8::2", 3600),
        rec("b", "AAAA", "2001:db8::3", 3600),
        rec("b", "AAAA", "2001:db8::4", 3600),
    ];
    provider.set_records(&cancel, &zone, &original).await?;

    let input = [
        rec("a", "AAAA", "2001:db8::1", 3600),
        rec("a", "AAAA", "2001:db8::2", 3600),
        rec("a", "AAAA", "2001:db8::5", 3600),
    ];
    let created = provider.set_records(&cancel, &zone, &input).await?;
    if created.len() != 1 {
        return Err(format!("expected 1 created record, not {}", created.len()).into());
    }
    tracing::info!("✓ Set: only the missing record was created, group b untouched");

    provider.delete_records(&cancel, &zone, &original).await?;
    provider.delete_records(&cancel, &zone, &input).await?;

    tracing::info!("=== Validation Summary ===");
    tracing::info!("✓ Get / Append / Delete: OK");
    tracing::info!("✓ Set-records minimal diff: OK");
    tracing::info!("✓ Security: credentials not logged");

    Ok(())
}
