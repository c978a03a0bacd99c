//! `arena challenge ...`

use anyhow::{Context, Result};
use arena_challenge::ChallengeMode;
use arena_schemas::{ChallengeDocument, DateKey};
use arena_store::{CreateOutcome, DocumentStore, PgStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use super::load_config;

/// Print `count` challenges as JSON lines without storing anything.
pub fn generate(
    mode: Option<ChallengeMode>,
    count: u32,
    seed: Option<u64>,
    config_paths: &[String],
) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let mode = mode.unwrap_or(cfg.challenge.mode);
    let strategy = mode
        .strategy(cfg.challenge.synth.clone())
        .with_context(|| format!("build {mode} strategy"))?;

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    for _ in 0..count {
        let c = strategy.generate(&mut rng)?;
        println!("{}", json!({ "question": c.question, "answer": c.answer }));
    }
    Ok(())
}

/// Store the challenge for `date` (default: today in the schedule's zone) in
/// Postgres, unless one is already there.
pub async fn create(date: Option<String>, config_paths: &[String]) -> Result<()> {
    let (_, cfg) = load_config(config_paths)?;
    let pool = arena_store::connect_from_env().await?;
    arena_store::migrate(&pool).await?;
    let store = PgStore::new(pool);

    let key: DateKey = match date {
        Some(raw) => raw.parse()?,
        None => {
            let tz = cfg.schedule.timezone()?;
            let now = store.server_time().await?;
            DateKey::new(now.with_timezone(&tz).date_naive())
        }
    };

    if let Some(existing) = store.get_challenge(&key).await? {
        print_outcome(&key, CreateOutcome::AlreadyExists, &existing);
        return Ok(());
    }

    let strategy = cfg.challenge.mode.strategy(cfg.challenge.synth.clone())?;
    let c = strategy.generate(&mut StdRng::from_entropy())?;
    let doc = ChallengeDocument::new(c.question, c.answer, store.server_time().await?);
    let outcome = store.create_challenge_if_absent(&key, &doc).await?;
    let shown = match outcome {
        CreateOutcome::Created => doc,
        CreateOutcome::AlreadyExists => store.get_challenge(&key).await?.unwrap_or(doc),
    };
    tracing::info!(date_key = %key, outcome = outcome.as_str(), "challenge upsert");
    print_outcome(&key, outcome, &shown);
    Ok(())
}

fn print_outcome(key: &DateKey, outcome: CreateOutcome, doc: &ChallengeDocument) {
    println!("date_key={key}");
    println!("outcome={}", outcome.as_str());
    println!("question={}", doc.question);
    println!("created_at={}", doc.created_at.to_rfc3339());
}
