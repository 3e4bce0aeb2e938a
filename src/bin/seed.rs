//! Seed binary - fills the catalog with locales, tags and tagged translations
//!
//! Usage:
//!   cargo run --bin seed                # 100 translations across 5 locales
//!   cargo run --bin seed -- 10000 20    # 10000 translations across 20 locales
//!
//! Optional:
//! - DATABASE_URL (defaults to sqlite://translations.db)

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use translation_catalog::{config::Config, translation::NewTranslation, CatalogError, Database};

const LOCALE_CODES: &[&str] = &[
    "en", "fr", "es", "de", "it", "pt", "nl", "sv", "pl", "ja", "zh", "ko", "ar", "ru", "tr",
    "hi", "el", "fi", "da", "no",
];

const TAGS: &[&str] = &["web", "mobile", "desktop", "api", "tablet", "pager"];

const WORDS: &[&str] = &[
    "welcome", "login", "logout", "profile", "settings", "search", "cart", "checkout",
    "payment", "error", "success", "title", "button", "label", "notice", "footer",
];

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seed=info".parse()?)
                .add_directive("translation_catalog=warn".parse()?)
        )
        .init();

    let mut args = std::env::args().skip(1);
    let num_translations: usize = match args.next() {
        Some(v) => v.parse().context("translation count must be a number")?,
        None => 100,
    };
    let num_locales: usize = match args.next() {
        Some(v) => v.parse().context("locale count must be a number")?,
        None => 5,
    };
    let num_locales = num_locales.clamp(1, LOCALE_CODES.len());

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url, config.max_connections)
        .await
        .context("Failed to open database")?;

    let locales = db
        .locales()
        .create_or_retrieve_by_codes(&LOCALE_CODES[..num_locales])
        .await
        .context("Failed to seed locales")?;
    let tags = db
        .tags()
        .create_or_retrieve_by_names(TAGS)
        .await
        .context("Failed to seed tags")?;
    info!("Seeding {} translations across {} locales, {} tags available", num_translations, locales.len(), tags.len());

    // Keys carry the run stamp so repeated runs add rows instead of colliding
    let run = Utc::now().timestamp();
    let store = db.translations();
    let mut created = 0usize;

    for i in 0..num_translations {
        let locale = &locales[i % locales.len()];
        let word = WORDS[i % WORDS.len()];
        let tag_count = 1 + i % 3;
        let tag_names: Vec<String> = (0..tag_count)
            .map(|offset| TAGS[(i + offset) % TAGS.len()].to_string())
            .collect();

        let data = NewTranslation {
            locale_id: locale.id,
            key: format!("{}_{}_{}", word, run, i),
            value: format!("{} text #{} ({})", word, i, locale.code),
            tags: tag_names,
        };

        match store.create(data).await {
            Ok(_) => created += 1,
            Err(CatalogError::Conflict(msg)) => warn!("Skipped: {}", msg),
            Err(e) => return Err(e).context("Failed to seed translation"),
        }

        if (i + 1) % 1000 == 0 {
            info!("{} / {} translations", i + 1, num_translations);
        }
    }

    info!("✓ Seeded {} translations", created);
    Ok(())
}
