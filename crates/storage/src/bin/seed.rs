use std::fmt;

use chrono::{DateTime, Duration, Utc};
use study_core::model::{Card, CardId, Deck, DeckId, SessionSummary, UserId};
use storage::repository::{NewSessionRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    deck_id: DeckId,
    deck_name: String,
    deck_category: Option<String>,
    cards: u32,
    records: u32,
    user_id: Option<UserId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDeckId { raw: String },
    InvalidCards { raw: String },
    InvalidRecords { raw: String },
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDeckId { raw } => write!(f, "invalid --deck-id value: {raw}"),
            ArgsError::InvalidCards { raw } => write!(f, "invalid --cards value: {raw}"),
            ArgsError::InvalidRecords { raw } => write!(f, "invalid --records value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => {
                write!(f, "invalid --user value (expected UUID): {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut deck_id = std::env::var("STUDY_DECK_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| DeckId::new(1), DeckId::new);
        let mut deck_name =
            std::env::var("STUDY_DECK_NAME").unwrap_or_else(|_| "World Capitals".into());
        let mut deck_category = std::env::var("STUDY_DECK_CATEGORY").ok();
        let mut cards = std::env::var("STUDY_CARDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(6);
        let mut records = std::env::var("STUDY_RECORDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut user_id = std::env::var("STUDY_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--deck-id" => {
                    let value = require_value(&mut args, "--deck-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDeckId { raw: value.clone() })?;
                    deck_id = DeckId::new(parsed);
                }
                "--deck-name" => {
                    let value = require_value(&mut args, "--deck-name")?;
                    deck_name = value;
                }
                "--category" => {
                    let value = require_value(&mut args, "--category")?;
                    deck_category = Some(value);
                }
                "--cards" => {
                    let value = require_value(&mut args, "--cards")?;
                    cards = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCards { raw: value.clone() })?;
                }
                "--records" => {
                    let value = require_value(&mut args, "--records")?;
                    records = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidRecords { raw: value.clone() })?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            deck_id,
            deck_name,
            deck_category,
            cards,
            records,
            user_id,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --deck-id <id>            Deck id to upsert (default: 1)");
    eprintln!("  --deck-name <name>        Deck name (default: World Capitals)");
    eprintln!("  --category <text>         Optional deck category");
    eprintln!("  --cards <n>               Number of sample cards to upsert (default: 6)");
    eprintln!("  --records <n>             Number of session records to append (default: 3)");
    eprintln!("  --user <uuid>             User id for the records (default: random)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  STUDY_DB_URL, STUDY_DECK_ID, STUDY_DECK_NAME, STUDY_DECK_CATEGORY, STUDY_CARDS, STUDY_RECORDS, STUDY_USER_ID"
    );
}

const SAMPLES: [(&str, &str, Option<&[&str]>); 6] = [
    ("Capital of France?", "Paris", None),
    (
        "Capital of Japan?",
        "Tokyo",
        Some(&["Kyoto", "Tokyo", "Osaka"]),
    ),
    ("Capital of Australia?", "Canberra", None),
    (
        "Capital of Canada?",
        "Ottawa",
        Some(&["Toronto", "Ottawa", "Vancouver"]),
    ),
    ("Capital of Brazil?", "Brasilia", None),
    (
        "Capital of Egypt?",
        "Cairo",
        Some(&["Cairo", "Alexandria", "Giza"]),
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let user_id = args.user_id.unwrap_or_else(UserId::random);

    let deck = Deck::new(
        args.deck_id,
        args.deck_name.clone(),
        args.deck_category.clone(),
        now,
    )?;
    storage.decks.upsert_deck(&deck).await?;

    for i in 0..args.cards {
        let (question, answer, options) = SAMPLES[(i as usize) % SAMPLES.len()];
        let id = CardId::new(u64::from(i + 1));
        let card = match options {
            Some(options) => Card::multiple_choice(
                id,
                deck.id(),
                question,
                answer,
                options.iter().map(|s| (*s).to_owned()).collect(),
                now,
            )?,
            None => Card::free_recall(id, deck.id(), question, answer, now)?,
        };
        storage.cards.upsert_card(&card).await?;
    }

    for i in 0..args.records {
        let days_ago = i64::from(i) * 2;
        let reviewed_at = now - Duration::days(days_ago) - Duration::minutes(5);
        let correct = 3 + i % 3;
        let summary = SessionSummary::from_persisted(
            deck.id(),
            args.deck_name.clone(),
            reviewed_at,
            correct,
            2,
        );
        let record = NewSessionRecord::from_summary(&summary, user_id);
        let _ = storage.records.append_record(&record).await?;
    }

    println!(
        "Seeded deck {} with {} cards and {} session records into {}",
        deck.id().value(),
        args.cards,
        args.records,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
