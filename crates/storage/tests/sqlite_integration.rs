use chrono::Duration;
use study_core::model::{Card, CardId, Deck, DeckId, SessionSummary, UserId};
use study_core::time::fixed_now;
use storage::repository::{
    CardRepository, DeckRepository, NewSessionRecord, SessionRecordRepository,
};
use storage::sqlite::SqliteRepository;

fn build_deck(id: u64, name: &str) -> Deck {
    Deck::new(DeckId::new(id), name, Some("Geography".into()), fixed_now()).unwrap()
}

fn build_record(deck: &Deck, user_id: UserId, days_ago: i64, correct: u32) -> NewSessionRecord {
    let summary = SessionSummary::from_persisted(
        deck.id(),
        deck.name(),
        fixed_now() - Duration::days(days_ago),
        correct,
        2,
    );
    NewSessionRecord::from_summary(&summary, user_id)
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_card_kinds() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_cards?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let deck = build_deck(1, "Capitals");
    repo.upsert_deck(&deck).await.unwrap();

    let recall = Card::free_recall(
        CardId::new(1),
        deck.id(),
        "Capital of France?",
        "Paris",
        fixed_now(),
    )
    .unwrap();
    let choice = Card::multiple_choice(
        CardId::new(2),
        deck.id(),
        "Capital of Japan?",
        "Tokyo",
        vec!["Kyoto".into(), "Tokyo".into()],
        fixed_now(),
    )
    .unwrap();
    repo.upsert_card(&recall).await.unwrap();
    repo.upsert_card(&choice).await.unwrap();

    let fetched = repo.list_cards(deck.id()).await.expect("fetch");
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0], recall);
    assert_eq!(fetched[1], choice);
    assert_eq!(fetched[1].correct_option_index(), Some(1));

    let loaded_deck = repo.get_deck(deck.id()).await.unwrap().expect("deck");
    assert_eq!(loaded_deck, deck);
    assert_eq!(repo.list_decks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_records_listing_and_latest() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_records?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let deck_a = build_deck(1, "Capitals");
    let deck_b = build_deck(2, "Chemistry");
    repo.upsert_deck(&deck_a).await.unwrap();
    repo.upsert_deck(&deck_b).await.unwrap();

    let user = UserId::random();
    let other_user = UserId::random();

    repo.append_record(&build_record(&deck_a, user, 6, 3))
        .await
        .unwrap();
    let newest_a = repo
        .append_record(&build_record(&deck_a, user, 1, 4))
        .await
        .unwrap();
    let only_b = repo
        .append_record(&build_record(&deck_b, other_user, 2, 5))
        .await
        .unwrap();

    // Newest first with the range filter applied.
    let rows = repo
        .list_records(
            deck_a.id(),
            Some(fixed_now() - Duration::days(3)),
            Some(fixed_now()),
            10,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, newest_a);
    assert_eq!(rows[0].summary.correct(), 4);
    assert!((rows[0].summary.score_percentage() - 4.0 / 6.0 * 100.0).abs() < 1e-9);

    let user_rows = repo
        .list_records_for_user(user, None, None, 10)
        .await
        .unwrap();
    assert_eq!(user_rows.len(), 2);
    assert!(user_rows.iter().all(|row| row.user_id == user));

    let latest = repo
        .list_latest_records(&[deck_a.id(), deck_b.id()])
        .await
        .unwrap();
    assert_eq!(latest.len(), 2);
    let ids: Vec<i64> = latest.iter().map(|row| row.id).collect();
    assert!(ids.contains(&newest_a));
    assert!(ids.contains(&only_b));

    let fetched = repo.get_record(newest_a).await.unwrap();
    assert_eq!(fetched.summary.deck_name(), "Capitals");
    assert_eq!(fetched.user_id, user);
}
