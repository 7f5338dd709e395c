use crate::{
    bpe_api::PaymentFlowApi,
    db_types::{NewTransaction, OrderState, PaymentMethod, TransactionStatus},
    events::EventProducers,
    lifecycle::Transition,
    sqlite::SqliteDatabase,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

/// Seeds one merchant and one order in the given state, returning the order id.
async fn seed_order(db: &SqliteDatabase, state: &str) -> i64 {
    sqlx::query(
        "INSERT INTO clients (website_key, secret, return_url, frontend_url) \
         VALUES ('myWebsiteKey', 's3cr3t-k3y', 'https://pay.example.com', 'https://shop.example.com')",
    )
    .execute(db.pool())
    .await
    .expect("Error seeding client");
    sqlx::query_scalar("INSERT INTO orders (client_id, owner_id, state, total) VALUES (1, 7, $1, 2500) RETURNING id")
        .bind(state)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding order")
}

async fn seed_transaction(db: &SqliteDatabase, order_id: i64) -> i64 {
    let new_transaction = NewTransaction::new(order_id, PaymentMethod::Ideal).with_bank_code("ABNANL2A");
    let transaction = db.insert_transaction(new_transaction).await.expect("Error inserting transaction");
    assert_eq!(transaction.status, TransactionStatus::New);
    transaction.id
}

#[tokio::test]
async fn transaction_bookkeeping_and_key_lookups() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;

    db.update_gateway_keys(id, Some("PAYKEY1"), Some("TXKEY1")).await.unwrap();
    let by_payment = db.fetch_transaction_by_payment_key("PAYKEY1").await.unwrap().unwrap();
    assert_eq!(by_payment.id, id);
    let by_transaction = db.fetch_transaction_by_transaction_key("TXKEY1").await.unwrap().unwrap();
    assert_eq!(by_transaction.id, id);

    // A partial reply must not erase keys banked earlier
    db.update_gateway_keys(id, None, None).await.unwrap();
    let transaction = db.fetch_transaction(id).await.unwrap().unwrap();
    assert_eq!(transaction.payment_key.as_deref(), Some("PAYKEY1"));
    assert_eq!(transaction.transaction_key.as_deref(), Some("TXKEY1"));
    assert!(transaction.last_push.is_none());

    db.set_redirect_url(id, "https://testcheckout.buckaroo.nl/html/?brq_payment=abc").await.unwrap();
    db.stamp_last_push(id).await.unwrap();
    let transaction = db.fetch_transaction(id).await.unwrap().unwrap();
    assert_eq!(
        transaction.redirect_url.as_deref(),
        Some("https://testcheckout.buckaroo.nl/html/?brq_payment=abc")
    );
    assert!(transaction.last_push.is_some());
}

#[tokio::test]
async fn successful_payment_completes_the_order() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;

    let transaction = db.apply_transition(id, Transition::Pending).await.unwrap();
    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Pending);

    let transaction = db.apply_transition(id, Transition::Success).await.unwrap();
    assert_eq!(transaction.status, TransactionStatus::Success);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Completed);
}

#[tokio::test]
async fn duplicate_transition_misses_the_compare_and_set() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;
    db.apply_transition(id, Transition::Pending).await.unwrap();
    db.apply_transition(id, Transition::Success).await.unwrap();

    let err = db.apply_transition(id, Transition::Success).await.unwrap_err();
    match err {
        PaymentGatewayError::TransitionNotAllowed(e) => assert_eq!(e.from, TransactionStatus::Success),
        other => panic!("Expected TransitionNotAllowed, got {other:?}"),
    }
    // Neither record regressed
    assert_eq!(db.fetch_transaction(id).await.unwrap().unwrap().status, TransactionStatus::Success);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Completed);
}

#[tokio::test]
async fn cancellation_reopens_the_order() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;
    db.apply_transition(id, Transition::Pending).await.unwrap();

    let transaction = db.apply_transition(id, Transition::Cancelled).await.unwrap();
    assert_eq!(transaction.status, TransactionStatus::Cancelled);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Created);
}

#[tokio::test]
async fn rejected_order_effect_does_not_roll_back_the_transaction() {
    let db = new_db().await;
    // The order never reached pending, so the completion side effect has no valid source state
    let order_id = seed_order(&db, "created").await;
    let id = seed_transaction(&db, order_id).await;
    db.apply_transition(id, Transition::Pending).await.unwrap();

    let transaction = db.apply_transition(id, Transition::Success).await.unwrap();
    assert_eq!(transaction.status, TransactionStatus::Success);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Created);
}

#[tokio::test]
async fn replayed_push_changes_nothing_but_still_stamps() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;
    db.update_gateway_keys(id, Some("PAYKEY1"), None).await.unwrap();
    db.apply_transition(id, Transition::Pending).await.unwrap();

    let api = PaymentFlowApi::new(db.clone(), EventProducers::default());
    let first = api.process_push("PAYKEY1", Some(190)).await.unwrap().unwrap();
    assert_eq!(first.status, TransactionStatus::Success);
    let stamped = db.fetch_transaction(id).await.unwrap().unwrap().last_push.unwrap();

    // The replay misses the compare-and-set, so the record stands, but the push is still recorded
    let replay = api.process_push("PAYKEY1", Some(190)).await.unwrap().unwrap();
    assert_eq!(replay.status, TransactionStatus::Success);
    let transaction = db.fetch_transaction(id).await.unwrap().unwrap();
    assert_eq!(transaction.status, TransactionStatus::Success);
    assert!(transaction.last_push.unwrap() > stamped);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().state, OrderState::Completed);
}

#[tokio::test]
async fn refund_flag_and_client_lookup() {
    let db = new_db().await;
    let order_id = seed_order(&db, "pending").await;
    let id = seed_transaction(&db, order_id).await;

    db.mark_refunded(id).await.unwrap();
    assert!(db.fetch_transaction(id).await.unwrap().unwrap().refunded);

    let order = db.fetch_order(order_id).await.unwrap().unwrap();
    let client = db.fetch_client_for_order(&order).await.unwrap();
    assert_eq!(client.website_key, "myWebsiteKey");
    assert_eq!(client.secret.reveal(), "s3cr3t-k3y");
    assert!(client.test_mode);
}
