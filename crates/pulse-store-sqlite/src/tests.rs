//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use pulse_core::{
  reading::{Reading, Sensors},
  store::{InsertOutcome, TimestampStore},
  timestamp::Timestamp,
};

use crate::{Error, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn reading(ts: &str, value: Option<&str>) -> Reading {
  Reading {
    timestamp: ts.parse().unwrap(),
    sensors:   Sensors::from([("sensor_1".to_owned(), value.map(str::to_owned))]),
  }
}

// ─── Insert / get ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get() {
  let s = store().await;
  let r = reading("2017-09-13T13:01:57Z", Some("7"));

  assert_eq!(s.insert(&r).await.unwrap(), InsertOutcome::Inserted);

  let fetched = s.get(r.timestamp).await.unwrap();
  assert_eq!(fetched, Some(r));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  let ts: Timestamp = "2017-09-13T13:01:57Z".parse().unwrap();
  assert!(s.get(ts).await.unwrap().is_none());
}

#[tokio::test]
async fn null_sensor_survives_storage() {
  let s = store().await;
  let r = reading("2017-09-13T13:01:57Z", None);
  s.insert(&r).await.unwrap();

  let fetched = s.get(r.timestamp).await.unwrap().unwrap();
  assert_eq!(fetched.sensors["sensor_1"], None);
}

#[tokio::test]
async fn second_insert_of_a_timestamp_is_a_duplicate() {
  let s = store().await;
  let first = reading("2017-09-13T13:01:57Z", Some("7"));
  let second = reading("2017-09-13T13:01:57Z", Some("8"));

  assert_eq!(s.insert(&first).await.unwrap(), InsertOutcome::Inserted);
  assert_eq!(s.insert(&second).await.unwrap(), InsertOutcome::Duplicate);

  // The original row is untouched.
  let fetched = s.get(first.timestamp).await.unwrap().unwrap();
  assert_eq!(fetched.sensors["sensor_1"].as_deref(), Some("7"));
}

#[tokio::test]
async fn concurrent_inserts_admit_exactly_one() {
  let s = store().await;
  let r = reading("2017-09-13T13:01:57Z", Some("7"));

  let (a, b) = tokio::join!(s.insert(&r), s.insert(&r));
  let outcomes = [a.unwrap(), b.unwrap()];
  assert_eq!(outcomes.iter().filter(|o| **o == InsertOutcome::Inserted).count(), 1);
  assert_eq!(outcomes.iter().filter(|o| **o == InsertOutcome::Duplicate).count(), 1);
}

// ─── Paging ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_are_newest_first() {
  let s = store().await;
  for ts in [
    "2017-09-13T13:01:57Z",
    "2017-09-13T13:01:59Z",
    "2017-09-13T13:01:58Z",
    "2017-09-13T13:02:00Z",
    "2017-09-13T13:02:01Z",
  ] {
    s.insert(&reading(ts, Some("1"))).await.unwrap();
  }

  let first = s.page(1, 2).await.unwrap();
  assert_eq!(first.total, 5);
  let stamps: Vec<String> = first.items.iter().map(|r| r.timestamp.to_string()).collect();
  assert_eq!(stamps, ["2017-09-13T13:02:01Z", "2017-09-13T13:02:00Z"]);
  assert!(!first.has_prev());
  assert!(first.has_next());

  let last = s.page(3, 2).await.unwrap();
  assert_eq!(last.items.len(), 1);
  assert_eq!(last.items[0].timestamp.to_string(), "2017-09-13T13:01:57Z");
  assert!(last.has_prev());
  assert!(!last.has_next());
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
  let s = store().await;
  s.insert(&reading("2017-09-13T13:01:57Z", Some("1"))).await.unwrap();

  let page = s.page(4, 20).await.unwrap();
  assert!(page.items.is_empty());
  assert_eq!(page.total, 1);
}

#[tokio::test]
async fn page_zero_is_treated_as_the_first_page() {
  let s = store().await;
  s.insert(&reading("2017-09-13T13:01:57Z", Some("1"))).await.unwrap();

  let page = s.page(0, 20).await.unwrap();
  assert_eq!(page.page, 1);
  assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn huge_page_number_is_empty() {
  let s = store().await;
  s.insert(&reading("2017-09-13T13:01:57Z", Some("1"))).await.unwrap();

  let page = s.page(usize::MAX / 2, 20).await.unwrap();
  assert!(page.items.is_empty());
  assert_eq!(page.total, 1);
  assert!(!page.has_next());
}

// ─── Timeouts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn call_past_the_deadline_times_out() {
  let s = SqliteStore::open_in_memory_with(StoreOptions {
    timeout: Duration::from_millis(50),
    ..StoreOptions::default()
  })
  .await
  .unwrap();

  let err = s
    .call("sleep", |_| {
      std::thread::sleep(Duration::from_millis(300));
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Timeout { op: "sleep", .. }), "got {err:?}");

  // The connection thread frees up once the slow call finishes.
  tokio::time::sleep(Duration::from_millis(400)).await;
  let ts: Timestamp = "2017-09-13T13:01:57Z".parse().unwrap();
  assert!(s.get(ts).await.unwrap().is_none());
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reopened_file_keeps_readings() {
  let dir = std::env::temp_dir().join(format!("pulse-store-{}", std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("readings.db");

  let r = reading("2017-09-13T13:01:57Z", Some("7"));
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.insert(&r).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.get(r.timestamp).await.unwrap(), Some(r.clone()));
  assert_eq!(s.insert(&r).await.unwrap(), InsertOutcome::Duplicate);
}
