//! Parallel combat creation against an on-disk database

mod common;

use common::CampaignTest;
use futures_util::future::join_all;
use serde_json::{json, Value};
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_leave_one_active() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("campaign.db");
    let app = CampaignTest::start_with_db(Some(db_path.to_string_lossy().into_owned()))
        .await
        .expect("Failed to start server");

    let requests = (0..8).map(|i| {
        let app = &app;
        async move {
            app.post("/combats", &json!({ "name": format!("Encounter {}", i) }))
                .await
                .unwrap()
                .status()
        }
    });
    let statuses = join_all(requests).await;
    assert!(statuses.iter().all(|s| *s == 201), "statuses: {:?}", statuses);

    let combats: Value = app.get("/combats").await.unwrap().json().await.unwrap();
    let combats = combats.as_array().unwrap();
    assert_eq!(combats.len(), 8);
    assert_eq!(
        combats.iter().filter(|c| c["isActive"] == true).count(),
        1
    );
}
