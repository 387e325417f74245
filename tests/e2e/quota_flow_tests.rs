use super::{random_user_id, TestHarness};
use anyhow::Result;
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
#[ignore = "spawns the quota-tracker binary via cargo run"]
async fn test_quota_flow_with_limit_of_three() -> Result<()> {
    let mut harness = TestHarness::with_daily_limit(3).await?;
    harness.start().await?;
    let client = harness.client()?;

    let user_id = random_user_id("user-flow");
    for expected_remaining in [2u64, 1, 0] {
        let decision = client.consume(&user_id).await?;
        assert!(decision.allowed, "consume under the limit should be allowed");
        assert_eq!(decision.remaining, expected_remaining);
    }

    let denied = client.consume(&user_id).await?;
    assert!(!denied.allowed, "fourth request should be denied");
    assert_eq!(denied.remaining, 0);

    let usage = client
        .usage(&user_id)
        .await?
        .expect("usage should exist after consuming");
    assert_eq!(usage.requests_today, 3);
    assert_eq!(usage.requests_total, 3);
    assert_eq!(usage.remaining, 0);

    // Another user is unaffected by the first user's exhausted allowance.
    let other_id = random_user_id("user-flow");
    let other = client.consume(&other_id).await?;
    assert!(other.allowed);
    assert_eq!(other.remaining, 2);

    // On the raw HTTP surface a denial is still a 200 decision, with rate
    // limit headers telling the caller when to come back.
    let url = format!("{}/api/quota/consume", harness.base_url());
    let response = harness
        .http_client()
        .post(&url)
        .json(&json!({ "user_id": user_id }))
        .send()
        .await?;
    assert_eq!(response.status(), 200, "denial should not be an HTTP error");
    let headers = response.headers().clone();
    assert_eq!(
        headers.get("x-ratelimit-limit").and_then(|v| v.to_str().ok()),
        Some("3")
    );
    assert_eq!(
        headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok()),
        Some("0")
    );
    assert!(headers.contains_key("retry-after"));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["allowed"], json!(false));
    assert_eq!(body["remaining"], json!(0));

    harness.cleanup().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "spawns the quota-tracker binary via cargo run"]
async fn test_usage_survives_service_restart() -> Result<()> {
    let mut harness = TestHarness::with_daily_limit(5).await?;
    harness.start().await?;
    let client = harness.client()?;

    let user_id = random_user_id("user-restart");
    for _ in 0..2 {
        let decision = client.consume(&user_id).await?;
        assert!(decision.allowed);
    }

    harness.restart().await?;

    let usage = client
        .usage(&user_id)
        .await?
        .expect("usage should survive a restart");
    assert_eq!(usage.requests_today, 2);
    assert_eq!(usage.requests_total, 2);
    assert_eq!(usage.remaining, 3);

    let decision = client.consume(&user_id).await?;
    assert!(decision.allowed, "count should resume where it left off");
    assert_eq!(decision.remaining, 2);

    harness.cleanup().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "spawns the quota-tracker binary via cargo run"]
async fn test_concurrent_consumers_share_one_allowance() -> Result<()> {
    let mut harness = TestHarness::with_daily_limit(10).await?;
    harness.start().await?;

    let user_id = random_user_id("user-burst");
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let client = harness.client()?;
        let user_id = user_id.clone();
        tasks.push(tokio::spawn(async move {
            let mut allowed = 0u64;
            for _ in 0..5 {
                if client.consume(&user_id).await?.allowed {
                    allowed += 1;
                }
            }
            anyhow::Ok(allowed)
        }));
    }

    let mut total_allowed = 0;
    for task in tasks {
        total_allowed += task.await??;
    }
    assert_eq!(total_allowed, 10, "20 racing requests against a limit of 10");

    let usage = harness
        .client()?
        .usage(&user_id)
        .await?
        .expect("usage should exist after the burst");
    assert_eq!(usage.requests_today, 10);
    assert_eq!(usage.requests_total, 10);
    assert_eq!(usage.remaining, 0);

    harness.cleanup().await?;
    Ok(())
}
