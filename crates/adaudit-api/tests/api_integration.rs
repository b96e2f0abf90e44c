//! API integration tests.
//!
//! Drives the router with `oneshot` against an orchestrator on a virtual
//! clock, so resolution timing is controlled by the test.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use adaudit_api::ApiServer;
use adaudit_config::Config;
use adaudit_orchestrator::test_support::manual_orchestrator;
use adaudit_orchestrator::{FixedVerdictProvider, ManualScheduler};
use adaudit_utils::types::Verdict;

struct Harness {
    router: axum::Router,
    scheduler: Arc<ManualScheduler>,
}

fn harness_with(verdict: Verdict, seed: bool) -> Harness {
    let config = if seed {
        Config::builder()
            .seed_demo_materials(true)
            .rng_seed(7)
            .build()
            .expect("valid config")
    } else {
        Config::minimal_for_testing()
    };
    let (orchestrator, scheduler) =
        manual_orchestrator(&config, Arc::new(FixedVerdictProvider::new(verdict)));
    Harness {
        router: ApiServer::new(config, orchestrator).router(),
        scheduler,
    }
}

fn harness() -> Harness {
    harness_with(Verdict::Passed, false)
}

async fn send(router: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };
    let request = builder.body(body).context("build request")?;
    let response = router
        .clone()
        .oneshot(request)
        .await
        .map_err(|err| match err {})?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .context("read body")?;
    let json: Value = serde_json::from_slice(&bytes).context("parse JSON body")?;
    Ok((status, json))
}

async fn get(router: &axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
    send(router, Method::GET, uri, None).await
}

async fn post(router: &axum::Router, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    send(router, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn test_submit_then_poll_until_completed() -> Result<()> {
    let h = harness();
    let (status, body) = post(
        &h.router,
        "/audit",
        json!({"accountId": "acct-1", "materialId": "42", "accessToken": "secret"}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    let task_id = body["data"]["taskId"].as_u64().context("taskId")?;
    assert!(body["data"]["requestTraceId"].as_str().unwrap_or_default().ends_with("_42"));

    let (_, polled) = get(&h.router, &format!("/audit/{task_id}")).await?;
    assert_eq!(polled["data"]["status"], "pending");
    assert_eq!(polled["data"]["verdict"], Value::Null);
    assert!(polled["data"].get("resolvedAt").is_none());

    h.scheduler.advance(Duration::from_secs(5));
    let (_, polled) = get(&h.router, &format!("/audit/{task_id}")).await?;
    assert_eq!(polled["data"]["status"], "completed");
    assert_eq!(polled["data"]["verdict"], "passed");
    assert_eq!(polled["data"]["violations"], json!([]));
    assert!(polled["data"]["resolvedAt"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_failed_verdict_exposes_violations() -> Result<()> {
    let h = harness_with(Verdict::Failed, false);
    let (_, body) = post(&h.router, "/audit", json!({"accountId": "acct-1", "materialId": 7})).await?;
    let task_id = body["data"]["taskId"].as_u64().context("taskId")?;
    h.scheduler.advance(Duration::from_secs(5));

    let (_, polled) = get(&h.router, &format!("/audit/{task_id}")).await?;
    assert_eq!(polled["data"]["verdict"], "failed");
    assert_eq!(
        polled["data"]["violations"],
        json!(["content_violation", "policy_breach"])
    );
    Ok(())
}

#[tokio::test]
async fn test_submit_validation_errors_use_envelope() -> Result<()> {
    let h = harness();
    for body in [
        json!({"materialId": "42"}),
        json!({"accountId": "acct-1"}),
        json!({"accountId": "  ", "materialId": "42"}),
        json!({"accountId": "acct-1", "materialId": "42", "operationKind": "bulk"}),
    ] {
        let (status, envelope) = post(&h.router, "/audit", body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(envelope["code"], 400);
        assert_eq!(envelope["data"], Value::Null);
        assert!(envelope["message"].is_string());
    }

    let (_, results) = get(&h.router, "/audit/results").await?;
    assert_eq!(results["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() -> Result<()> {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/audit")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .context("build request")?;
    let response = h.router.clone().oneshot(request).await.map_err(|err| match err {})?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_malformed_task_ids() -> Result<()> {
    let h = harness();
    let (status, body) = get(&h.router, "/audit/12345").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, body) = get(&h.router, "/audit/not-a-number").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    Ok(())
}

#[tokio::test]
async fn test_batch_scenario() -> Result<()> {
    let h = harness();
    let (status, body) = post(
        &h.router,
        "/audit/batch",
        json!({"accountId": "acct-1", "materialIds": ["2", "5", "8"]}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalCount"], 3);
    assert_eq!(body["data"]["taskIds"].as_array().map(Vec::len), Some(3));

    h.scheduler.advance(Duration::from_secs(5));
    let (_, results) = get(&h.router, "/audit/results?accountId=acct-1").await?;
    assert_eq!(results["data"]["total"], 3);
    let rows = results["data"]["results"].as_array().context("results")?;
    assert_eq!(rows.len(), 3);
    for row in rows {
        assert_eq!(row["taskStatus"], "completed");
    }
    Ok(())
}

#[tokio::test]
async fn test_batch_with_blank_member_is_rejected() -> Result<()> {
    let h = harness();
    let (status, body) = post(
        &h.router,
        "/audit/batch",
        json!({"accountId": "acct-1", "materialIds": ["2", ""]}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = post(&h.router, "/audit/batch", json!({"accountId": "acct-1"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, results) = get(&h.router, "/audit/results").await?;
    assert_eq!(results["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn test_results_filters_and_pagination() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    let (_, all) = get(&h.router, "/audit/results?pageSize=5").await?;
    assert_eq!(all["data"]["total"], 12);
    assert_eq!(all["data"]["pageSize"], 5);
    assert_eq!(all["data"]["results"].as_array().map(Vec::len), Some(5));

    let (_, past_end) = get(&h.router, "/audit/results?page=4&pageSize=5").await?;
    assert_eq!(past_end["data"]["total"], 12);
    assert_eq!(past_end["data"]["results"], json!([]));

    let (_, by_date) = get(&h.router, "/audit/results?date=2024-06-15").await?;
    assert_eq!(by_date["data"]["total"], 1);
    assert_eq!(by_date["data"]["results"][0]["name"], "Summer Sale Banner");

    let (_, nobody) = get(&h.router, "/audit/results?accountId=nobody").await?;
    assert_eq!(nobody["data"]["total"], 0);
    assert_eq!(nobody["data"]["results"], json!([]));

    for bad in [
        "/audit/results?page=0",
        "/audit/results?pageSize=abc",
        "/audit/results?status=unknown",
        "/audit/results?date=June",
    ] {
        let (status, body) = get(&h.router, bad).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["code"], 400);
    }
    Ok(())
}

#[tokio::test]
async fn test_status_filter_after_resolution() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    post(&h.router, "/audit", json!({"accountId": "acct-1", "materialId": "3"})).await?;
    h.scheduler.advance(Duration::from_secs(5));

    let (_, passed) = get(&h.router, "/audit/results?accountId=acct-1&status=passed").await?;
    assert_eq!(passed["data"]["total"], 1);
    assert_eq!(passed["data"]["results"][0]["materialId"], "3");
    assert_eq!(passed["data"]["results"][0]["status"], "approved");

    let (_, failed) = get(&h.router, "/audit/results?accountId=acct-1&status=failed").await?;
    assert_eq!(failed["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn test_stats_and_object_result() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    let (_, stats) = get(&h.router, "/audit/stats").await?;
    assert_eq!(stats["data"]["total"], 12);
    assert_eq!(stats["data"]["approved"], 5);
    assert_eq!(stats["data"]["rejected"], 3);
    assert_eq!(stats["data"]["pending"], 4);
    assert_eq!(stats["data"]["approvalRate"], 41.7);

    let (_, object) = get(&h.router, "/audit/object-result?accountId=client-a&objectId=1").await?;
    assert_eq!(object["data"]["status"], "APPROVE");
    assert!(object["data"]["requestId"].is_string());

    let (_, unknown) = get(&h.router, "/audit/object-result?accountId=a&objectId=999").await?;
    assert_eq!(unknown["data"]["status"], "AUDITING");

    let (status, missing) = get(&h.router, "/audit/object-result?accountId=a").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(missing["code"], 400);
    Ok(())
}

#[tokio::test]
async fn test_material_routes() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    let (_, list) = get(&h.router, "/materials").await?;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(12));
    assert_eq!(list["data"][0]["type"], "image");

    let (_, one) = get(&h.router, "/materials/2").await?;
    assert_eq!(one["data"]["name"], "Product Demo Video");

    let (status, missing) = get(&h.router, "/materials/999").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], 404);
    Ok(())
}

#[tokio::test]
async fn test_registered_material_is_audited_like_a_seeded_one() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    let (status, created) = post(
        &h.router,
        "/materials",
        json!({ "name": "Autumn Banner", "type": "Image", "accountId": "acct-9" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["data"]["id"], "13");
    assert_eq!(created["data"]["type"], "image");
    assert_eq!(created["data"]["status"], "pending");
    assert_eq!(created["data"]["uploader"], "admin");

    let (_, submitted) = post(
        &h.router,
        "/audit",
        json!({ "accountId": "acct-9", "materialId": 13 }),
    )
    .await?;
    assert_eq!(submitted["code"], 0);
    h.scheduler.advance(Duration::from_millis(5_000));

    let (_, material) = get(&h.router, "/materials/13").await?;
    assert_eq!(material["data"]["compliance"], "passed");
    assert_eq!(material["data"]["status"], "approved");
    Ok(())
}

#[tokio::test]
async fn test_register_material_rejects_bad_input() -> Result<()> {
    let h = harness();
    for body in [
        json!({ "type": "video" }),
        json!({ "name": "  ", "type": "video" }),
        json!({ "name": "Clip" }),
        json!({ "name": "Clip", "type": "hologram" }),
    ] {
        let (status, json) = post(&h.router, "/materials", body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], 400);
    }
    let (_, list) = get(&h.router, "/materials").await?;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_material_list_filters_by_account_and_type() -> Result<()> {
    let h = harness_with(Verdict::Passed, true);
    let ids = |json: &Value| -> Vec<String> {
        json["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    let (_, videos) = get(&h.router, "/materials?type=video").await?;
    assert_eq!(ids(&videos), ["2", "5", "8", "11", "12"]);

    let (_, client_videos) =
        get(&h.router, "/materials?accountId=qianchuan-client&type=video").await?;
    assert_eq!(ids(&client_videos), ["2", "11", "12"]);

    let (status, bad) = get(&h.router, "/materials?type=hologram").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(bad["code"], 400);
    Ok(())
}
