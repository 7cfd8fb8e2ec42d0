//! Probe: active-projects and bids endpoints
//!
//! Hits GET /projects/0.1/projects/active/ with the configured filters and
//! documents:
//! - Response envelope and per-project fields
//! - Latency
//! - The flat key set the dashboard extracts, via dotted-path lookup
//! - The bids listing for the fetched project ids

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use serde_json::Value;

use bidwatch::config::{AppConfig, CONFIG_PATH};
use bidwatch::flatten::pluck;
use bidwatch::{API_BASE, AUTH_HEADER};

/// The key set the dashboard flattens out of each project.
const PROJECT_KEYS: &[&str] = &[
    "id",
    "status",
    "title",
    "seo_url",
    "description",
    "preview_description",
    "jobs.name",
    "currency.code",
    "currency.country",
    "budget.minimum",
    "budget.maximum",
    "bid_stats.bid_count",
    "bid_stats.bid_avg",
    "submitdate",
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load(Path::new(CONFIG_PATH))?;
    let token = config.access_token()?;

    let client = reqwest::Client::new();
    let projects_url = format!("{API_BASE}/projects/0.1/projects/active/");

    println!("=== Probe: active projects ===");
    println!("User: {}", config.account.user_id);
    println!();

    // 1. Fetch a small page of active projects
    println!("--- 1. Fetch active projects (limit=3) ---");
    let start = Instant::now();
    let resp = client
        .get(&projects_url)
        .header(AUTH_HEADER, &token)
        .query(&[
            ("limit", "3"),
            ("full_description", "true"),
            ("job_details", "true"),
            ("compact", "false"),
        ])
        .send()
        .await?;
    let latency = start.elapsed();
    let status = resp.status();
    let body: Value = resp.json().await?;
    println!("Status: {status}");
    println!("Latency: {latency:?}");

    let projects = body
        .get("result")
        .and_then(|r| r.get("projects"))
        .and_then(|p| p.as_array())
        .cloned()
        .unwrap_or_default();
    println!("Project count: {}", projects.len());

    if let Some(first) = projects.first() {
        println!("\nSample project (first):");
        println!("{}", serde_json::to_string_pretty(first)?);
        println!("\nFields present:");
        if let Some(obj) = first.as_object() {
            for key in obj.keys() {
                println!("  - {key}");
            }
        }
    }
    println!();

    // 2. Dotted-path extraction of the dashboard's key set
    println!("--- 2. Flattened key set (first project) ---");
    if let Some(first) = projects.first() {
        for key in PROJECT_KEYS {
            match pluck(first, key) {
                Some(value) => println!("  {key} = {value}"),
                None => println!("  {key} = <missing>"),
            }
        }
    }
    println!();

    // 3. Bids listing restricted to the fetched project ids
    println!("--- 3. Own bids over the fetched projects ---");
    let project_ids: Vec<String> = projects
        .iter()
        .filter_map(|p| p.get("id").and_then(|v| v.as_u64()))
        .map(|id| id.to_string())
        .collect();
    if project_ids.is_empty() {
        println!("No project ids to query bids for.");
    } else {
        let mut query: Vec<(&str, String)> = project_ids
            .iter()
            .map(|id| ("projects[]", id.clone()))
            .collect();
        query.push(("bidders[]", config.account.user_id.to_string()));

        let start = Instant::now();
        let resp = client
            .get(format!("{API_BASE}/projects/0.1/bids/"))
            .header(AUTH_HEADER, &token)
            .query(&query)
            .send()
            .await?;
        let latency = start.elapsed();
        let body: Value = resp.json().await?;
        let bids = body
            .get("result")
            .and_then(|r| r.get("bids"))
            .and_then(|b| b.as_array())
            .cloned()
            .unwrap_or_default();
        println!("Returned {} bid(s) (latency: {latency:?})", bids.len());
        for bid in bids.iter().take(3) {
            let project = pluck(bid, "project_id").unwrap_or(Value::Null);
            let amount = pluck(bid, "amount").unwrap_or(Value::Null);
            println!("  project_id={project} amount={amount}");
        }
    }
    println!();

    println!("=== Probe complete ===");
    Ok(())
}
