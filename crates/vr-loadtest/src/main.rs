use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use clap::Parser;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{info, warn};
use vr_models::{RESOURCE_CODE_PARAM, VR_INFO_PATH};

#[derive(Parser, Debug, Clone)]
#[command(name = "vr-loadtest")]
#[command(about = "Concurrent request generator for the VR proxy")]
struct Args {
    #[arg(long, default_value = "http://localhost:3000")]
    proxy_url: String,

    /// Resource codes to cycle through.
    #[arg(long = "resource-code", default_values_t = vec!["demo".to_string()])]
    resource_codes: Vec<String>,

    #[arg(long, default_value_t = 200)]
    requests: usize,

    #[arg(long, default_value_t = 32)]
    concurrency: usize,

    #[arg(long, default_value_t = 5)]
    preflight_timeout_seconds: u64,

    #[arg(long, default_value_t = false)]
    skip_preflight: bool,
}

#[derive(Default)]
struct Metrics {
    /// HTTP status → count. Transport failures are recorded under `0`.
    statuses: Mutex<BTreeMap<u16, u64>>,
    latencies_us: Mutex<Vec<u64>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.resource_codes.is_empty() {
        return Err(anyhow!("at least one --resource-code is required"));
    }

    let client = reqwest::Client::new();

    if args.skip_preflight {
        info!("preflight skipped");
    } else {
        preflight(&client, &args).await?;
        info!("preflight OK");
    }

    println!(
        "Starting load test: requests={}, concurrency={}, codes={:?}",
        args.requests, args.concurrency, args.resource_codes
    );

    let metrics = Arc::new(Metrics::default());
    let url = format!("{}{VR_INFO_PATH}", args.proxy_url.trim_end_matches('/'));
    let started = Instant::now();

    futures::stream::iter(0..args.requests)
        .map(|i| {
            let client = client.clone();
            let url = url.clone();
            let code = args.resource_codes[i % args.resource_codes.len()].clone();
            let metrics = metrics.clone();
            async move { run_request(&client, &url, &code, &metrics).await }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect::<Vec<()>>()
        .await;

    report_metrics(started.elapsed(), &metrics).await;
    Ok(())
}

async fn preflight(client: &reqwest::Client, args: &Args) -> Result<()> {
    let url = format!("{}/healthz", args.proxy_url.trim_end_matches('/'));
    let res = client
        .get(&url)
        .timeout(Duration::from_secs(args.preflight_timeout_seconds))
        .send()
        .await
        .map_err(|e| anyhow!("preflight failed: proxy at {url} unreachable: {e}"))?;
    if !res.status().is_success() {
        return Err(anyhow!("preflight failed: {url} returned {}", res.status()));
    }
    Ok(())
}

async fn run_request(client: &reqwest::Client, url: &str, code: &str, metrics: &Metrics) {
    let sent_at = Instant::now();
    let status = match client
        .get(url)
        .query(&[(RESOURCE_CODE_PARAM, code)])
        .send()
        .await
    {
        Ok(res) => {
            let status = res.status().as_u16();
            // Drain the body so the latency covers the full response.
            if let Err(e) = res.bytes().await {
                warn!(error = %e, "failed to read response body");
            }
            status
        }
        Err(e) => {
            warn!(error = %e, "request failed");
            0
        }
    };

    let elapsed_us = u64::try_from(sent_at.elapsed().as_micros()).unwrap_or(u64::MAX);
    metrics.latencies_us.lock().await.push(elapsed_us);
    *metrics.statuses.lock().await.entry(status).or_insert(0) += 1;
}

async fn report_metrics(elapsed: Duration, metrics: &Metrics) {
    let statuses = metrics.statuses.lock().await.clone();
    let mut latencies = metrics.latencies_us.lock().await.clone();
    latencies.sort_unstable();

    let p = |q: f64| -> u64 {
        if latencies.is_empty() {
            return 0;
        }
        let idx = ((latencies.len() - 1) as f64 * q).round() as usize;
        latencies[idx]
    };

    let avg = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    let rps = latencies.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("\n=== Load test report ===");
    println!("completed={} elapsed={:.2}s throughput={:.2} req/s", latencies.len(), elapsed.as_secs_f64(), rps);
    for (status, count) in &statuses {
        if *status == 0 {
            println!("  transport_error: {count}");
        } else {
            println!("  status {status}: {count}");
        }
    }
    println!(
        "latency_us: count={} avg={:.1} p50={} p95={} p99={} max={}",
        latencies.len(),
        avg,
        p(0.50),
        p(0.95),
        p(0.99),
        latencies.last().copied().unwrap_or(0),
    );
    if statuses.keys().all(|s| *s >= 500 || *s == 0) && !statuses.is_empty() {
        println!(
            "diagnostic: no request succeeded. Check that vr-proxy is running and the gateway credentials are set."
        );
    }
}
