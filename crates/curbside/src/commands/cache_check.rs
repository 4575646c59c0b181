//! Cache-check command - scripted exercise of the response cache.
//!
//! Runs the eviction, expiry, stale-while-revalidate and invalidation paths
//! against a cache on a manual clock, prints the outcome of each check and
//! the final statistics, and fails if any check did not hold.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use curbside_cache::{CacheConfig, CacheKey, CacheStats, Error, MemoryCache, SwrOptions, ttl};
use curbside_types::ManualClock;

use super::Context;

/// Arguments for the cache-check command.
#[derive(Args, Debug)]
pub struct CacheCheckArgs {
    /// Capacity of the cache used for the invalidation and stats checks
    /// (default: [cache].max_size from config)
    #[arg(long)]
    pub max_size: Option<usize>,
}

/// Outcome of one scripted check.
#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    checks: Vec<CheckResult>,
    stats: StatsOutput,
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    size: usize,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    hit_rate: f64,
    keys: Vec<String>,
}

impl From<CacheStats> for StatsOutput {
    fn from(stats: CacheStats) -> Self {
        Self {
            size: stats.size,
            capacity: stats.capacity,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate,
            keys: stats.keys,
        }
    }
}

/// Run the cache-check command.
pub async fn run(args: CacheCheckArgs, ctx: &Context) -> Result<()> {
    let max_size = match args.max_size {
        Some(size) => size,
        None => ctx.load_config()?.config.cache().max_size,
    };

    let clock = ManualClock::new(chrono::Utc::now().timestamp_millis().max(0) as u64);

    let mut checks = vec![check_lru(&clock), check_ttl(&clock)];
    checks.push(check_swr(&clock).await);

    let cache = MemoryCache::with_clock(
        CacheConfig::new().with_max_size(max_size),
        clock.shared(),
    );
    checks.push(check_invalidation(&cache).await);
    checks.push(check_hit_rate(&cache));

    let report = Report {
        checks,
        stats: cache.stats().into(),
    };
    let failed = report.checks.iter().filter(|c| !c.passed).count();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if failed > 0 {
        bail!("{} cache check(s) failed", failed);
    }
    Ok(())
}

fn print_report(report: &Report) {
    let green = Style::new().green();
    let red = Style::new().red();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Cache Check").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    for check in &report.checks {
        let mark = if check.passed {
            green.apply_to("✓")
        } else {
            red.apply_to("✗")
        };
        println!("  {} {:<14} {}", mark, check.name, dim.apply_to(&check.detail));
    }

    let stats = &report.stats;
    println!();
    println!("  {} {}/{}", dim.apply_to("Size:"), stats.size, stats.capacity);
    println!(
        "  {} {} hits, {} misses ({:.1}%)",
        dim.apply_to("Reads:"),
        stats.hits,
        stats.misses,
        stats.hit_rate
    );
    println!("  {} {}", dim.apply_to("Evictions:"), stats.evictions);
    println!("  {} {}", dim.apply_to("Keys:"), stats.keys.join(", "));
    println!();
}

/// Capacity two: set a, set b, read a, set c evicts b.
fn check_lru(clock: &ManualClock) -> CheckResult {
    let cache = MemoryCache::with_clock(CacheConfig::new().with_max_size(2), clock.shared());
    cache.set("a", 1u32, ttl::MEDIUM, None);
    cache.set("b", 2, ttl::MEDIUM, None);
    let _ = cache.get("a");
    cache.set("c", 3, ttl::MEDIUM, None);

    let passed = cache.has("a") && !cache.has("b") && cache.has("c") && cache.len() == 2;
    CheckResult::new(
        "lru",
        passed,
        format!("keys after eviction: {}", cache.stats().keys.join(",")),
    )
}

/// An entry read past its TTL is a miss and is removed.
fn check_ttl(clock: &ManualClock) -> CheckResult {
    let cache = MemoryCache::with_clock(CacheConfig::new(), clock.shared());
    cache.set("zone:north", "tuesday".to_string(), Duration::from_secs(1), None);

    let fresh = cache.get("zone:north").is_some();
    clock.advance(Duration::from_millis(1_001));
    let expired = cache.get("zone:north").is_none();

    CheckResult::new(
        "ttl",
        fresh && expired && cache.is_empty(),
        "read after 1001ms of a 1s entry misses",
    )
}

/// Stale reads return the old value and trigger one background fetch.
async fn check_swr(clock: &ManualClock) -> CheckResult {
    let cache: MemoryCache<String> =
        MemoryCache::with_clock(CacheConfig::new(), clock.shared());
    let fetches = Arc::new(AtomicUsize::new(0));
    let options = SwrOptions::new(ttl::LONG, ttl::SHORT);

    let fetch = |value: &'static str| {
        let fetches = Arc::clone(&fetches);
        move || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(value.to_string())
        }
    };

    let cold = cache.with_swr("announcements", fetch("v1"), options.clone()).await;
    clock.advance(Duration::from_secs(30));
    let fresh = cache.with_swr("announcements", fetch("v2"), options.clone()).await;
    let fetches_while_fresh = fetches.load(Ordering::SeqCst);

    clock.advance(Duration::from_secs(60));
    let stale = cache.with_swr("announcements", fetch("v2"), options.clone()).await;

    let mut refreshed = false;
    for _ in 0..100 {
        if cache.get("announcements").as_deref() == Some("v2") {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let passed = matches!(cold.as_deref(), Ok("v1"))
        && matches!(fresh.as_deref(), Ok("v1"))
        && fetches_while_fresh == 1
        && matches!(stale.as_deref(), Ok("v1"))
        && refreshed
        && fetches.load(Ordering::SeqCst) == 2;

    CheckResult::new(
        "swr",
        passed,
        format!("{} fetches, refreshed: {}", fetches.load(Ordering::SeqCst), refreshed),
    )
}

/// Entity-prefix invalidation removes exactly that entity's keys.
async fn check_invalidation(cache: &MemoryCache<String>) -> CheckResult {
    let zones = ["north", "south", "east"];
    for zone in zones {
        let key = CacheKey::new("schedules").part(zone).to_string();
        let _ = cache
            .with_cache(&key, || async move { Ok::<_, Error>(format!("{zone}: weekly")) }, ttl::MEDIUM)
            .await;
    }
    let _ = cache
        .prefetch(
            &CacheKey::new("announcements").to_string(),
            || async { Ok::<_, Error>("holiday schedule".to_string()) },
            ttl::SHORT,
        )
        .await;

    let pattern = CacheKey::new("schedules").entity_pattern();
    let expected = zones.len().min(cache.config().max_size.saturating_sub(1));
    let removed = cache.delete_pattern(&pattern);

    CheckResult::new(
        "invalidation",
        removed == expected && !cache.stats().keys.iter().any(|k| k.starts_with(&pattern)),
        format!("removed {} '{}' entries", removed, pattern),
    )
}

/// Hit rate is the percentage of reads that hit.
fn check_hit_rate(cache: &MemoryCache<String>) -> CheckResult {
    cache.set_default("hit-rate", "probe".to_string());
    let _ = cache.get("hit-rate");
    let _ = cache.get("hit-rate");
    let _ = cache.get("missing");

    let stats = cache.stats();
    let expected = stats.hits as f64 / (stats.hits + stats.misses) as f64 * 100.0;
    CheckResult::new(
        "hit-rate",
        stats.hits >= 2 && (stats.hit_rate - expected).abs() < f64::EPSILON,
        format!("{:.1}%", stats.hit_rate),
    )
}
