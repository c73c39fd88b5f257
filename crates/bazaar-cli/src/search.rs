//! `search` and `normalize` subcommand handlers.

use std::fmt::Write as _;

use bazaar_core::AppConfig;
use bazaar_db::PgCatalog;
use bazaar_search::{
    BudgetSpec, LocationSpec, SearchConfig, SearchRequest, SearchResponse, SearchService,
    SortMode, TierResult,
};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Debug, Args)]
pub(crate) struct SearchArgs {
    /// Free-text service query, e.g. "photographer"
    #[arg(short, long)]
    pub query: Option<String>,
    /// Taxonomy id; takes precedence over --query
    #[arg(long)]
    pub service_id: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub area: Option<String>,
    #[arg(long)]
    pub area_id: Option<i64>,
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,
    #[arg(long)]
    pub radius_km: Option<f64>,
    #[arg(long)]
    pub budget_min: Option<Decimal>,
    #[arg(long)]
    pub budget_max: Option<Decimal>,
    /// Only verified vendors
    #[arg(long)]
    pub verified: bool,
    /// Minimum rating (0-5)
    #[arg(long)]
    pub rating: Option<f64>,
    /// relevance, rating, price-low, price-high, or distance
    #[arg(long, value_parser = parse_sort, default_value = "relevance")]
    pub sort: SortMode,
    #[arg(long, default_value = "1")]
    pub page: u32,
    #[arg(long)]
    pub limit: Option<u32>,
    /// Print the full response as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub(crate) fn to_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            service_id: self.service_id.clone(),
            location: LocationSpec {
                city: self.city.clone(),
                area: self.area.clone(),
                area_id: self.area_id,
                latitude: self.lat,
                longitude: self.lng,
                radius_km: self.radius_km,
            },
            budget: BudgetSpec {
                min: self.budget_min,
                max: self.budget_max,
            },
            verified: self.verified.then_some(true),
            rating: self.rating,
            sort: self.sort,
            page: Some(self.page),
            limit: self.limit,
        }
    }
}

pub(crate) fn parse_sort(raw: &str) -> Result<SortMode, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| format!("unknown sort mode '{raw}'"))
}

fn service(pool: sqlx::PgPool, config: &AppConfig) -> SearchService<PgCatalog> {
    SearchService::new(PgCatalog::new(pool), SearchConfig::from_app_config(config))
}

/// # Errors
///
/// Returns an error if the request is invalid, the location cannot be
/// resolved, or a store read fails.
pub(crate) async fn run_search(
    pool: sqlx::PgPool,
    config: &AppConfig,
    args: &SearchArgs,
) -> anyhow::Result<()> {
    let response = service(pool, config).search(args.to_request()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_response(&response));
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded.
pub(crate) async fn run_normalize(
    pool: sqlx::PgPool,
    config: &AppConfig,
    query: &str,
) -> anyhow::Result<()> {
    let result = service(pool, config).normalize_query(query).await?;

    match &result.best_match {
        Some(best) => println!(
            "best match: {} ({}) confidence {:.2}{}",
            best.taxonomy_id,
            best.level,
            result.confidence,
            if result.is_low_confidence() {
                " [low]"
            } else {
                ""
            }
        ),
        None => println!("no taxonomy match for '{query}'"),
    }

    if result.matches().next().is_some() {
        println!();
        println!("{:<12}{:<26}{:>6}  NAME", "LEVEL", "ID", "SCORE");
        for m in result.matches() {
            println!(
                "{:<12}{:<26}{:>6}  {}",
                m.level.as_str(),
                m.taxonomy_id,
                m.score,
                m.name
            );
        }
    }
    Ok(())
}

fn fmt_distance(result: &TierResult) -> String {
    result
        .distance_km
        .map_or_else(|| "-".to_string(), |d| format!("{d:.2}"))
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max - 3).collect::<String>())
    } else {
        value.to_string()
    }
}

/// Tier table followed by a one-line summary and any degradations.
pub(crate) fn render_response(response: &SearchResponse) -> String {
    let mut out = String::new();
    let meta = &response.metadata;

    if response.results.is_empty() {
        let _ = writeln!(out, "no vendors found");
    } else {
        let _ = writeln!(
            out,
            "{:<15}{:<8}{:<26}{:<14}{:>9}{:>8}  PRICE",
            "TIER", "ID", "NAME", "AREA", "DIST KM", "RATING"
        );
        for result in &response.results {
            let vendor = &result.vendor;
            let _ = writeln!(
                out,
                "{:<15}{:<8}{:<26}{:<14}{:>9}{:>8.1}  {}-{}",
                result.match_tier.as_str(),
                vendor.id,
                truncate(&vendor.name, 24),
                truncate(vendor.area.as_deref().unwrap_or("-"), 12),
                fmt_distance(result),
                vendor.rating,
                vendor.pricing.min,
                vendor.pricing.max
            );
        }
    }

    let breakdown = &meta.tier_breakdown;
    let _ = writeln!(
        out,
        "\npage {}/{} of {} result(s): exact_area={} nearby={} same_city={} adjacent_city={} radius={}km",
        response.page,
        response.total_pages.max(1),
        response.total,
        breakdown.exact_area,
        breakdown.nearby,
        breakdown.same_city,
        breakdown.adjacent_city,
        meta.radius_used_km
    );
    for degradation in &meta.degradations {
        if let Ok(json) = serde_json::to_string(degradation) {
            let _ = writeln!(out, "degraded: {json}");
        }
    }
    out
}
