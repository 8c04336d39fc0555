//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::Config;
use crate::engine::EnhancedCalculator;
use carbonlens_core::{
    ActivityRecord, BrowsingEvent, CalculationContext, CalculationResult, CarbonCalculator,
    CarbonError, DailyEmission, predict_emissions, tables,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of an activity or history input file (16 MB).
const MAX_INPUT_FILE_SIZE: u64 = 16 * 1024 * 1024;

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CarbonError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CarbonError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CarbonError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require it to be a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CarbonError> {
    let canonical = path.canonicalize().map_err(|e| {
        CarbonError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CarbonError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn read_input(path: &Path) -> Result<String, CarbonError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INPUT_FILE_SIZE)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| CarbonError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), CarbonError> {
    let calculator = EnhancedCalculator::from_config(config)?;
    let state = AppState::new(calculator);

    println!("carbonlens Emission Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", config.server.host);
    println!("  Port:      {}", config.server.port);
    println!(
        "  Reasoning: {}",
        if config.reasoning.api_key.is_some() {
            config.reasoning.model.as_str()
        } else {
            "not configured (domain rules)"
        }
    );
    println!(
        "  Grid:      {}",
        if config.grid.api_key.is_some() {
            config.grid.base_url.as_str()
        } else {
            "not configured (reference factor)"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health                 - Health check");
    println!("  POST /carbon/calculate       - Calculate one activity");
    println!("  POST /carbon/calculate/batch - Calculate many activities");
    println!("  POST /carbon/ai-enhanced     - Enhanced browsing calculation");
    println!("  POST /carbon/predict         - Emission trend projection");
    println!("  POST /carbon/activities      - Log an activity");
    println!("  GET  /carbon/activities      - Recent activities");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.bind_addr(), state).await
}

// =============================================================================
// CALCULATE COMMAND
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum ActivityInput {
    Many(Vec<ActivityRecord>),
    One(Box<ActivityRecord>),
}

/// Parse one record or an array of records.
pub fn parse_activities(text: &str) -> Result<Vec<ActivityRecord>, CarbonError> {
    let input: ActivityInput = serde_json::from_str(text)
        .map_err(|e| CarbonError::SerializationError(format!("Invalid activity JSON: {}", e)))?;
    Ok(match input {
        ActivityInput::Many(records) => records,
        ActivityInput::One(record) => vec![*record],
    })
}

/// Calculate every activity in a JSON file.
pub fn cmd_calculate(file: &Path, json_mode: bool) -> Result<(), CarbonError> {
    tracing::info!(file = %file.display(), "Calculating activities");

    let records = parse_activities(&read_input(file)?)?;
    let results = CarbonCalculator::calculate_batch(&records, &CalculationContext::now());

    if json_mode {
        print_json(&results);
        return Ok(());
    }

    let mut total = 0.0;
    for (record, result) in records.iter().zip(&results) {
        let title = format!("{} / {}", record.activity_type(), record.category);
        print_result(&title, result);
        total += result.emissions;
    }
    if results.len() > 1 {
        println!("Total: {:.2} kg CO2 across {} activities", total, results.len());
    }
    Ok(())
}

fn print_result(title: &str, result: &CalculationResult) {
    println!("{title}");
    println!(
        "  Emissions:  {:.2} {}",
        result.emissions,
        result.unit.symbol()
    );
    println!("  Confidence: {:.0}%", result.confidence * 100.0);
    for factor in &result.factors {
        println!("  - {factor}");
    }
    for recommendation in &result.recommendations {
        println!("  > {recommendation}");
    }
    println!();
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Enhanced calculation for a single browsing visit.
pub async fn cmd_analyze(
    config: &Config,
    event: &BrowsingEvent,
    json_mode: bool,
    verbose: bool,
) -> Result<(), CarbonError> {
    let calculator = EnhancedCalculator::from_config(config)?;
    let result = calculator.calculate(event).await;

    if json_mode {
        print_json(&result);
        return Ok(());
    }

    print_result(&event.url, &result);
    if verbose {
        if let Some(breakdown) = &result.breakdown {
            println!("Breakdown (g):");
            println!("  Server:        {:.2}", breakdown.server_processing);
            println!("  Network:       {:.2}", breakdown.network_transfer);
            println!("  Device:        {:.2}", breakdown.device_energy);
            if let Some(ai) = breakdown.ai_processing {
                println!("  AI processing: {:.2}", ai);
            }
        }
        for insight in &result.insights {
            println!("  * {insight}");
        }
    }
    if result.is_degraded() {
        let degraded: Vec<String> = result.degraded.iter().map(ToString::to_string).collect();
        println!("Degraded: {}", degraded.join(", "));
    }
    Ok(())
}

// =============================================================================
// PREDICT COMMAND
// =============================================================================

/// Project emissions from a daily history file.
pub fn cmd_predict(file: &Path, days: u32, json_mode: bool) -> Result<(), CarbonError> {
    let history: Vec<DailyEmission> = serde_json::from_str(&read_input(file)?)
        .map_err(|e| CarbonError::SerializationError(format!("Invalid history JSON: {}", e)))?;

    let prediction = predict_emissions(&history, days);

    if json_mode {
        print_json(&prediction);
    } else {
        println!("Prediction over {} days", prediction.days);
        println!("  Emissions: {:.2} kg CO2", prediction.predicted);
        println!("  Trend:     {:?}", prediction.trend);
    }
    Ok(())
}

// =============================================================================
// FACTORS COMMAND
// =============================================================================

/// The static factor tables as one JSON document.
fn factor_tables_json() -> serde_json::Value {
    let shopping: serde_json::Map<String, serde_json::Value> = tables::SHOPPING
        .iter()
        .map(|p| {
            (
                p.platform.to_string(),
                serde_json::json!({ "base": p.base, "categories": pairs(p.categories) }),
            )
        })
        .collect();
    let transportation: serde_json::Map<String, serde_json::Value> = tables::TRANSPORTATION
        .iter()
        .map(|s| (s.service.to_string(), serde_json::Value::Object(pairs(s.tiers))))
        .collect();
    let websites: serde_json::Map<String, serde_json::Value> = tables::WEBSITES
        .iter()
        .map(|w| (w.domain.to_string(), serde_json::json!(w.co2_per_visit_g)))
        .collect();
    let devices: serde_json::Map<String, serde_json::Value> = tables::DEVICES
        .iter()
        .map(|d| (d.device_type.to_string(), serde_json::json!(d.browsing_watts)))
        .collect();

    serde_json::json!({
        "shopping_kg_per_dollar": shopping,
        "transportation_kg_per_km": transportation,
        "food_kg_per_order": pairs(tables::FOOD),
        "travel_kg_per_night": pairs(tables::TRAVEL),
        "digital_kg_per_hour": pairs(tables::DIGITAL),
        "regional_multipliers": pairs(tables::REGIONAL_MULTIPLIERS),
        "website_g_per_visit": websites,
        "device_watts": devices,
        "network_g_per_mb": pairs(tables::NETWORK),
        "grid_kg_per_kwh": pairs(tables::GRID_INTENSITY),
    })
}

/// Print the static factor tables.
pub fn cmd_factors(json_mode: bool) -> Result<(), CarbonError> {
    if json_mode {
        print_json(&factor_tables_json());
        return Ok(());
    }

    println!("Shopping (kg CO2 per dollar, default {})", tables::SHOPPING_DEFAULT);
    for platform in tables::SHOPPING {
        println!("  {:<12} {}", platform.platform, platform.base);
        for (keyword, factor) in platform.categories {
            println!("    {:<10} {}", keyword, factor);
        }
    }
    println!(
        "Transportation (kg CO2 per km, default {})",
        tables::TRANSPORTATION_DEFAULT
    );
    for service in tables::TRANSPORTATION {
        for (tier, factor) in service.tiers {
            println!("  {:<12} {:<14} {}", service.service, tier, factor);
        }
    }
    print_table("Food (kg CO2 per order)", tables::FOOD, tables::FOOD_DEFAULT);
    print_table(
        "Travel (kg CO2 per night)",
        tables::TRAVEL,
        tables::TRAVEL_DEFAULT,
    );
    print_table(
        "Digital (kg CO2 per hour)",
        tables::DIGITAL,
        tables::DIGITAL_DEFAULT,
    );
    print_table(
        "Regional multipliers",
        tables::REGIONAL_MULTIPLIERS,
        tables::REGIONAL_DEFAULT,
    );

    println!("Websites (g CO2 per visit, default {})", tables::WEBSITE_DEFAULT_G);
    for site in tables::WEBSITES {
        println!("  {:<18} {:<10} {}", site.domain, site.category, site.co2_per_visit_g);
    }
    println!("Devices (watts while browsing)");
    for device in tables::DEVICES {
        println!("  {:<20} {:<8} {}", device.device_type, device.category, device.browsing_watts);
    }
    print_table(
        "Network (g CO2 per MB)",
        tables::NETWORK,
        tables::NETWORK_DEFAULT,
    );
    print_table(
        "Grid intensity (kg CO2 per kWh)",
        tables::GRID_INTENSITY,
        tables::REFERENCE_GRID_FACTOR,
    );
    Ok(())
}

fn pairs(table: &[(&str, f64)]) -> serde_json::Map<String, serde_json::Value> {
    table
        .iter()
        .map(|(key, factor)| ((*key).to_string(), serde_json::json!(factor)))
        .collect()
}

fn print_table(title: &str, table: &[(&str, f64)], default: f64) {
    println!("{title} (default {default})");
    for (key, factor) in table {
        println!("  {:<12} {}", key, factor);
    }
}
