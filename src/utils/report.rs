// src/utils/report.rs

//! Report formatting over the `log` facade.
//!
//! Headers, summaries and the region state dump share one layout so cycle
//! output reads the same whether it goes to a terminal or a log collector.

use log::LevelFilter;

use crate::models::Hierarchy;

const RULE_WIDTH: usize = 60;

/// Parse a configured level name, `info` when unknown.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        log::info!("{}", line);
    }
}

fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    std::iter::once(format!("[SUMMARY] {}", title))
        .chain(items.iter().map(|(key, value)| format!("    {}: {}", key, value)))
        .collect()
}

/// Log the alert flag of every region under a context title.
pub fn region_states(context: &str, hierarchy: &Hierarchy) {
    for line in region_state_lines(context, hierarchy) {
        log::info!("{}", line);
    }
}

fn region_state_lines(context: &str, hierarchy: &Hierarchy) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![format!("[stats] {}:", context), rule.clone()];
    lines.extend(
        hierarchy
            .regions()
            .iter()
            .map(|region| format!("  {} : {}", region.name, region.alert)),
    );
    lines.push(rule);
    lines
}
