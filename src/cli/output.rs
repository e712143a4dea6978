//! CLI Output Formatting.
//!
//! Renders simulation reports and calculator results as styled text or JSON.

use console::style;
use serde::Serialize;

use crate::cli::simulator::{SimulationReport, StepOutcome};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "success", "message": message }));
        } else {
            println!("{} {}", style("✓").green(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ "status": "error", "message": message }));
        } else {
            eprintln!("{} {}", style("✗").red(), message);
        }
    }

    /// Print key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.is_json() {
            self.print_json(&serde_json::json!({ key: value }));
        } else {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if !self.is_json() {
            println!();
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
            println!();
        }
    }

    /// Print any serializable value as JSON, or as indented text
    pub fn data<T: Serialize>(&self, data: &T) {
        if self.is_json() {
            self.print_json(data);
        } else if let Ok(json) = serde_json::to_value(data) {
            print_text(&json, 0);
        }
    }

    /// Print a simulation report
    pub fn report(&self, report: &SimulationReport) {
        if self.is_json() {
            self.print_json(report);
            return;
        }

        self.section("Steps");
        for step in &report.steps {
            println!("{}", step_line(step));
        }

        self.section("Positions");
        let rows: Vec<Vec<String>> = report
            .positions
            .iter()
            .map(|p| {
                let collateral = p
                    .collateral
                    .iter()
                    .map(|(symbol, amount)| format!("{} {}", amount, symbol))
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![
                    p.user.clone(),
                    if collateral.is_empty() { "-".into() } else { collateral },
                    p.collateral_value.clone(),
                    p.debt.clone(),
                    p.health_factor.clone(),
                    p.dsc_balance.clone(),
                ]
            })
            .collect();
        print_table(
            &["user", "collateral", "value (USD)", "debt", "health", "DSC held"],
            &rows,
        );

        self.section("Summary");
        self.kv("events", &report.events.to_string());
        self.kv("liquidations", &report.liquidations.total_liquidations.to_string());
        let failures = report.failures();
        if failures == 0 {
            self.success("all steps succeeded");
        } else {
            println!("{} {} step(s) rejected", style("⚠").yellow(), failures);
        }
    }

    fn print_json<T: Serialize>(&self, data: &T) {
        let output = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        if let Ok(json) = output {
            println!("{}", json);
        }
    }
}

fn step_line(step: &StepOutcome) -> String {
    let marker = if step.ok {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let code = step.code.map(|c| format!(" [{}]", c)).unwrap_or_default();
    format!(
        "{} {:>3} {:<17} {}{}",
        marker,
        step.index,
        step.action,
        step.detail,
        style(code).dim()
    )
}

fn print_text(json: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    match json {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                if value.is_object() || value.is_array() {
                    println!("{}{}:", prefix, style(key).bold());
                    print_text(value, indent + 1);
                } else {
                    println!("{}{}: {}", prefix, style(key).bold(), format_value(value));
                }
            }
        }
        serde_json::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}[{}]:", prefix, i);
                print_text(item, indent + 1);
            }
        }
        _ => println!("{}{}", prefix, format_value(json)),
    }
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:w$}", h, w = *w))
        .collect();
    println!("{}", style(header.join(" | ")).bold());
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:w$}", cell, w = *w))
            .collect();
        println!("{}", cells.join(" | "));
    }
}

/// Format a JSON value for text output
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".into(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
