//! Process command - parse a single run-sheet file.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use console::style;
use tracing::info;

use runsheet_core::{DocumentState, ParseResult, RunSheetParser, RunsheetConfig, StrategyChoice};

use super::document_handle;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input run-sheet PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy
    #[arg(short, long, value_enum, default_value = "auto")]
    strategy: StrategyArg,

    /// Parse with both strategies and report the comparison
    #[arg(long)]
    compare: bool,

    /// Driver context (default: from DRIVER_YYYY-MM-DD.pdf filename)
    #[arg(long)]
    driver: Option<String>,

    /// Customer context
    #[arg(long)]
    customer: Option<String>,

    /// Sheet date (default: from filename)
    #[arg(long)]
    date: Option<NaiveDate>,
}

/// Output format for parse results.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
    Text,
}

/// Extraction strategy argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Auto,
    Table,
    Line,
}

impl StrategyArg {
    pub fn choice(self) -> StrategyChoice {
        match self {
            StrategyArg::Auto => StrategyChoice::Auto,
            StrategyArg::Table => StrategyChoice::Table,
            StrategyArg::Line => StrategyChoice::Line,
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let parser = RunSheetParser::new(config);

    let handle = document_handle(
        &args.input,
        args.driver.as_deref(),
        args.customer.as_deref(),
        args.date,
    );
    let data = fs::read(&args.input)?;

    let result = if args.compare {
        let (table, line) = parser.parse_both(&handle, &data);
        let comparison = parser.scorer().compare(&table, &line);

        println!(
            "{} table mode: {} jobs, score {:.2}",
            style("ℹ").blue(),
            comparison.table_accepted,
            comparison.table_score
        );
        println!(
            "{} line mode:  {} jobs, score {:.2}",
            style("ℹ").blue(),
            comparison.line_accepted,
            comparison.line_score
        );
        println!(
            "{} preferred strategy: {}",
            style("✓").green(),
            comparison.preferred()
        );

        if comparison.preferred() == "line" { line } else { table }
    } else {
        parser.parse_bytes(&handle, &data, args.strategy.choice())
    };

    if result.state == DocumentState::Rejected {
        println!(
            "{} Document rejected: {}",
            style("✗").red(),
            result.warnings.join("; ")
        );
    } else {
        info!(
            "Parsed {} jobs from {}",
            result.accepted.len(),
            args.input.display()
        );
    }

    let content = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Csv => format_result_csv(&result)?,
        OutputFormat::Text => format_result_text(&result),
    };

    match args.output {
        Some(path) => {
            fs::write(&path, content)?;
            println!("{} Output written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RunsheetConfig> {
    match config_path {
        Some(path) => Ok(RunsheetConfig::from_file(std::path::Path::new(path))?),
        None => Ok(RunsheetConfig::default()),
    }
}

pub fn format_result_csv(result: &ParseResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "job_number",
        "date",
        "customer",
        "address",
        "postcode",
        "activity",
        "confidence",
        "strategy",
    ])?;

    for job in &result.accepted {
        wtr.write_record([
            job.job_number.clone(),
            job.date.to_string(),
            job.customer.clone().unwrap_or_default(),
            job.address.clone().unwrap_or_default(),
            job.postcode.clone().unwrap_or_default(),
            job.activity.clone().unwrap_or_default(),
            format!("{:.2}", job.diagnostics.confidence),
            job.diagnostics.strategy.clone().unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_result_text(result: &ParseResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Strategy: {} ({} accepted, {} rejected, {} filtered)\n",
        result.strategy, result.accepted.len(), result.rejected_count, result.filtered_count
    ));
    output.push_str(&format!("Completeness: {:.2}\n", result.completeness_score));
    output.push('\n');

    for job in &result.accepted {
        output.push_str(&format!("Job {}\n", job.job_number));
        if let Some(customer) = &job.customer {
            output.push_str(&format!("  Customer: {}\n", customer));
        }
        if let Some(activity) = &job.activity {
            output.push_str(&format!("  Activity: {}\n", activity));
        }
        if let Some(address) = &job.address {
            output.push_str(&format!("  Address:  {}\n", address));
        }
        if let Some(postcode) = &job.postcode {
            output.push_str(&format!("  Postcode: {}\n", postcode));
        }
        for warning in &job.diagnostics.warnings {
            output.push_str(&format!("  Warning:  {}\n", warning));
        }
        output.push('\n');
    }

    if !result.warnings.is_empty() {
        output.push_str(&format!("Document warnings: {}\n", result.warnings.join("; ")));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use runsheet_core::JobRecord;

    fn result_with_one_job() -> ParseResult {
        let mut job = JobRecord::new("4269797", NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        job.customer = Some("TESCO STORE".to_string());
        job.activity = Some("TECH EXCHANGE".to_string());
        job.postcode = Some("M1 1AA".to_string());

        ParseResult {
            accepted: vec![job],
            rejected_count: 0,
            filtered_count: 1,
            completeness_score: 0.7,
            strategy: "table".to_string(),
            state: DocumentState::Scored,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_csv_output_has_header_and_row() {
        let csv = format_result_csv(&result_with_one_job()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("job_number,"));
        let row = lines.next().unwrap();
        assert!(row.contains("4269797"));
        assert!(row.contains("TECH EXCHANGE"));
    }

    #[test]
    fn test_text_output_mentions_counts() {
        let text = format_result_text(&result_with_one_job());
        assert!(text.contains("1 accepted"));
        assert!(text.contains("1 filtered"));
        assert!(text.contains("Job 4269797"));
    }
}
