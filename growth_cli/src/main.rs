use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use growth_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "growthcalc")]
#[command(about = "WHO child growth indicator calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override reference data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute growth indicators for one visit
    Calc {
        /// Sex of the child (male, female)
        #[arg(long)]
        sex: Sex,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<NaiveDate>,

        /// Date of the visit (YYYY-MM-DD)
        #[arg(long)]
        visit_date: Option<NaiveDate>,

        /// Weight in kg
        #[arg(long, value_parser = measurement::parse_measurement)]
        weight: f64,

        /// Length or height in cm
        #[arg(long, value_parser = measurement::parse_measurement)]
        length: f64,

        /// Head circumference in cm
        #[arg(long, value_parser = measurement::parse_measurement)]
        head_circumference: Option<f64>,

        /// Measurement position (standing, recumbent)
        #[arg(long)]
        measured: MeasurementPosition,

        /// Child has oedema
        #[arg(long)]
        oedema: bool,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Compute growth indicators for every visit in a CSV file
    Batch {
        /// Visits CSV
        #[arg(long)]
        input: PathBuf,

        /// Statistics CSV to write
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    growth_core::logging::init(cli.verbose);

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.reference.data_dir = data_dir;
    }

    match cli.command {
        Commands::Calc {
            sex,
            birth_date,
            visit_date,
            weight,
            length,
            head_circumference,
            measured,
            oedema,
            format,
        } => {
            let input = MeasurementInput {
                sex,
                birth_date,
                visit_date,
                weight_kg: weight,
                length_or_height_cm: length,
                head_circumference_cm: head_circumference,
                measured,
                has_oedema: oedema,
            };
            cmd_calc(&config, &input, format.unwrap_or(config.output.format))
        }
        Commands::Batch { input, output } => cmd_batch(&config, input, output),
    }
}

fn cmd_calc(config: &Config, input: &MeasurementInput, format: OutputFormat) -> Result<()> {
    let references = ReferenceSet::shared(&config.reference)?;
    let stats = calculate_scores(input, &references);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => display_statistics(&stats),
    }

    Ok(())
}

fn cmd_batch(config: &Config, input: PathBuf, output: PathBuf) -> Result<()> {
    let references = ReferenceSet::shared(&config.reference)?;
    let summary = growth_core::report::compute_batch(&input, &output, &references)?;

    println!("✓ Computed statistics for {} visits", summary.computed);
    println!("  CSV: {}", output.display());
    if summary.skipped > 0 {
        println!("  Skipped {} malformed rows", summary.skipped);
    }

    Ok(())
}

fn fmt_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "NaN".to_string(),
    }
}

fn display_statistics(stats: &VisitStatistics) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  GROWTH INDICATORS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Age: {} days", stats.age_in_days());
    println!("  BMI: {}", fmt_value(stats.body_mass_index(), 2));
    println!();

    for (indicator, zandp) in stats.indicators() {
        println!(
            "  {:<30} z = {:>6}   percentile = {:>5}",
            indicator.as_str(),
            fmt_value(zandp.zscore(), 2),
            fmt_value(zandp.percentile(), 1)
        );
    }

    if stats.is_alertworthy() {
        println!();
        println!("  ⚠ At least one indicator is below the 25th percentile");
    }

    println!();
}
