use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

use blood_compatibility::{
    compatible_donors_for, compatible_donors_for_label, compatible_recipients_for,
    compatible_recipients_for_label, is_compatible, is_compatible_labels, severity_color,
    BloodType, CompatibilityTable, Config, FileDiscovery, InventoryAnalyzer, InventoryParser,
    InventoryRecord, InventorySnapshot, ReportFormat, ReportGenerator, SeverityTier,
};

/// Blood-type compatibility and inventory classification tool
#[derive(Parser, Debug)]
#[command(
    name = "blood-compat",
    version,
    about = "Blood-type compatibility lookups and inventory severity classification",
    long_about = r#"
A toolkit for blood-bank dashboards:
- Donor/recipient compatibility checks across the eight ABO/Rh blood types
- Severity classification (Critical / Warning / Healthy) of stock levels
- Inventory snapshot reports with shortage alerts and compatible substitutes

Snapshots are CSV or TSV files with blood_type, units and percentage (or target) columns.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath, global = true)]
    config: Option<PathBuf>,

    /// Percentage of target below which stock is critical
    #[arg(long, value_name = "PERCENT", global = true)]
    critical_below: Option<f64>,

    /// Percentage of target below which stock is a warning
    #[arg(long, value_name = "PERCENT", global = true)]
    warning_below: Option<f64>,

    /// Number of threads (0 = auto-detect)
    #[arg(short, long, default_value = "0", global = true)]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a donor type can give to a recipient type
    Check { donor: String, recipient: String },
    /// List donor types a recipient can receive from, most preferred first
    Donors { recipient: String },
    /// List recipient types a donor can give to
    Recipients { donor: String },
    /// Print the full compatibility matrix
    Matrix,
    /// Classify a percentage-of-target stock level
    Classify {
        #[arg(allow_negative_numbers = true)]
        percentage: f64,
    },
    /// Analyze inventory snapshots and write reports
    Report {
        /// Snapshot files or directories
        #[arg(
            value_name = "PATHS",
            num_args = 1..,
            default_value = ".",
            value_hint = ValueHint::AnyPath
        )]
        paths: Vec<PathBuf>,

        /// Recursively search directories
        #[arg(short, long)]
        recursive: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: OutputFormat,

        /// Output directory for reports (overrides config)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,

    },
    /// Interactive compatibility and classification queries
    Interactive,
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Html,
    Csv,
    Tsv,
    Json,
    All,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> ReportFormat {
        match format {
            OutputFormat::Html => ReportFormat::Html,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Tsv => ReportFormat::Tsv,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::All => ReportFormat::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    init_logging(cli.verbose);

    match &cli.command {
        Commands::Check { donor, recipient } => {
            let compatible = is_compatible_labels(donor, recipient)?;
            print_check(donor.parse()?, recipient.parse()?, compatible);
        }
        Commands::Donors { recipient } => {
            let donors = compatible_donors_for_label(recipient)?;
            print_types(&format!("Donors for {}", recipient.trim()), donors);
        }
        Commands::Recipients { donor } => {
            let recipients = compatible_recipients_for_label(donor)?;
            print_types(&format!("Recipients for {}", donor.trim()), recipients);
        }
        Commands::Matrix => print_matrix(),
        Commands::Classify { percentage } => {
            let config = load_config(&cli, None)?;
            print_classification(*percentage, config.thresholds.classify(*percentage));
        }
        Commands::Report {
            paths,
            recursive,
            format,
            output,
        } => {
            let config = load_config(&cli, output.clone())?;
            init_thread_pool(cli.threads)?;
            info!("Using {} threads", rayon::current_num_threads());
            run_report(&config, paths, *recursive, (*format).into())?;
        }
        Commands::Interactive => {
            let config = load_config(&cli, None)?;
            run_interactive_mode(&config)?;
        }
        Commands::Completions { .. } => unreachable!("handled before logging is initialized"),
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("blood_compatibility={},blood_compat={}", level, level))
        .with_writer(io::stderr)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn load_config(cli: &Cli, output_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.critical_below, cli.warning_below, output_dir)?;
    Ok(config)
}

fn tier_style(tier: SeverityTier) -> console::StyledObject<&'static str> {
    let styled = style(tier.label()).bold();
    match tier {
        SeverityTier::Critical => styled.red(),
        SeverityTier::Warning => styled.yellow(),
        SeverityTier::Healthy => styled.green(),
    }
}

fn print_check(donor: BloodType, recipient: BloodType, compatible: bool) {
    if compatible {
        println!(
            "{} {} can donate to {}",
            style("✓").green().bold(),
            style(donor).cyan(),
            style(recipient).cyan()
        );
    } else {
        println!(
            "{} {} cannot donate to {}",
            style("✗").red().bold(),
            style(donor).cyan(),
            style(recipient).cyan()
        );
    }
}

fn print_types(title: &str, types: &[BloodType]) {
    println!("{}", style(title).bold().cyan());
    let labels: Vec<&str> = types.iter().map(|t| t.label()).collect();
    println!("  {}", labels.join(", "));
}

fn print_matrix() {
    let matrix = CompatibilityTable::global().matrix();

    println!("{}", style("Compatibility (rows: donor, columns: recipient)").bold().cyan());
    print!("{:>5}", "");
    for recipient in BloodType::ALL {
        print!("{:>5}", recipient.label());
    }
    println!();

    for donor in BloodType::ALL {
        print!("{:>5}", style(donor.label()).bold());
        for recipient in BloodType::ALL {
            if matrix[donor.index()][recipient.index()] {
                print!("{:>5}", style("✓").green());
            } else {
                print!("{:>5}", style("·").dim());
            }
        }
        println!();
    }
}

fn print_classification(percentage: f64, tier: SeverityTier) {
    println!(
        "{:.1}% of target: {} ({})",
        percentage,
        tier_style(tier),
        severity_color(tier)
    );
}

fn run_report(
    config: &Config,
    paths: &[PathBuf],
    recursive: bool,
    format: ReportFormat,
) -> Result<()> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );

    // Step 1: Discover files
    pb.set_message("Discovering inventory snapshots...");
    let discovery = FileDiscovery::new(recursive);
    let files = discovery.discover(paths)?;
    pb.set_position(10);

    info!("Found {} snapshot files", files.len());
    if files.is_empty() {
        pb.finish_and_clear();
        warn!("No inventory snapshots found");
        println!("{} No inventory snapshots found", style("!").yellow().bold());
        return Ok(());
    }

    // Step 2: Parse snapshots in parallel
    pb.set_message("Parsing inventory snapshots...");
    let parser = InventoryParser::new();
    let snapshots: Vec<InventorySnapshot> = files
        .par_iter()
        .filter_map(|path| match parser.parse(path) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Failed to parse {}: {:#}", path.display(), e);
                None
            }
        })
        .collect();
    pb.set_position(40);

    let records: Vec<InventoryRecord> = snapshots.into_iter().flat_map(|s| s.records).collect();
    info!("Parsed {} inventory rows", records.len());

    // Step 3: Classify and raise alerts
    pb.set_message("Classifying inventory levels...");
    let analyzer = InventoryAnalyzer::new(config.thresholds);
    let results = analyzer.analyze(&records);
    pb.set_position(70);

    for alert in &results.alerts {
        warn!("{}", alert.message);
    }

    // Step 4: Generate reports
    pb.set_message("Generating reports...");
    let generator = ReportGenerator::new(&config.report.output_dir, config.palette.clone())?;
    generator.generate(&results, format)?;
    pb.set_position(100);

    pb.finish_with_message("Analysis complete!");

    println!();
    for tier in SeverityTier::ALL {
        println!("  {:<10} {}", tier_style(tier), results.summary.count(tier));
    }
    println!(
        "\n{} Reports saved to: {}",
        style("✓").green().bold(),
        style(config.report.output_dir.display()).cyan()
    );

    Ok(())
}

fn run_interactive_mode(config: &Config) -> Result<()> {
    println!(
        "{}",
        style("╔══════════════════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║       Blood Compatibility - Interactive Mode                 ║")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("╚══════════════════════════════════════════════════════════════╝").cyan()
    );
    println!();

    let theme = ColorfulTheme::default();
    let labels: Vec<&str> = BloodType::ALL.iter().map(|t| t.label()).collect();
    let queries = vec![
        "Check donor → recipient",
        "List donors for a recipient",
        "List recipients for a donor",
        "Classify a stock level",
        "Quit",
    ];

    loop {
        let query = Select::with_theme(&theme)
            .with_prompt("Select query")
            .default(0)
            .items(&queries)
            .interact()?;

        match query {
            0 => {
                let donor = select_blood_type(&theme, "Donor type", &labels)?;
                let recipient = select_blood_type(&theme, "Recipient type", &labels)?;
                print_check(donor, recipient, is_compatible(donor, recipient));
            }
            1 => {
                let recipient = select_blood_type(&theme, "Recipient type", &labels)?;
                print_types(
                    &format!("Donors for {}", recipient),
                    compatible_donors_for(recipient),
                );
            }
            2 => {
                let donor = select_blood_type(&theme, "Donor type", &labels)?;
                print_types(
                    &format!("Recipients for {}", donor),
                    compatible_recipients_for(donor),
                );
            }
            3 => {
                let percentage: f64 = Input::with_theme(&theme)
                    .with_prompt("Percentage of target")
                    .interact_text()?;
                print_classification(percentage, config.thresholds.classify(percentage));
            }
            _ => break,
        }
        println!();
    }

    Ok(())
}

fn select_blood_type(theme: &ColorfulTheme, prompt: &str, labels: &[&str]) -> Result<BloodType> {
    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .default(0)
        .items(labels)
        .interact()?;

    Ok(BloodType::ALL[idx])
}
