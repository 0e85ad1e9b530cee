//! Run a GPTS budget-allocation experiment batch against a synthetic environment.
//!
//! Each campaign responds to spend with a saturating curve
//! `weight · (1 − exp(−spend / scale))`; rewards get Gaussian noise.
//!
//! Usage:
//! ```text
//! cargo run --release --features cli --bin gpts-alloc -- --horizon 50 --experiments 50
//! cargo run --release --features cli --bin gpts-alloc -- --config run.json --json
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpts_alloc::{
    ArmEncoding, Combine, ExperimentConfig, ExperimentDriver, Kernel, ResponseCurve, RunReport,
    TableEnvironment,
};

#[derive(Parser)]
#[command(name = "gpts-alloc", about = "Budget allocation search with GP Thompson sampling")]
struct Cli {
    /// JSON file with an ExperimentConfig; flags below override its fields
    #[arg(long)]
    config: Option<String>,

    /// Cumulative budget shared by all campaigns
    #[arg(long)]
    budget: Option<u64>,

    /// Budget the base discretization is expressed in
    #[arg(long)]
    base_budget: Option<u64>,

    /// Base discretization levels, comma separated (e.g. 0,1,3,5,8,10)
    #[arg(long, value_delimiter = ',')]
    levels: Option<Vec<u64>>,

    /// Number of campaigns
    #[arg(long)]
    campaigns: Option<usize>,

    /// Rounds per experiment
    #[arg(long)]
    horizon: Option<usize>,

    /// Number of independent experiments
    #[arg(long)]
    experiments: Option<usize>,

    /// Run seed
    #[arg(long)]
    seed: Option<u64>,

    /// Use the allocation vector instead of the arm index as GP input
    #[arg(long)]
    allocation_inputs: bool,

    /// Aggregation of winner values: two-point-mean, running-mean or max
    #[arg(long)]
    value_aggregation: Option<String>,

    /// Kernel: rbf or matern52
    #[arg(long)]
    kernel: Option<String>,

    /// GP noise variance (normalized units)
    #[arg(long)]
    noise_variance: Option<f64>,

    /// Per-campaign response weights of the synthetic environment
    #[arg(long, value_delimiter = ',', default_value = "3.0,2.0,1.5")]
    weights: Vec<f64>,

    /// Per-campaign response scales of the synthetic environment
    #[arg(long, value_delimiter = ',', default_value = "4.0,2.0,1.0")]
    scales: Vec<f64>,

    /// Reward noise std of the synthetic environment
    #[arg(long, default_value = "0.5")]
    env_noise: f64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<ExperimentConfig, Box<dyn std::error::Error>> {
    let mut cfg = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ExperimentConfig::default(),
    };
    if let Some(v) = cli.budget {
        cfg.cumulative_budget = v;
    }
    if let Some(v) = cli.base_budget {
        cfg.base_budget = v;
    }
    if let Some(v) = &cli.levels {
        cfg.base_discretization = v.clone();
    }
    if let Some(v) = cli.campaigns {
        cfg.n_campaigns = v;
    }
    if let Some(v) = cli.horizon {
        cfg.horizon = v;
    }
    if let Some(v) = cli.experiments {
        cfg.n_experiments = v;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }
    if cli.allocation_inputs {
        cfg.arm_encoding = ArmEncoding::Allocation;
    }
    if let Some(v) = &cli.value_aggregation {
        cfg.value_aggregation = match v.as_str() {
            "two-point-mean" => Combine::TwoPointMean,
            "running-mean" => Combine::RunningMean,
            "max" => Combine::Max,
            other => return Err(format!("unknown value aggregation: {other}").into()),
        };
    }
    if let Some(v) = &cli.kernel {
        cfg.gp.kernel = match v.as_str() {
            "rbf" => Kernel::Rbf,
            "matern52" => Kernel::Matern52,
            other => return Err(format!("unknown kernel: {other}").into()),
        };
    }
    if let Some(v) = cli.noise_variance {
        cfg.gp.noise_variance = v;
    }
    Ok(cfg)
}

fn print_report(driver: &ExperimentDriver, env: &TableEnvironment, report: &RunReport) {
    println!("=== GPTS budget allocation ===\n");
    println!("  Allocations considered: {}", driver.allocations().len());
    if let Some(best) = env.best_allocation() {
        println!("  True best allocation:   {best}");
    }
    println!(
        "  Best budget is: {} with value: {:.4}",
        report.best_allocation, report.best_value
    );
    println!("  Oracle optimum:         {:.4}", report.optimum);

    println!("\n--- Experiment winners ---");
    let mut counts: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
    for &w in &report.winners {
        *counts.entry(w).or_default() += 1;
    }
    for (arm, n) in &counts {
        println!("  {:>4} {:<16} x{n}", arm, driver.allocations()[*arm].to_string());
    }

    println!("\n--- Cumulative regret ---");
    let step = (report.regret.len() / 10).max(1);
    for (t, r) in report.regret.iter().enumerate() {
        if t % step == 0 || t + 1 == report.regret.len() {
            println!("  t={t:<5} regret={r:.4}  mean_reward={:.4}", report.mean_rewards[t]);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let cfg = build_config(&cli).unwrap_or_else(|e| {
        eprintln!("Error building configuration: {e}");
        std::process::exit(2);
    });

    let driver = ExperimentDriver::new(cfg).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(2);
    });

    let curves = ResponseCurve::from_parts(&cli.weights, &cli.scales).unwrap_or_else(|e| {
        eprintln!("Invalid environment curves: {e}");
        std::process::exit(2);
    });
    let mut env = TableEnvironment::from_response_curves(
        driver.allocations(),
        &curves,
        cli.env_noise,
        driver.config().seed ^ 0x454E_56, // "ENV"
    )
    .unwrap_or_else(|e| {
        eprintln!("Error building environment: {e}");
        std::process::exit(2);
    });

    let report = driver.run(&mut env).unwrap_or_else(|e| {
        eprintln!("Run failed: {e}");
        std::process::exit(1);
    });

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_report(&driver, &env, &report);
    }
}
