//! fxsize CLI: ATR estimates and ATR-based position sizes for forex pairs.
//!
//! Commands:
//! - `atr` fetches bars and prints the Average True Range
//! - `size` computes units and lots from equity, risk and an ATR stop
//! - `tables` prints the symbol reference and timeframe factor tables

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fxsize_core::config::{DataSourceKind, FxsizeConfig};
use fxsize_core::data::{BarProvider, CircuitBreaker, CsvProvider, MetaApiProvider};
use fxsize_core::domain::Timeframe;
use fxsize_core::indicators::{AtrResult, Smoothing};
use fxsize_core::pipeline::{AtrSource, Calculator, SizingOutcome};
use fxsize_core::reference::{normalize_symbol, SYMBOL_TABLE};
use fxsize_core::sizers::{compute_position_size, AtrBasis, PositionSize, RiskParameters, StopLoss};

#[derive(Parser)]
#[command(
    name = "fxsize",
    version,
    about = "fxsize: ATR-based forex position sizing"
)]
struct Cli {
    /// Path to a TOML config file. A missing file means defaults.
    #[arg(long, global = true, default_value = "fxsize.toml")]
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bars and print the Average True Range.
    Atr {
        /// Symbol, e.g. EURUSD.
        symbol: String,

        #[command(flatten)]
        estimate: EstimateArgs,

        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compute a position size from account risk and an ATR-based stop.
    Size(SizeArgs),
    /// Print the symbol reference and timeframe factor tables.
    Tables,
}

#[derive(Copy, Clone, ValueEnum)]
enum SourceArg {
    Metaapi,
    Csv,
}

impl From<SourceArg> for DataSourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Metaapi => DataSourceKind::MetaApi,
            SourceArg::Csv => DataSourceKind::Csv,
        }
    }
}

/// Options shared by every command that estimates an ATR from bars.
#[derive(Args)]
struct EstimateArgs {
    /// Bar timeframe: 1m, 5m, 15m, 30m, 1h, 4h, 8h, 1d.
    #[arg(long, short = 't', default_value = "1h")]
    timeframe: Timeframe,

    /// ATR look-back in bars. Defaults to the config value (14).
    #[arg(long)]
    periods: Option<usize>,

    /// Use Wilder smoothing instead of the simple mean.
    #[arg(long, default_value_t = false)]
    wilder: bool,

    /// Keep the still-forming last bar.
    #[arg(long, default_value_t = false)]
    include_forming: bool,

    /// Bar source. Defaults to the config value.
    #[arg(long, value_enum)]
    source: Option<SourceArg>,

    /// Directory of `<SYMBOL>_<tf>.csv` files for `--source csv`.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Args)]
struct SizeArgs {
    /// Symbol, e.g. EURUSD.
    symbol: String,

    #[command(flatten)]
    estimate: EstimateArgs,

    /// Account equity in account currency.
    #[arg(long)]
    equity: Option<f64>,

    /// Percent of equity to risk, e.g. 1 for 1%.
    #[arg(long)]
    risk: Option<f64>,

    /// Stop at this many ATRs from entry.
    #[arg(long, conflicts_with_all = ["stop_distance", "stop_pips"])]
    atr_multiple: Option<f64>,

    /// Stop at this absolute price distance.
    #[arg(long, conflicts_with = "stop_pips")]
    stop_distance: Option<f64>,

    /// Stop at this many pips.
    #[arg(long)]
    stop_pips: Option<f64>,

    /// Use this ATR instead of fetching bars.
    #[arg(long)]
    atr: Option<f64>,

    /// The `--atr` value is a daily ATR; scale it to the timeframe.
    #[arg(long, requires = "atr", default_value_t = false)]
    daily: bool,

    /// Flag sizes above this many lots.
    #[arg(long)]
    max_lots: Option<f64>,

    /// Fall back to the reference daily ATR when bars are unavailable.
    #[arg(long, default_value_t = false)]
    fallback: bool,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let mut config = FxsizeConfig::load(&cli.config)?;
    config.apply_env();
    debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Atr {
            symbol,
            estimate,
            json,
        } => run_atr(&mut config, &symbol, &estimate, json),
        Commands::Size(args) => run_size(&mut config, &args),
        Commands::Tables => {
            print_tables();
            Ok(())
        }
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Fold command-line estimator options into the loaded config.
fn apply_estimate_args(config: &mut FxsizeConfig, args: &EstimateArgs) {
    if let Some(periods) = args.periods {
        config.atr.periods = periods;
    }
    if args.wilder {
        config.atr.smoothing = Smoothing::Wilder;
    }
    if args.include_forming {
        config.atr.include_forming_bar = true;
    }
    if let Some(source) = args.source {
        config.data.source = source.into();
    }
    if let Some(dir) = &args.csv_dir {
        config.data.csv_dir = dir.clone();
    }
}

fn build_provider(config: &FxsizeConfig) -> Result<Box<dyn BarProvider>> {
    match config.data.source {
        DataSourceKind::Csv => Ok(Box::new(CsvProvider::new(&config.data.csv_dir))),
        DataSourceKind::MetaApi => {
            let credentials = config.metaapi_credentials()?;
            let breaker = Arc::new(CircuitBreaker::default_provider());
            let mut provider = MetaApiProvider::new(credentials, breaker)?;
            if let Some(url) = &config.metaapi.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            Ok(Box::new(provider))
        }
    }
}

fn run_atr(config: &mut FxsizeConfig, symbol: &str, args: &EstimateArgs, json: bool) -> Result<()> {
    apply_estimate_args(config, args);
    let provider = build_provider(config)?;
    let calculator = Calculator::new(provider, config.calculator_config());

    let result = calculator
        .atr_for(symbol, args.timeframe)
        .with_context(|| format!("ATR for {} on {}", normalize_symbol(symbol), args.timeframe))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_atr(&result);
    }
    Ok(())
}

fn stop_loss(config: &FxsizeConfig, args: &SizeArgs) -> StopLoss {
    if let Some(distance) = args.stop_distance {
        StopLoss::Absolute(distance)
    } else if let Some(pips) = args.stop_pips {
        StopLoss::Pips(pips)
    } else {
        StopLoss::AtrMultiple(args.atr_multiple.unwrap_or(config.risk.atr_multiple))
    }
}

/// The ATR to size with when no bars are needed: the `--atr` value, or
/// zero when the stop is not ATR-based and therefore ignores it.
fn supplied_atr(args: &SizeArgs, risk: &RiskParameters) -> Option<f64> {
    match args.atr {
        Some(atr) => Some(atr),
        None if !risk.stop_loss.uses_atr() => Some(0.0),
        None => None,
    }
}

fn run_size(config: &mut FxsizeConfig, args: &SizeArgs) -> Result<()> {
    apply_estimate_args(config, &args.estimate);
    if args.fallback {
        config.atr.fallback_to_default = true;
    }

    let Some(equity) = args.equity.or(config.risk.account_equity) else {
        bail!("account equity is required: pass --equity or set [risk] account_equity");
    };
    let risk = RiskParameters::new(
        equity,
        args.risk.unwrap_or(config.risk.risk_percent),
        stop_loss(config, args),
    );

    let mut contract = config.contract_for(&args.symbol);
    if let Some(max) = args.max_lots {
        contract.max_lots = Some(max);
    }
    let timeframe = args.estimate.timeframe;

    if let Some(atr) = supplied_atr(args, &risk) {
        let basis = if args.daily {
            AtrBasis::Daily
        } else {
            AtrBasis::Native
        };
        info!(atr, ?basis, stop = ?risk.stop_loss, "sizing without fetching bars");
        let position = compute_position_size(atr, basis, timeframe, &risk, &contract)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&position)?);
        } else {
            print_position(&normalize_symbol(&args.symbol), &position);
        }
        return Ok(());
    }

    let provider = build_provider(config)?;
    let calculator = Calculator::new(provider, config.calculator_config());
    let outcome = calculator
        .size_for(&args.symbol, timeframe, &risk, &contract)
        .with_context(|| format!("position size for {}", normalize_symbol(&args.symbol)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_atr(result: &AtrResult) {
    println!();
    println!("=== ATR ===");
    println!("Symbol:         {}", result.symbol);
    println!("Timeframe:      {}", result.timeframe);
    println!(
        "Periods:        {} ({})",
        result.periods,
        match result.smoothing {
            Smoothing::Simple => "simple",
            Smoothing::Wilder => "wilder",
        }
    );
    println!("ATR:            {:.6}", result.value);
    println!("Bars used:      {}", result.bars_used);
    if result.true_ranges_discarded > 0 {
        println!("Discarded TRs:  {}", result.true_ranges_discarded);
    }
    if result.forming_bars_excluded > 0 {
        println!("Forming bars:   {} excluded", result.forming_bars_excluded);
    }
    println!("Last bar:       {}", result.last_bar_timestamp.to_rfc3339());
    println!();
}

fn print_position(symbol: &str, position: &PositionSize) {
    println!();
    println!("=== Position Size ===");
    println!("Symbol:         {symbol}");
    println!("Timeframe:      {}", position.inputs.timeframe);
    println!(
        "ATR:            {:.6} ({:?}, x{:.2} = {:.6})",
        position.inputs.atr,
        position.inputs.basis,
        position.inputs.timeframe_factor,
        position.scaled_atr
    );
    println!("Risk amount:    {:.2}", position.risk_amount);
    match position.stop_pips {
        Some(pips) => println!(
            "Stop:           {:.6} ({pips:.1} pips)",
            position.stop_distance
        ),
        None => println!("Stop:           {:.6}", position.stop_distance),
    }
    println!("Units:          {:.0}", position.units);
    println!("Lots:           {:.2}", position.lots);
    if position.exceeds_max_lots {
        if let Some(max) = position.inputs.contract.max_lots {
            println!();
            println!("WARNING: size exceeds the {max} lot limit");
        }
    }
    println!();
}

fn print_outcome(outcome: &SizingOutcome) {
    print_position(&outcome.symbol, &outcome.position);
    match &outcome.atr.source {
        AtrSource::Live { provider } => println!("ATR source:     {provider}"),
        AtrSource::Fallback { reason } => {
            println!("WARNING: default daily ATR used ({reason})");
        }
    }
    println!();
}

fn print_tables() {
    println!("{:<8} {:>14} {:>10}", "Symbol", "Daily ATR", "Pip");
    println!("{}", "-".repeat(34));
    for entry in SYMBOL_TABLE.iter() {
        println!(
            "{:<8} {:>14} {:>10}",
            entry.symbol, entry.default_daily_atr, entry.pip_size
        );
    }
    println!();
    println!("{:<10} {:>8}", "Timeframe", "Factor");
    println!("{}", "-".repeat(19));
    for tf in Timeframe::ALL {
        println!("{:<10} {:>8.2}", tf.label(), tf.daily_factor());
    }
}
