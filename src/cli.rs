//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, DEFAULT_PRICE_COLUMN};
use crate::adapters::csv_export;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::typst_report::TypstReportAdapter;
use crate::domain::analysis::{
    load_tables, parse_codes, AnalysisConfig, FactorSpec, DEFAULT_WINDOW,
};
use crate::domain::apt::{expected_return, ExpectedReturn};
use crate::domain::config_validation::{
    parse_date, parse_periods_per_year, validate_analysis_config,
};
use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use crate::domain::ols::{self, OlsFit};
use crate::domain::prediction::{parse_scenario, predict_scenario, summarize, walk_forward};
use crate::domain::report::{analyze_table, AnalysisReport};
use crate::domain::returns::FactorTransform;
use crate::domain::rolling::rolling_fit;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "aptfit", about = "Arbitrage Pricing Theory factor regressions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Full-sample factor regression per asset
    Fit {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: Option<String>,
    },
    /// Rolling-window coefficient estimates
    Rolling {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: Option<String>,
        #[arg(short, long)]
        window: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Walk-forward or scenario return predictions for one asset
    Predict {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: String,
        #[arg(short, long)]
        window: Option<usize>,
        /// Factor values as name=value pairs, e.g. market=0.01,rf=0.0002
        #[arg(long)]
        scenario: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the full analysis and write a Typst report
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate an analysis configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for configured series
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// List series available in the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load a directory of CSV price files into the SQLite store
    #[cfg(feature = "sqlite")]
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv_dir: PathBuf,
    },
}

pub const DEFAULT_REPORT_PATH: &str = "report.typ";

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Fit { config, asset } => run_fit(&config, asset.as_deref()),
        Command::Rolling {
            config,
            asset,
            window,
            output,
        } => run_rolling(&config, asset.as_deref(), window, output.as_deref()),
        Command::Predict {
            config,
            asset,
            window,
            scenario,
            output,
        } => run_predict(
            &config,
            &asset,
            window,
            scenario.as_deref(),
            output.as_deref(),
        ),
        Command::Analyze { config, output } => run_analyze(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
        #[cfg(feature = "sqlite")]
        Command::Import { config, csv_dir } => run_import(&config, &csv_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AptError> {
    log::info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| AptError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Validates and reads the `[analysis]` and `[factor.*]` sections.
pub fn build_analysis_config(adapter: &dyn ConfigPort) -> Result<AnalysisConfig, AptError> {
    validate_analysis_config(adapter)?;

    let start_date = parse_date(
        adapter.get_string("analysis", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("analysis", "end_date").as_deref(),
        "end_date",
    )?;

    let assets_str = adapter.get_string("analysis", "assets").unwrap_or_default();
    let assets = parse_codes(&assets_str).map_err(|e| AptError::ConfigInvalid {
        section: "analysis".into(),
        key: "assets".into(),
        reason: e.to_string(),
    })?;

    let mut factors = Vec::new();
    for name in adapter.get_list("analysis", "factors") {
        let section = format!("factor.{name}");
        let code = adapter
            .get_string(&section, "code")
            .map(|c| c.trim().to_string())
            .ok_or_else(|| AptError::ConfigMissing {
                section: section.clone(),
                key: "code".into(),
            })?;
        let transform = match adapter.get_string(&section, "transform") {
            Some(t) => t
                .parse::<FactorTransform>()
                .map_err(|reason| AptError::ConfigInvalid {
                    section: section.clone(),
                    key: "transform".into(),
                    reason,
                })?,
            None => FactorTransform::default(),
        };
        factors.push(FactorSpec {
            name,
            code,
            transform,
        });
    }

    let risk_free_factor = adapter
        .get_string("analysis", "risk_free_factor")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(AnalysisConfig {
        start_date,
        end_date,
        assets,
        factors,
        risk_free_factor,
        window: adapter.get_int("analysis", "window", DEFAULT_WINDOW as i64) as usize,
        periods_per_year: parse_periods_per_year(adapter)?,
    })
}

/// Price source selected by `[data] source`.
pub fn open_source(adapter: &dyn ConfigPort) -> Result<Box<dyn PriceSource>, AptError> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim().to_lowercase().as_str() {
        "csv" => {
            let dir = adapter
                .get_string("data", "csv_dir")
                .unwrap_or_else(|| "data".to_string());
            let column = adapter
                .get_string("data", "price_column")
                .unwrap_or_else(|| DEFAULT_PRICE_COLUMN.to_string());
            log::debug!("reading CSV prices from {dir} (column {column})");
            Ok(Box::new(CsvAdapter::with_price_column(
                PathBuf::from(dir),
                column.trim(),
            )))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            Ok(Box::new(SqliteAdapter::from_config(adapter)?))
        }
        other => Err(AptError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unsupported source '{other}' in this build"),
        }),
    }
}

/// `--asset` overrides the configured asset list.
pub fn resolve_assets(asset_override: Option<&str>, config: &AnalysisConfig) -> Vec<String> {
    match asset_override {
        Some(a) if !a.trim().is_empty() => vec![a.trim().to_uppercase()],
        _ => config.assets.clone(),
    }
}

/// Per-asset export path: `out.csv` becomes `out_MSFT.csv` when several
/// assets share one `--output`.
pub fn output_path_for(path: &Path, asset: &str, multiple: bool) -> PathBuf {
    if !multiple {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}_{asset}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{asset}"),
    };
    path.with_file_name(file_name)
}

struct Session {
    config: AnalysisConfig,
    source: Box<dyn PriceSource>,
    template_path: Option<String>,
}

fn open_session(config_path: &Path) -> Result<Session, AptError> {
    let adapter = load_config(config_path)?;
    let config = build_analysis_config(&adapter)?;
    let source = open_source(&adapter)?;
    Ok(Session {
        config,
        source,
        template_path: adapter.get_string("report", "template_path"),
    })
}

fn run_fit(config_path: &Path, asset: Option<&str>) -> Result<(), AptError> {
    let session = open_session(config_path)?;
    let assets = resolve_assets(asset, &session.config);
    let tables = load_tables(session.source.as_ref(), &session.config, &assets)?;

    let mut fitted = 0;
    let mut last_err = None;
    for table in &tables {
        let fit = match ols::fit(table) {
            Ok(fit) => fit,
            Err(e) => {
                log::warn!("skipping {} ({})", table.asset, e);
                last_err = Some(e);
                continue;
            }
        };
        let er = expected_return(&fit, table, session.config.risk_free_factor.as_deref());
        print!("{}", format_fit(table, &fit));
        print!("{}", format_expected(&er, session.config.periods_per_year));
        println!();
        fitted += 1;
    }

    match (fitted, last_err) {
        (0, Some(e)) => Err(e),
        _ => Ok(()),
    }
}

fn run_rolling(
    config_path: &Path,
    asset: Option<&str>,
    window: Option<usize>,
    output: Option<&Path>,
) -> Result<(), AptError> {
    let session = open_session(config_path)?;
    let window = window.unwrap_or(session.config.window);
    let assets = resolve_assets(asset, &session.config);
    let tables = load_tables(session.source.as_ref(), &session.config, &assets)?;

    for table in &tables {
        let rolling = rolling_fit(table, window)?;
        println!(
            "{}: {} windows of {} periods ({} skipped)",
            rolling.asset,
            rolling.points.len(),
            rolling.window,
            rolling.skipped
        );
        println!("  {:<16} {:>12} {:>12} {:>12}", "coefficient", "min", "max", "last");
        for (k, (name, lo, hi)) in rolling.ranges().into_iter().enumerate() {
            let last = rolling
                .points
                .last()
                .map(|p| p.coefficients[k])
                .unwrap_or(f64::NAN);
            println!("  {:<16} {:>12.6} {:>12.6} {:>12.6}", name, lo, hi, last);
        }

        if let Some(path) = output {
            let path = output_path_for(path, &table.asset, tables.len() > 1);
            csv_export::write_rolling_csv(&path, &rolling)?;
        }
    }
    Ok(())
}

fn run_predict(
    config_path: &Path,
    asset: &str,
    window: Option<usize>,
    scenario: Option<&str>,
    output: Option<&Path>,
) -> Result<(), AptError> {
    let session = open_session(config_path)?;
    let assets = resolve_assets(Some(asset), &session.config);
    let tables = load_tables(session.source.as_ref(), &session.config, &assets)?;
    let Some(table) = tables.first() else {
        return Err(AptError::NoData {
            code: asset.to_string(),
        });
    };

    if let Some(scenario) = scenario {
        let values = parse_scenario(scenario, &table.factor_names)?;
        let fit = ols::fit(table)?;
        let predicted = predict_scenario(&fit, &values);
        println!("{}: predicted return {:.6} ({:+.4}%)", table.asset, predicted, predicted * 100.0);
        return Ok(());
    }

    let window = window.unwrap_or(session.config.window);
    let predictions = walk_forward(table, window)?;
    match summarize(&predictions) {
        Some(s) => println!(
            "{}: {} walk-forward predictions ({}-period window), MAE {:.6}, RMSE {:.6}, hit rate {:.1}%",
            table.asset,
            s.count,
            window,
            s.mae,
            s.rmse,
            s.hit_rate * 100.0
        ),
        None => println!("{}: no predictions (every training window was singular)", table.asset),
    }

    if let Some(path) = output {
        csv_export::write_predictions_csv(path, &predictions)?;
    }
    Ok(())
}

fn run_analyze(config_path: &Path, output: Option<&Path>) -> Result<(), AptError> {
    let session = open_session(config_path)?;
    let tables = load_tables(
        session.source.as_ref(),
        &session.config,
        &session.config.assets,
    )?;

    let mut assets = Vec::with_capacity(tables.len());
    for table in &tables {
        match analyze_table(table, &session.config) {
            Ok(a) => {
                print!("{}", format_fit(table, &a.fit));
                print!("{}", format_expected(&a.expected, session.config.periods_per_year));
                println!();
                assets.push(a);
            }
            Err(e) => log::warn!("skipping {} ({})", table.asset, e),
        }
    }
    if assets.is_empty() {
        return Err(AptError::NoData {
            code: session.config.assets.join(","),
        });
    }

    let report = AnalysisReport {
        config: session.config.clone(),
        assets,
    };
    let adapter = match &session.template_path {
        Some(t) => TypstReportAdapter::with_template(t),
        None => TypstReportAdapter::new(),
    };
    let output = output.unwrap_or(Path::new(DEFAULT_REPORT_PATH));
    adapter.write(&report, &output.to_string_lossy())?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), AptError> {
    let adapter = load_config(config_path)?;
    let config = build_analysis_config(&adapter)?;

    println!("Period:   {} to {}", config.start_date, config.end_date);
    println!("Assets:   {}", config.assets.join(", "));
    for f in &config.factors {
        println!("Factor:   {} = {} ({})", f.name, f.code, f.transform);
    }
    if let Some(rf) = &config.risk_free_factor {
        println!("Risk-free factor: {rf}");
    }
    println!("Window:   {}", config.window);
    println!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, code: Option<&str>) -> Result<(), AptError> {
    let adapter = load_config(config_path)?;
    let source = open_source(&adapter)?;

    let codes = match code {
        Some(c) => vec![c.trim().to_string()],
        None => build_analysis_config(&adapter)?.all_codes(),
    };

    for c in &codes {
        match source.get_data_range(c) {
            Ok(Some((first, last, count))) => {
                println!("{c}: {count} bars, {first} to {last}");
            }
            Ok(None) => log::warn!("{c}: no data found"),
            Err(e) => log::warn!("error querying {c}: {e}"),
        }
    }
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), AptError> {
    let adapter = load_config(config_path)?;
    let source = open_source(&adapter)?;
    let symbols = source.list_symbols()?;

    if symbols.is_empty() {
        log::warn!("No symbols found");
    } else {
        for s in &symbols {
            println!("{s}");
        }
        log::info!("{} symbols found", symbols.len());
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(config_path: &Path, csv_dir: &Path) -> Result<(), AptError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use chrono::NaiveDate;

    let adapter = load_config(config_path)?;
    let column = adapter
        .get_string("data", "price_column")
        .unwrap_or_else(|| DEFAULT_PRICE_COLUMN.to_string());
    let csv = CsvAdapter::with_price_column(csv_dir.to_path_buf(), column.trim());
    let store = SqliteAdapter::from_config(&adapter)?;

    let mut total = 0usize;
    for code in csv.list_symbols()? {
        let bars = csv.fetch_prices(&code, NaiveDate::MIN, NaiveDate::MAX)?;
        let written = store.insert_bars(&bars)?;
        log::info!("{code}: imported {written} bars");
        total += written;
    }
    println!("Imported {total} bars from {}", csv_dir.display());
    Ok(())
}

fn fmt_stat(value: f64, width: usize, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:>width$.decimals$}", value)
    } else {
        format!("{:>width$}", "n/a")
    }
}

/// Console coefficient table in the layout of a regression summary.
pub fn format_fit(table: &FactorTable, fit: &OlsFit) -> String {
    let mut out = format!(
        "{}: {} observations, {} to {}\n",
        table.asset,
        fit.observations,
        table.dates.first().map(|d| d.to_string()).unwrap_or_default(),
        table.dates.last().map(|d| d.to_string()).unwrap_or_default(),
    );
    out.push_str(&format!(
        "  {:<16} {:>12} {:>12} {:>9} {:>9}\n",
        "coefficient", "estimate", "std err", "t", "P>|t|"
    ));
    for i in 0..fit.parameters {
        out.push_str(&format!(
            "  {:<16} {} {} {} {}\n",
            fit.names[i],
            fmt_stat(fit.coefficients[i], 12, 6),
            fmt_stat(fit.std_errors[i], 12, 6),
            fmt_stat(fit.t_stats[i], 9, 3),
            fmt_stat(fit.p_values[i], 9, 4),
        ));
    }
    out.push_str(&format!(
        "  R-squared {}  adj. R-squared {}  F-statistic {}  Prob(F) {}\n",
        fmt_stat(fit.r_squared, 0, 4),
        fmt_stat(fit.adj_r_squared, 0, 4),
        fmt_stat(fit.f_statistic, 0, 3),
        fmt_stat(fit.f_p_value, 0, 4),
    ));
    out
}

pub fn format_expected(er: &ExpectedReturn, periods_per_year: f64) -> String {
    let mut out = String::new();
    for p in &er.premiums {
        out.push_str(&format!(
            "  premium {:<12} beta {:>9.4}  premium {:>+9.5}%\n",
            p.factor,
            p.beta,
            p.premium * 100.0
        ));
    }
    out.push_str(&format!(
        "  APT expected return {:+.5}% per period ({:+.2}% annualized), realized mean {:+.5}%\n",
        er.expected * 100.0,
        er.annualized(periods_per_year) * 100.0,
        er.realized_mean * 100.0
    ));
    out
}
