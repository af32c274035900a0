use stock_datastore::config::Config;
use stock_datastore::data_provider::{LoadOptions, StockSeries};
use stock_datastore::models::bar::SeriesKind;
use stock_datastore::services::{append_quotes_csv, InfoService, QuoteTracker, UpdateService};
use stock_datastore::sources::{CsvDumpSource, DataSource, RetryPolicy, RetryingSource, SinaQuoteClient};
use stock_datastore::store::DateBounds;
use stock_datastore::util;

use anyhow::{anyhow, Context};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    // 创建基本的命令行应用
    let app = App::new("stock_datastore")
        .version("2025.6.1")
        .author("stock_datastore developers")
        .about("Incremental binary store for equity daily and 5-minute bars")
        .arg(
            Arg::with_name("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file, created with defaults if missing")
                .takes_value(true)
                .default_value("config.toml"),
        );

    // 在开发模式下添加调试参数
    #[cfg(debug_assertions)]
    let app = app.arg(
        Arg::with_name("debug")
            .long("debug")
            .help("Enable debug mode")
            .takes_value(false),
    )
    .arg(
        Arg::with_name("debug-limit")
            .long("debug-limit")
            .help("Limit the number of stocks to process in debug mode")
            .takes_value(true)
            .default_value("2"),
    );

    // 添加子命令
    let app = app.subcommand(
        SubCommand::with_name("update")
            .about("Append new daily and 5-minute bars for the update list")
            .arg(Arg::with_name("kd").long("kd").help("Update daily bars"))
            .arg(Arg::with_name("k5").long("k5").help("Update 5-minute bars"))
            .arg(
                Arg::with_name("list")
                    .short('l')
                    .long("list")
                    .value_name("NAME")
                    .help("Stock list file under the list directory")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("symbol")
                    .short('s')
                    .long("symbol")
                    .value_name("CODE")
                    .help("Update a single symbol instead of the list")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("source-dir")
                    .long("source-dir")
                    .value_name("DIR")
                    .help("Directory of exported market data CSV files")
                    .required(true)
                    .takes_value(true),
            ),
    ).subcommand(
        SubCommand::with_name("info")
            .about("Refresh stock, industry and constituent lists")
            .arg(
                Arg::with_name("source-dir")
                    .long("source-dir")
                    .value_name("DIR")
                    .help("Directory of exported market data CSV files")
                    .required(true)
                    .takes_value(true),
            ),
    ).subcommand(
        SubCommand::with_name("explore")
            .about("Show stored bars of one symbol")
            .arg(
                Arg::with_name("symbol")
                    .short('s')
                    .long("symbol")
                    .value_name("CODE")
                    .help("Stock code, e.g. 600000 or sh.600000")
                    .required(true)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("kind")
                    .short('k')
                    .long("kind")
                    .value_name("KIND")
                    .help("Series kind (kd, k5)")
                    .takes_value(true)
                    .default_value("kd"),
            )
            .arg(
                Arg::with_name("days")
                    .short('d')
                    .long("days")
                    .value_name("DAYS")
                    .help("Number of trailing days to read")
                    .takes_value(true)
                    .default_value("10"),
            )
            .arg(
                Arg::with_name("start")
                    .long("start")
                    .value_name("YYMMDD")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("end")
                    .long("end")
                    .value_name("YYMMDD")
                    .takes_value(true),
            )
            .arg(Arg::with_name("sync").long("sync").help("Align daily and 5-minute bars"))
            .arg(Arg::with_name("json").long("json").help("Print as JSON")),
    ).subcommand(
        SubCommand::with_name("quote")
            .about("Fetch real-time quote snapshots")
            .arg(
                Arg::with_name("symbols")
                    .long("symbols")
                    .value_name("CODES")
                    .help("Comma separated stock codes")
                    .required(true)
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("csv")
                    .long("csv")
                    .value_name("DIR")
                    .help("Append changed snapshots to CSV files in DIR")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("rounds")
                    .long("rounds")
                    .value_name("N")
                    .takes_value(true)
                    .default_value("1"),
            )
            .arg(
                Arg::with_name("interval")
                    .long("interval")
                    .value_name("SECS")
                    .takes_value(true)
                    .default_value("10"),
            ),
    );

    let matches = app.get_matches();

    // 获取调试模式设置
    #[cfg(debug_assertions)]
    let debug_mode = matches.is_present("debug");
    #[cfg(not(debug_assertions))]
    let debug_mode = false;

    #[cfg(debug_assertions)]
    let debug_stock_limit = matches.value_of("debug-limit")
        .unwrap_or("2")
        .parse::<usize>()
        .unwrap_or(2);
    #[cfg(not(debug_assertions))]
    let debug_stock_limit = usize::MAX;

    let config_path = matches.value_of("config").unwrap_or("config.toml");
    let config = Config::load_or_create(config_path)
        .with_context(|| format!("loading {}", config_path))?
        .with_debug_mode(debug_mode)
        .with_debug_stock_limit(debug_stock_limit);

    if let Some(matches) = matches.subcommand_matches("update") {
        run_update(config, matches).await?;
    } else if let Some(matches) = matches.subcommand_matches("info") {
        let source = open_source(&config, matches)?;
        let summary = InfoService::new(config, source).update_all_info().await?;
        for (kind, count) in &summary.constituents {
            info!("{}: {} members", kind.tag(), count);
        }
    } else if let Some(matches) = matches.subcommand_matches("explore") {
        run_explore(&config, matches)?;
    } else if let Some(matches) = matches.subcommand_matches("quote") {
        run_quote(&config, matches).await?;
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}

fn open_source(config: &Config, matches: &ArgMatches) -> anyhow::Result<Arc<dyn DataSource>> {
    let dir = matches.value_of("source-dir").ok_or_else(|| anyhow!("--source-dir is required"))?;
    let source = RetryingSource::new(CsvDumpSource::new(dir), RetryPolicy::from_config(config));
    Ok(Arc::new(source))
}

/// 不带交易所前缀的代码按配置补全
fn qualify_symbol(config: &Config, symbol: &str) -> anyhow::Result<String> {
    if symbol.contains('.') {
        Ok(symbol.to_string())
    } else {
        Ok(config.exchange_table()?.qualify(symbol)?)
    }
}

async fn run_update(config: Config, matches: &ArgMatches) -> anyhow::Result<()> {
    // 都未指定时两种序列都更新
    let (kd, k5) = match (matches.is_present("kd"), matches.is_present("k5")) {
        (false, false) => (true, true),
        flags => flags,
    };
    let config = match matches.value_of("list") {
        Some(list) => config.with_update_list(list),
        None => config,
    };
    let today = util::today_in(&util::parse_timezone(&config.timezone)?);
    let source = open_source(&config, matches)?;
    let service = UpdateService::new(config, source.clone());

    if let Some(symbol) = matches.value_of("symbol") {
        let code = qualify_symbol(service.config(), symbol)?;
        let session = source.login().await?;
        let mut reports = Vec::new();
        if kd {
            reports.push(service.update_kd(&session, &code, today).await);
        }
        if k5 {
            reports.push(service.update_k5(&session, &code, today).await);
        }
        source.logout(session).await?;
        for report in reports {
            let report = report?;
            info!("{} {} {:?}: fetched {}, appended {}, skipped {}, data errors {}",
                  report.code, report.kind, report.state, report.fetched,
                  report.appended, report.skipped, report.data_errors);
        }
        return Ok(());
    }

    let list = service.load_update_list()?;
    let summary = service.update_all(list.list(), kd, k5, today).await?;
    for (code, reason) in &summary.failures {
        error!("{} failed: {}", code, reason);
    }
    info!("kd appended {}, k5 appended {}", summary.kd_appended, summary.k5_appended);
    Ok(())
}

fn parse_bound(matches: &ArgMatches, name: &str, default: u32) -> anyhow::Result<u32> {
    match matches.value_of(name) {
        Some(raw) => util::normalize_date(raw).ok_or_else(|| anyhow!("Invalid --{}: {}", name, raw)),
        None => Ok(default),
    }
}

fn run_explore(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let symbol = matches.value_of("symbol").ok_or_else(|| anyhow!("--symbol is required"))?;
    let code = qualify_symbol(config, symbol)?;
    let kind_tag = matches.value_of("kind").unwrap_or("kd");
    let kind = SeriesKind::from_tag(kind_tag).ok_or_else(|| anyhow!("Unknown kind: {}", kind_tag))?;
    let days = matches.value_of("days").unwrap_or("10").parse::<usize>()?;
    let bounds = DateBounds::new(
        parse_bound(matches, "start", DateBounds::ALL.start)?,
        parse_bound(matches, "end", DateBounds::ALL.end)?,
    );
    let sync = matches.is_present("sync");

    // 对齐需要同时读取两种序列
    let options = match (kind, sync) {
        (_, true) => LoadOptions::new(days + 1, days),
        (SeriesKind::Daily, false) => LoadOptions::new(days, 0),
        (SeriesKind::Intraday, false) => LoadOptions::new(0, days),
    }
    .with_sync(sync)
    .with_bounds(bounds);

    let series = StockSeries::load(config, &code, options)?;
    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    println!("{} ({} kd, {} k5 days, sync {})", series.code, series.kd.len(), series.k5.len(), series.sync_len);
    match kind {
        SeriesKind::Daily => series.kd.iter().for_each(|bar| println!("{}", bar)),
        SeriesKind::Intraday => series.k5.iter().flatten().for_each(|bar| println!("{}", bar)),
    }
    Ok(())
}

async fn run_quote(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let table = config.exchange_table()?;
    let symbols = matches
        .value_of("symbols")
        .ok_or_else(|| anyhow!("--symbols is required"))?
        .split(',')
        .map(|s| table.to_sina(s.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    let rounds = matches.value_of("rounds").unwrap_or("1").parse::<usize>()?;
    let interval = Duration::from_secs(matches.value_of("interval").unwrap_or("10").parse::<u64>()?);
    let csv_dir = matches.value_of("csv");

    let client = SinaQuoteClient::new()?;
    let mut tracker = QuoteTracker::new();
    for round in 0..rounds {
        if round > 0 {
            tokio::time::sleep(interval).await;
        }
        let quotes = match client.fetch(&symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Quote request failed: {}", e);
                continue;
            }
        };

        let changed: Vec<_> = tracker
            .observe(quotes)
            .into_iter()
            .filter(|(_, change)| change.is_change())
            .map(|(quote, _)| quote)
            .collect();
        for quote in &changed {
            println!("{}", quote);
        }
        if let Some(dir) = csv_dir {
            append_quotes_csv(dir, &changed)?;
        }
    }
    Ok(())
}
