mod cli;

// remote imports
use clap::Parser;
use cli::{Cli, TraceLevel};
use dotenv::var;
use indicatif::{ProgressBar, ProgressStyle};
use sp500_spider::cache::{CacheStore, Category};
use sp500_spider::providers::{AlphaVantage, CompanySource, TwelveData};
use sp500_spider::scheduler::{Scheduler, TickOutcome};
use sp500_spider::wiki::WikiClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

////////////////////////////////////////////////////////////////////////////

const DEFAULT_PORT: u16 = 5000;

// set the trace level
fn preprocess(trace_level: Level) {
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

////////////////////////////////////////////////////////////////////////////

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    if let Some(trace_level) = cli.trace {
        preprocess(match trace_level {
            TraceLevel::DEBUG => Level::DEBUG,
            TraceLevel::ERROR => Level::ERROR,
            TraceLevel::INFO => Level::INFO,
            TraceLevel::TRACE => Level::TRACE,
            TraceLevel::WARN => Level::WARN,
        });
    }
    trace!("command line input recorded: {cli:?}");

    let snapshot = var("SP500_CACHE_PATH").ok().map(PathBuf::from);
    let store = CacheStore::open(snapshot).await?;

    // read cli inputs
    use cli::Commands::*;
    match cli.command {
        // `sp500 run`: the long-running service
        Run { port } => {
            let port = port
                .or_else(|| var("SP500_PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(DEFAULT_PORT);

            let sources: Vec<Arc<dyn CompanySource>> = vec![
                Arc::new(AlphaVantage::from_env()),
                Arc::new(TwelveData::from_env()),
            ];
            let sched = Arc::new(Scheduler::new(
                store.clone(),
                Arc::new(WikiClient::new()),
                sources,
            ));

            sched.clone().start().await?;
            info!("serving query endpoints on port {port}");
            sp500_server::serve(store, port).await?;
            sched.stop();
        }

        // `sp500 refresh [--sweep]`: one-shot, then exit
        Refresh { sweep } => {
            let sources: Vec<Arc<dyn CompanySource>> = if sweep {
                vec![
                    Arc::new(AlphaVantage::from_env()),
                    Arc::new(TwelveData::from_env()),
                ]
            } else {
                vec![]
            };
            let sched = Scheduler::new(store, Arc::new(WikiClient::new()), sources);

            let count = sched.primary_refresh().await?;
            println!("roster refreshed, {count} symbols");

            if sweep {
                for category in [Category::Info, Category::TimeSeries] {
                    run_sweep(&sched, category).await?;
                }
            }
        }
    }

    Ok(())
}

/// Walk one sweep to completion, pacing ticks to the provider's interval so
/// an operator run respects the same quotas as the background timers.
async fn run_sweep(sched: &Scheduler, category: Category) -> anyhow::Result<()> {
    if !sched.begin_sweep(category).await? {
        return Ok(());
    }

    // progress bar
    let total = sched.pending(category).await as u64;
    let pb = ProgressBar::new(total).with_style(
        ProgressStyle::default_bar()
            .template(
                "{msg} {spinner:.magenta}\n\
                [{elapsed_precise:.magenta}] |{bar:40.cyan/blue}| {human_pos}/{human_len} \
                [Rate: {per_sec:.magenta}, ETA: {eta:.blue}]",
            )?
            .progress_chars("##-"),
    );
    pb.set_message(format!("sweeping {category} ..."));

    loop {
        match sched.sweep_tick(category).await {
            TickOutcome::Drained => break,
            TickOutcome::Stored(_) | TickOutcome::Skipped(_) => pb.inc(1),
        }
        if let Some(pause) = sched.tick_interval(category) {
            tokio::time::sleep(pause).await;
        }
    }

    pb.finish_and_clear();
    println!("sweeping {category} ... done");
    Ok(())
}
