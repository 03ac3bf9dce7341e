use anyhow::Context;
use bridge::server::{default_bind_address, CaptionBridge};
use captioncore::captions::CaptionScheduler;
use captioncore::prelude::RecognitionHook;
use captioncore::CaptionSink;
use clap::Parser;
use format::{CaptionFormatter, FormattedSink};
use generator::events::{build_scenario, GeneratorConfig};
use relay::RelayHub;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ScenarioConfig;
use workflow::runner::{ReplayResult, Runner, LOCAL_PEER};

mod bridge;
mod format;
mod generator;
mod relay;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Replays sound scenarios through the caption pipeline")]
struct Args {
    /// Load a scenario from YAML instead of generating one
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 40)]
    ticks: usize,
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
    /// Number of random events when no scenario file is given
    #[arg(long, default_value_t = 24)]
    events: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Override the number of caption lines shown at once
    #[arg(long)]
    max_lines: Option<usize>,
    /// Keep a live scheduler behind the HTTP bridge until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn print_replay(name: &str, result: &ReplayResult) {
    println!("Scenario {name}");
    for frame in result.frames.iter().filter(|frame| !frame.lines.is_empty()) {
        println!("[{:>6} ms]", frame.at_ms);
        for line in &frame.lines {
            println!("    {:.2} {}", line.alpha, line.text);
        }
    }
    let m = result.metrics;
    println!(
        "inserted={} refreshed={} suppressed={} expired={} relayed={} uncaptioned={} inaudible={}",
        m.inserted,
        m.refreshed,
        m.suppressed,
        m.expired,
        result.relayed,
        result.uncaptioned,
        result.inaudible
    );
    for (peer, count) in &result.remote_inserted {
        println!("peer {peer} received {count} captions");
    }
}

fn serve(scenario: &ScenarioConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let scheduler = Arc::new(
        CaptionScheduler::validated(scenario.captions.clone()).context("building live scheduler")?,
    );
    scheduler
        .start_sweeper()
        .context("starting caption sweeper")?;

    let formatter = Arc::new(CaptionFormatter::new(&scenario.format));
    let local_sink: Arc<dyn CaptionSink> = Arc::new(FormattedSink::new(
        scheduler.clone(),
        formatter,
        scenario.format.human_colour.clone(),
    ));
    let hub = Arc::new(RelayHub::new());
    hub.join(LOCAL_PEER, local_sink.clone());

    let hook = Arc::new(RecognitionHook::new());
    if scenario.options.speech_to_text {
        let echo = scenario.options.self_captions.then(|| local_sink.clone());
        hook.register(move |text| {
            hub.broadcast(LOCAL_PEER, text);
            if let Some(sink) = &echo {
                sink.submit(text, None, 0.0);
            }
        })
        .context("registering speech handler")?;
    }

    let bridge = CaptionBridge::new(
        scheduler.clone(),
        local_sink,
        hook,
        scenario.captions.max_visible_lines,
    );
    bridge.serve(addr)?;
    println!("Caption bridge on http://{addr} (Ctrl+C to stop)...");

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    runtime.block_on(async {
        signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
        Ok::<(), anyhow::Error>(())
    })?;

    scheduler.shutdown();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scenario = if let Some(path) = args.scenario.as_ref() {
        ScenarioConfig::load(path)?
    } else {
        build_scenario(&GeneratorConfig {
            events: args.events,
            seed: args.seed,
            ..Default::default()
        })
        .context("generating scenario")?
    };
    if let Some(max_lines) = args.max_lines {
        scenario.captions.max_visible_lines = max_lines;
    }
    scenario.validate()?;

    let name = scenario.name.clone().unwrap_or_else(|| "unnamed".into());
    let runner = Runner::new(scenario);
    let result = runner
        .execute(args.ticks, args.tick_ms)
        .with_context(|| format!("replaying scenario {name}"))?;
    print_replay(&name, &result);

    if args.serve {
        serve(runner.config(), args.bind.unwrap_or_else(default_bind_address))?;
    }

    Ok(())
}
