//! uhi-watch
//!
//! Headless dashboard: loads the feeds once, optionally places interventions
//! and runs a simulation, then prints what the dashboard would show.

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use crossbeam_channel::{select, Receiver};
use tracing_subscriber::EnvFilter;

use uhi_sync::recommendation::priority_counts;
use uhi_sync::{
    Dashboard, DashboardConfig, FeedState, FeedUpdate, InterventionType, MetricsView, UhiError,
};

/// Command-line options
struct Options {
    /// Service address override
    url: Option<String>,
    /// Interventions to place before simulating
    placements: Vec<(InterventionType, f64, f64)>,
    /// Run one simulation after loading
    simulate: bool,
    /// Keep printing feed updates for this long
    watch: Option<Duration>,
}

fn usage() {
    println!("uhi-watch - headless UHI mitigation dashboard");
    println!();
    println!("USAGE:");
    println!("    uhi-watch [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -u, --url <URL>               Analytics service [env: UHI_API_URL]");
    println!("    -p, --place <TYPE:LAT:LON>    Place an intervention (repeatable)");
    println!("                                  TYPE is trees, cool_roof, park or green_roof");
    println!("    -s, --simulate                Run one simulation after loading");
    println!("    -w, --watch <SECS>            Keep printing feed updates for SECS seconds");
    println!("    -h, --help                    Print help information");
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

fn parse_placement(raw: &str) -> Option<(InterventionType, f64, f64)> {
    let mut parts = raw.splitn(3, ':');
    let kind = parts.next()?.parse().ok()?;
    let lat = parts.next()?.parse().ok()?;
    let lon = parts.next()?.parse().ok()?;
    Some((kind, lat, lon))
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        url: None,
        placements: Vec::new(),
        simulate: false,
        watch: None,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--url" | "-u" => {
                let Some(url) = value else { fail("--url requires a value") };
                options.url = Some(url.clone());
                i += 2;
            }
            "--place" | "-p" => {
                let Some(raw) = value else { fail("--place requires a value") };
                let Some(placement) = parse_placement(raw) else {
                    fail(&format!("invalid placement: {raw} (expected TYPE:LAT:LON)"))
                };
                options.placements.push(placement);
                i += 2;
            }
            "--simulate" | "-s" => {
                options.simulate = true;
                i += 1;
            }
            "--watch" | "-w" => {
                let Some(secs) = value.and_then(|v| v.parse::<u64>().ok()) else {
                    fail("--watch requires a number of seconds")
                };
                options.watch = Some(Duration::from_secs(secs));
                i += 2;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            arg => fail(&format!("unknown argument: {arg}")),
        }
    }

    options
}

fn wait_first(rx: &Receiver<FeedUpdate>, timeout: Duration) {
    // A feed that never answers is reported by its state, not here.
    let _ = rx.recv_timeout(timeout);
}

fn print_state<T>(label: &str, state: &FeedState<T>, describe: impl Fn(&T) -> String) {
    match (&state.data, &state.error) {
        (_, Some(err)) => println!("{label:<20} {:?}: {}", state.phase, err.message),
        (Some(data), None) => println!("{label:<20} {:?}: {}", state.phase, describe(data)),
        (None, None) => println!("{label:<20} {:?}", state.phase),
    }
}

fn print_feeds(dashboard: &Dashboard) {
    match dashboard.heatmap() {
        Some(heatmap) => println!(
            "{:<20} {} features, city {}, avg {}",
            "heatmap",
            heatmap.features.len(),
            heatmap.metadata.city.as_deref().unwrap_or("unknown"),
            heatmap
                .avg_temperature()
                .map_or_else(|| "n/a".to_string(), |t| format!("{t:.1}°C")),
        ),
        None => println!("{:<20} pending", "heatmap"),
    }

    print_state("recommendations", &dashboard.recommendations(), |recs| {
        let [high, medium, low] = priority_counts(recs);
        format!("{} total ({high} high, {medium} medium, {low} low)", recs.len())
    });
    print_state("health precautions", &dashboard.health_precautions(), |items| {
        format!("{} total", items.len())
    });
    println!("{:<20} {}", "active alerts", dashboard.active_alerts());
}

fn print_metrics(view: &MetricsView) {
    let headline = view.headline();
    let deltas = view.deltas();
    println!();
    println!("{:<20} {:<12} {}", "temperature", headline.temperature, deltas.temperature);
    println!("{:<20} {:<12} {}", "energy saving", headline.energy, deltas.energy);
    println!("{:<20} {:<12} {}", "co2 reduction", headline.co2, deltas.co2);
    println!("{:<20} {:<12} {}", "health index", headline.health, deltas.health);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();

    let mut config = DashboardConfig::from_env();
    if let Some(url) = options.url {
        config.client.base_url = url;
    }
    let load_timeout = config.client.timeout + Duration::from_secs(1);

    let mut dashboard = Dashboard::new(config).context("failed to build dashboard")?;
    let feeds = [
        dashboard.heatmap_feed().subscribe(),
        dashboard.recommendations_feed().subscribe(),
        dashboard.health_feed().subscribe(),
    ];
    dashboard.start().context("failed to start feeds")?;
    println!("uhi-watch - {}", dashboard.base_url());
    println!();

    for rx in &feeds {
        wait_first(rx, load_timeout);
    }
    print_feeds(&dashboard);

    for (kind, lat, lon) in options.placements {
        let id = dashboard.place_intervention(kind, lat, lon);
        println!("placed {kind} at ({lat}, {lon}) as #{}", id.as_i64());
    }

    if options.simulate {
        match dashboard.simulate() {
            Ok(outcome) => println!("simulated {} interventions", outcome.items),
            Err(UhiError::Simulation(err)) => eprintln!("{}", err.user_message()),
            Err(err) if err.is_validation() => bail!("nothing to simulate: use --place"),
            Err(err) => return Err(err.into()),
        }
    }
    print_metrics(&dashboard.metrics());

    if let Some(watch) = options.watch {
        let deadline = Instant::now() + watch;
        let [heatmap, recommendations, health] = &feeds;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let update = select! {
                recv(heatmap) -> u => u.ok(),
                recv(recommendations) -> u => u.ok(),
                recv(health) -> u => u.ok(),
                default(remaining) => None,
            };
            if let Some(update) = update {
                println!(
                    "[{}] {} {:?} ({:?})",
                    update.at.format("%H:%M:%S"),
                    update.feed,
                    update.phase,
                    update.mode
                );
            }
        }
        println!();
        print_feeds(&dashboard);
    }

    dashboard.shutdown();
    Ok(())
}
