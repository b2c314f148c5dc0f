use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use nexus_stats::{week_of, QuickSelect};
use nexus_stats_server::api::ApiClient;
use nexus_stats_server::bitmap::render_svg_to_png;
use nexus_stats_server::routes::{build_trend_svg, router, AppState, ChartDefaults, ChartQuery};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render community statistics charts")]
struct Args {
    /// Base URL of the community API (e.g. https://example.org/api)
    #[arg(long, env = "NEXUS_API_BASE")]
    api_base: String,
    /// Bearer token sent with API requests
    #[arg(long, env = "NEXUS_API_TOKEN")]
    api_token: Option<String>,
    /// HTTP server port
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,
    /// Enable HTTP server mode
    #[arg(long, default_value = "false")]
    serve: bool,
    /// Default chart width in logical pixels
    #[arg(long, default_value = "800")]
    width: f64,
    /// Default chart height in logical pixels
    #[arg(long, default_value = "400")]
    height: f64,
    /// Default device pixel ratio
    #[arg(long, default_value = "1.0")]
    dpr: f64,
    /// Directory for one-shot output
    #[arg(long, default_value = ".")]
    output: PathBuf,
    /// Also write a PNG next to the SVG
    #[arg(long, default_value = "false")]
    png: bool,
    /// Limit the one-shot chart to the week containing this day (YYYY-MM-DD)
    #[arg(long, conflicts_with = "quick")]
    week: Option<NaiveDate>,
    /// Limit the one-shot chart to this-week or last-week
    #[arg(long)]
    quick: Option<QuickSelect>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let api = ApiClient::new(&args.api_base, args.api_token.clone());
    let defaults = ChartDefaults {
        width: args.width,
        height: args.height,
        pixel_ratio: args.dpr,
    };

    if args.serve {
        let state = AppState { api, defaults };
        let app = router(state);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(%addr, api = %args.api_base, "serving statistics charts");
        axum::serve(listener, app).await?;
        return Ok(());
    }

    let range = match (args.week, args.quick) {
        (Some(day), _) => Some(week_of(day).ok_or("--week is outside the supported date range")?),
        (None, Some(kind)) => Some(
            kind.range_at(Local::now().date_naive())
                .ok_or("today is outside the supported date range")?,
        ),
        (None, None) => None,
    };
    let query = ChartQuery {
        start_date: range.map(|r| r.start),
        end_date: range.map(|r| r.end),
        ..Default::default()
    };
    if let Some(range) = range {
        info!(%range, "limiting chart to week");
    }

    let svg = match build_trend_svg(&api, &defaults, &query).await {
        Ok(svg) => svg,
        Err(e) => {
            error!(status = %e.status, "could not build trend chart: {}", e.message);
            std::process::exit(1);
        }
    };

    let svg_path = args.output.join("trend.svg");
    std::fs::write(&svg_path, &svg)?;
    info!(path = %svg_path.display(), "trend chart written");

    if args.png {
        let png_path = args.output.join("trend.png");
        std::fs::write(&png_path, render_svg_to_png(&svg)?)?;
        info!(path = %png_path.display(), "trend chart rasterized");
    }

    Ok(())
}
