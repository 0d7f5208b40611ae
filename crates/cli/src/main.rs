//! `playreviews`: composition root of the workspace.
//!
//! 1. **Parse arguments** with `clap`, flags overridable from `PLAYREVIEWS_*`.
//! 2. **Wire observability**: `tracing-subscriber` with an optional JSON layer
//!    and an optional OpenTelemetry OTLP exporter. Spans and events from
//!    every crate flow through it.
//! 3. **Select the transport**: `reqwest` against the live storefront, or the
//!    in-memory mock storefront with `--mock`.
//! 4. **Run one command** and print records as JSON lines on stdout. Ctrl-C
//!    stops pagination before the next page; `--timeout-secs` bounds it.

mod args;
mod telemetry;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use args::{Cli, Command};
use batchexecute::{
    CancelFlag, ClientConfig, ExtractionSchema, FetchControl, ReviewQuery, StorefrontClient,
    Transport,
};
use clap::Parser;
use http_transport::{HttpSettings, HttpTransport};
use mock_server::{standard_storefront, InMemoryStorefront};
use serde::Serialize;
use tracing::{info, warn};

fn client_config(cli: &Cli) -> ClientConfig {
    ClientConfig {
        lang: cli.lang.clone(),
        country: cli.country.clone(),
        max_per_fetch: cli.max_per_fetch,
        token_layout: cli.token_layout.into(),
        ..ClientConfig::default()
    }
    .with_base_url(cli.base_url.as_str())
}

/// Raises `flag` on the first Ctrl-C.
fn cancel_on_ctrl_c(flag: CancelFlag) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupted; stopping before the next page");
                flag.cancel();
            }
            Err(error) => warn!(%error, "could not listen for ctrl-c"),
        }
    });
}

fn print_line(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value).context("failed to serialise output")?;
    writeln!(out).context("failed to write output")
}

fn write_lines<'a, V: Serialize + 'a>(values: impl IntoIterator<Item = &'a V>) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for value in values {
        print_line(&mut out, value)?;
    }
    out.flush().context("failed to flush output")
}

async fn run<T: Transport>(
    cli: &Cli,
    client: StorefrontClient<T>,
    control: FetchControl,
) -> anyhow::Result<()> {
    match &cli.command {
        Command::Reviews {
            app_id,
            count,
            filters,
            resume,
        } => {
            let batch = match resume {
                Some(token) => client.resume(app_id, token.clone(), &control).await,
                None => {
                    let query = filters.apply(ReviewQuery::for_config(client.config(), *count));
                    client.reviews(app_id, &query, &control).await
                }
            }
            .with_context(|| format!("failed to fetch reviews for {app_id}"))?;
            write_lines(&batch.records)?;
            info!(app_id = %app_id, fetched = batch.records.len(), "reviews written");
            if let Some(next) = &batch.next {
                print_line(&mut io::stderr().lock(), next)?;
            }
            Ok(())
        }
        Command::ReviewsAll {
            app_id,
            filters,
            pause_ms,
        } => {
            let query = filters.apply(ReviewQuery::for_config(client.config(), cli.max_per_fetch));
            let pause = Duration::from_millis(*pause_ms);
            let records = client
                .reviews_all(app_id, &query, &control, || tokio::time::sleep(pause))
                .await
                .with_context(|| format!("failed to fetch all reviews for {app_id}"))?;
            write_lines(&records)
        }
        Command::Detail { app_id } => {
            let detail = client
                .app_detail(app_id)
                .await
                .with_context(|| format!("failed to fetch details for {app_id}"))?;
            write_lines([&detail])
        }
        Command::Permissions { app_id } => {
            let groups = client
                .permissions(app_id)
                .await
                .with_context(|| format!("failed to fetch permissions for {app_id}"))?;
            write_lines([&groups])
        }
        Command::Search { query, n_hits } => {
            let results = client
                .search(query, *n_hits)
                .await
                .with_context(|| format!("failed to search for {query:?}"))?;
            info!(query = %query, found = results.len(), "search results written");
            write_lines(&results)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init_tracing()?;

    let cancel = CancelFlag::new();
    cancel_on_ctrl_c(cancel.clone());
    let mut control = FetchControl::unbounded().with_cancel(cancel);
    if let Some(secs) = cli.timeout_secs {
        control = control.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let schema = Arc::new(ExtractionSchema::standard());
    let config = client_config(&cli);
    if cli.mock {
        info!(seed = cli.mock_seed, total_reviews = cli.mock_total_reviews, "using mock storefront");
        let transport = InMemoryStorefront::new(standard_storefront(cli.mock_seed, cli.mock_total_reviews));
        run(&cli, StorefrontClient::new(transport, schema, config), control).await
    } else {
        let transport =
            HttpTransport::new(HttpSettings::default()).context("failed to build HTTP transport")?;
        run(&cli, StorefrontClient::new(transport, schema, config), control).await
    }
}
