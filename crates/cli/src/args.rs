//! Command-line surface.
//!
//! Every global option can also be set through a `PLAYREVIEWS_*`
//! environment variable; flags win over the environment.

use batchexecute::{
    AppId, ContinuationToken, Device, ReviewQuery, ScoreFilter, Sort, TokenLayout,
    DEFAULT_BASE_URL, DEFAULT_MAX_PER_FETCH,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "playreviews")]
#[command(about = "Fetch storefront reviews, app details, permissions and searches as JSON lines")]
#[command(version)]
#[command(
    after_help = "Environment:\n  PLAYREVIEWS_LOG_JSON       JSON log lines on stderr\n  PLAYREVIEWS_OTEL_ENABLED   Export spans over OTLP\n  RUST_LOG                   Log filter (default: info)"
)]
pub struct Cli {
    /// Storefront origin.
    #[arg(long, global = true, env = "PLAYREVIEWS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, global = true, env = "PLAYREVIEWS_LANG", default_value = "en")]
    pub lang: String,

    #[arg(long, global = true, env = "PLAYREVIEWS_COUNTRY", default_value = "us")]
    pub country: String,

    /// Largest page size requested in one call.
    #[arg(long, global = true, env = "PLAYREVIEWS_MAX_PER_FETCH", default_value_t = DEFAULT_MAX_PER_FETCH)]
    pub max_per_fetch: usize,

    /// Where the next-page token is read from in review responses.
    #[arg(long, global = true, env = "PLAYREVIEWS_TOKEN_LAYOUT", value_enum, default_value_t = TokenLayoutArg::Trailing)]
    pub token_layout: TokenLayoutArg,

    /// Give up on further pages after this many seconds.
    #[arg(long, global = true, env = "PLAYREVIEWS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Serve requests from the in-memory mock storefront instead of the
    /// network.
    #[arg(long, global = true, env = "PLAYREVIEWS_MOCK", default_value_t = false)]
    pub mock: bool,

    /// Synthesis seed for `--mock`.
    #[arg(long, global = true, env = "PLAYREVIEWS_MOCK_SEED", default_value_t = 42)]
    pub mock_seed: u64,

    /// Reviews per app for `--mock`.
    #[arg(long, global = true, env = "PLAYREVIEWS_MOCK_TOTAL_REVIEWS", default_value_t = 500)]
    pub mock_total_reviews: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one batch of reviews; prints the continuation token on stderr.
    Reviews {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
        /// Total reviews wanted across pages.
        #[arg(long, default_value_t = 100)]
        count: usize,
        #[command(flatten)]
        filters: FilterArgs,
        /// Continue from a token printed by an earlier run (JSON). Its
        /// filters take precedence over the flags.
        #[arg(long, value_parser = parse_token)]
        resume: Option<ContinuationToken>,
    },
    /// Fetch every review the storefront hands out.
    ReviewsAll {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
        #[command(flatten)]
        filters: FilterArgs,
        /// Sleep between calls, in milliseconds.
        #[arg(long, default_value_t = 0)]
        pause_ms: u64,
    },
    /// Fetch an app's detail record.
    Detail {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
    },
    /// Fetch an app's permissions, grouped.
    Permissions {
        #[arg(value_parser = parse_app_id)]
        app_id: AppId,
    },
    /// Search the storefront for apps.
    Search {
        query: String,
        /// Most results to print, the top result included.
        #[arg(long, default_value_t = 30)]
        n_hits: usize,
    },
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    #[arg(long, default_value_t = Sort::Newest)]
    pub sort: Sort,
    /// Only reviews with this many stars (1-5).
    #[arg(long)]
    pub score: Option<ScoreFilter>,
    /// Only reviews written on this device class.
    #[arg(long)]
    pub device: Option<Device>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenLayoutArg {
    Trailing,
    Positional,
}

impl From<TokenLayoutArg> for TokenLayout {
    fn from(arg: TokenLayoutArg) -> Self {
        match arg {
            TokenLayoutArg::Trailing => Self::Trailing,
            TokenLayoutArg::Positional => Self::Positional,
        }
    }
}

impl FilterArgs {
    /// `query` narrowed by these filters.
    pub fn apply(&self, query: ReviewQuery) -> ReviewQuery {
        ReviewQuery {
            sort: self.sort,
            score_filter: self.score,
            device_filter: self.device,
            ..query
        }
    }
}

fn parse_app_id(raw: &str) -> Result<AppId, String> {
    AppId::new(raw.trim()).ok_or_else(|| "app id must not be empty".to_string())
}

fn parse_token(raw: &str) -> Result<ContinuationToken, String> {
    serde_json::from_str(raw).map_err(|e| format!("not a continuation token: {e}"))
}
