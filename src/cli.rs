use clap::{Args, Parser, Subcommand};
use log::info;
use url::Url;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::dispatcher::HttpSearchClient;
use crate::error::ArtQueryError;
use crate::request_body::SearchRequest;
use crate::state::{QueryState, SortField};
use crate::storefront::Storefront;
use crate::url_sync::{MemoryHistory, UrlSync};

#[derive(Parser)]
#[command(
    name = "artquery",
    version,
    about = "artquery: query state, deep links and search for the arts listing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the search server (default if no command specified)
    Serve,

    /// Print the deep link for a query
    Url {
        /// Page the link points at
        #[arg(long, default_value = "http://127.0.0.1:8080/arts")]
        base: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the query state held in a deep link
    Decode {
        /// URL carrying a `req` parameter
        url: String,
    },

    /// Run one search against the configured server and print the results
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Search text matched against name, description and creator
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// Required tag (repeatable)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    #[arg(long)]
    pub min_price: Option<i64>,

    #[arg(long)]
    pub max_price: Option<i64>,

    /// Sort field, e.g. "price" or "weeklyStars"
    #[arg(long)]
    pub sort_by: Option<SortField>,

    /// Sort ascending (default is descending)
    #[arg(long, requires = "sort_by")]
    pub asc: bool,

    #[arg(long, short = 'p', default_value_t = 1)]
    pub page: i64,

    /// Page size (defaults to the configured page limit)
    #[arg(long, short = 'l')]
    pub limit: Option<i64>,
}

impl QueryArgs {
    pub fn to_state(&self, default_limit: i64) -> QueryState {
        let mut state = QueryState::with_limit(self.limit.unwrap_or(default_limit));
        state.search = self.search.clone();
        state.filter.tags = self.tags.iter().cloned().collect();
        state.filter.min_price = self.min_price;
        state.filter.max_price = self.max_price;
        state.sort.by = self.sort_by.map(|f| f.to_string()).unwrap_or_default();
        state.sort.asc = self.asc;
        state.pagination.page = self.page;
        state
    }
}

impl Cli {
    pub fn handle_command_line() -> Result<(), ArtQueryError> {
        let args = Cli::parse();
        let config = Config::get();

        // Default to Serve if no command specified
        match args.command.unwrap_or(Command::Serve) {
            Command::Serve => Self::start_server(&config),
            Command::Url { base, query } => {
                let base = parse_url(&base)?;
                let url = UrlSync::<MemoryHistory>::encode(&base, &query.to_state(config.query.page_limit))?;
                println!("{}", url);
                Ok(())
            }
            Command::Decode { url } => {
                let url = parse_url(&url)?;
                let state = UrlSync::<MemoryHistory>::read(&url).unwrap_or_else(|| {
                    println!("No usable 'req' parameter, showing the default query");
                    QueryState::with_limit(config.query.page_limit)
                });
                let pretty = serde_json::to_string_pretty(&SearchRequest::from_state(&state))?;
                println!("{}", pretty);
                Ok(())
            }
            Command::Search { query } => Self::run_search(&config, &query),
        }
    }

    fn start_server(config: &Config) -> Result<(), ArtQueryError> {
        let host = config.server.host.clone();
        let port = config.server.port;

        let catalog = match config.server.catalog_path() {
            Some(path) => Catalog::from_json_file(&path)?,
            None => {
                log::warn!("No catalog configured, serving an empty catalog");
                Catalog::default()
            }
        };

        info!("Starting server on {}:{}", host, port);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ArtQueryError::Error(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(async {
            let web_server = crate::server::WebServer::new(host, port);
            web_server.start(catalog).await
        })
    }

    fn run_search(config: &Config, query: &QueryArgs) -> Result<(), ArtQueryError> {
        let base = config.client.base_url()?;
        let state = query.to_state(config.query.page_limit);
        let listing = base
            .join("arts")
            .map_err(|e| ArtQueryError::ConfigError(format!("Invalid base_url: {}", e)))?;
        let location = UrlSync::<MemoryHistory>::encode(&listing, &state)?;

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ArtQueryError::Error(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(async {
            let client = HttpSearchClient::new(base, config.client.method);
            let front = Storefront::from_config(MemoryHistory::new(location), client, config);
            front.start()?;
            front.settle().await;

            let results = front.results();
            if let Some(err) = results.last_error {
                return Err(ArtQueryError::Error(err));
            }
            println!("{} arts match", results.total.unwrap_or(0));
            for art in results.items {
                println!("  #{:<5} {:<30} {:>6}  by {}", art.id, art.name, art.price, art.creator);
            }
            Ok(())
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, ArtQueryError> {
    Url::parse(raw).map_err(|e| ArtQueryError::Error(format!("Invalid URL '{}': {}", raw, e)))
}
