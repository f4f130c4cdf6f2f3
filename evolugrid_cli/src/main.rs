use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::Value;
use tokio::runtime;

use evolugrid_client::config::GridConfiguration;
use evolugrid_client::controller::{GridCommand, GridController};
use evolugrid_client::driver::GridDriver;
use evolugrid_client::transport::HttpTransport;
use evolugrid_common::filter::Filter;
use evolugrid_common::query::SortOrder;
use evolugrid_server::prelude::*;

#[derive(Parser, Debug)]
struct CLIArgs {
    #[command(subcommand)]
    command: Command,

    /// Debug mode
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a JSON array of objects as a grid endpoint
    Serve {
        /// File holding the rows
        rows: PathBuf,

        #[arg(long, default_value = "127.0.0.1:8080")]
        host: SocketAddr,

        /// Only answer on this path
        #[arg(long)]
        path: Option<String>,

        /// Column as TITLE=KEY. Columns are derived from the rows if none
        /// are given.
        #[arg(short, long = "column")]
        columns: Vec<String>,

        /// CSV export encoding
        #[arg(long, default_value = "windows-1252")]
        charset: String,

        #[arg(long, default_value = "data.csv")]
        filename: String,
    },

    /// Fetch a page from a grid endpoint and print it
    Fetch {
        url: String,

        #[arg(short, long, default_value_t = 20)]
        limit: u64,

        /// Zero-based page to show
        #[arg(short, long, default_value_t = 0)]
        page: usize,

        /// Sort on this key
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Filter as NAME=VALUE
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Print the grid markup instead of the rows
        #[arg(long)]
        html: bool,

        /// Print the CSV export URL and stop
        #[arg(long)]
        csv: bool,
    },
}

/// Split a `NAME=VALUE` argument.
fn split_pair(arg: &str) -> Option<(&str, &str)> {
    let (name, value) = arg.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

fn load_rows(path: &PathBuf) -> Result<Vec<Value>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Unable to read {}: {e}", path.display()))?;

    match serde_json::from_str(&text) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(_) => Err(format!("{} is not a JSON array", path.display())),
        Err(e) => Err(format!("Unable to parse {}: {e}", path.display())),
    }
}

async fn serve(
    rows: PathBuf,
    host: SocketAddr,
    path: Option<String>,
    columns: Vec<String>,
    charset: String,
    filename: String,
) -> Result<(), String> {
    let rows = Arc::new(load_rows(&rows)?);
    let charset: Charset = charset.parse().map_err(|e| format!("{e}"))?;

    let mut keyed = Vec::new();
    for c in &columns {
        let (title, key) =
            split_pair(c).ok_or_else(|| format!("Bad column '{c}', expected TITLE=KEY"))?;
        keyed.push((title.to_string(), key.to_string()));
    }
    let keyed = Arc::new(keyed);

    info!("Loaded {} rows", rows.len());

    let endpoint = move |query: &GridQuery| -> Result<ResultSerializer, SerializerError> {
        let source = VecSource::new(rows.as_ref().clone())
            .with_filters(query.filters.clone());

        let columns = keyed
            .iter()
            .map(|(t, k)| KeyColumn::new(t.clone(), k.clone()).boxed())
            .collect();

        Ok(ResultSerializer::new(source)
            .columns(columns)
            .charset(charset)
            .csv_filename(filename.clone()))
    };

    let handle = serve_grid(GridServerOptions { host, path }, endpoint)
        .map_err(|e| e.to_string())?;

    println!("Grid available at http://{}", handle.local_addr());

    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;

    info!("Shutting down");
    handle.shutdown();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn fetch(
    url: String,
    limit: u64,
    page: usize,
    sort: Option<String>,
    desc: bool,
    filters: Vec<String>,
    html: bool,
    csv: bool,
) -> Result<(), String> {
    let mut parsed = Vec::new();
    for f in &filters {
        let (name, value) =
            split_pair(f).ok_or_else(|| format!("Bad filter '{f}', expected NAME=VALUE"))?;
        parsed.push(Filter::new(name, value));
    }

    let config = GridConfiguration::builder(url)
        .limit(limit)
        .filters(parsed)
        .export_csv(true)
        .build()
        .map_err(|e| e.to_string())?;

    let mut driver = GridDriver::new(GridController::new(config), HttpTransport::new());

    if csv {
        if let Some(url) = driver.controller_mut().export_csv() {
            println!("{url}");
        }
        return Ok(());
    }

    let first = match sort {
        Some(key) => {
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            GridCommand::Sort { key, order }
        }
        None => GridCommand::Init,
    };

    if !driver.execute(first).await {
        return Err("Grid fetch failed".into());
    }

    if page > 0 && !driver.execute(GridCommand::GoToPage(page)).await {
        return Err(format!("Unable to fetch page {page}"));
    }

    let view = driver.controller().view();

    if html {
        println!("{}", driver.controller().render_html());
    } else {
        for row in &view.rows {
            println!("{}", Value::Object(row.clone()));
        }
    }

    match &view.pager {
        Some(p) => {
            let total = view.count.map_or("?".to_string(), |c| c.to_string());
            info!("{} ({total} rows total)", p.label());
        }
        None => info!("{} rows", view.rows.len()),
    }

    Ok(())
}

async fn cli_main() {
    let cli_args = CLIArgs::parse();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }

    if cli_args.debug {
        env::set_var("RUST_LOG", "debug")
    }

    env_logger::init();

    let result = match cli_args.command {
        Command::Serve {
            rows,
            host,
            path,
            columns,
            charset,
            filename,
        } => serve(rows, host, path, columns, charset, filename).await,
        Command::Fetch {
            url,
            limit,
            page,
            sort,
            desc,
            filters,
            html,
            csv,
        } => fetch(url, limit, page, sort, desc, filters, html, csv).await,
    };

    if let Err(e) = result {
        error!("{e}");
        exit(1);
    }
}

fn main() {
    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(cli_main());
}
