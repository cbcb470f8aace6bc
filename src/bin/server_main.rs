//! EXD API spreadsheet server
//!
//! Usage:
//!   exd-sheet-server --dir /path/to/measurements --port 50051
//!
//! Then open files relative to the base directory, or by `file://` URI.

use clap::Parser;
use std::path::PathBuf;

use exd_sheet::config::ReaderConfig;
use exd_sheet::config::ServerConfig;
use exd_sheet::server;

#[derive(Parser, Debug)]
#[command(name = "exd-sheet-server")]
#[command(about = "ASAM ODS external data server for xlsx and ods spreadsheets")]
#[command(version)]
struct Args {
    /// Directory that relative file locators resolve against
    #[arg(short, long, env = "EXD_SHEET_DIR", default_value = ".")]
    dir: PathBuf,

    /// Host to bind to
    #[arg(long, env = "EXD_SHEET_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "EXD_SHEET_PORT", default_value_t = 50051)]
    port: u16,

    /// Number of data rows sampled per column for type inference (all rows if omitted)
    #[arg(long, env = "EXD_SHEET_ANALYZE_ROWS")]
    analyze_rows: Option<usize>,

    /// Re-read sheets on every value request instead of caching them
    #[arg(long, env = "EXD_SHEET_NO_CACHE")]
    no_cache: bool,

    /// Largest row count a single GetValues request may ask for
    #[arg(long, env = "EXD_SHEET_MAX_ROW_COUNT", default_value_t = ReaderConfig::EXCEL_MAX_ROWS)]
    max_row_count: usize,

    /// Longest request line accepted, in bytes
    #[arg(long, env = "EXD_SHEET_MAX_LINE_LENGTH", default_value_t = 1 << 20)]
    max_line_length: usize,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    let config = ServerConfig {
        reader: ReaderConfig {
            base_dir: args.dir,
            analyze_rows: args.analyze_rows,
            cache_sheets: !args.no_cache,
            max_row_count: args.max_row_count,
        },
        host: args.host,
        port: args.port,
        max_line_length: args.max_line_length,
    };

    if let Err(e) = server::start_server(config).await {
        eprintln!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
