use std::path::PathBuf;

/// Settings of the bridge itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Root for relative file locators
    pub base_dir: PathBuf,
    /// Number of data rows sampled per column for type inference; all rows when `None`
    pub analyze_rows: Option<usize>,
    /// Keep sheets parsed during discovery for later value requests
    pub cache_sheets: bool,
    /// Largest row count a single value request may ask for
    pub max_row_count: usize,
}

impl ReaderConfig {
    /// Row limit of an xlsx worksheet
    pub const EXCEL_MAX_ROWS: usize = 1_048_576;
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            analyze_rows: None,
            cache_sheets: true,
            max_row_count: ReaderConfig::EXCEL_MAX_ROWS,
        }
    }
}

/// Server configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub reader: ReaderConfig,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Longest request line accepted, in bytes
    pub max_line_length: usize,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            host: "127.0.0.1".to_string(),
            port: 50051,
            max_line_length: 1 << 20,
        }
    }
}
