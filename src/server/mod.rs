//! TCP server for the EXD API
//!
//! Clients connect over plain TCP and exchange newline-delimited JSON messages, see [`protocol`].

pub mod protocol;

use crate::config::ServerConfig;
use crate::service::ExternalDataReader;
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

/// Start the EXD API server and run it until Ctrl-C
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    log::info!("exd-sheet server listening on {}", addr);
    log::info!("Base directory: {}", config.reader.base_dir.display());
    println!("EXD API spreadsheet server");
    println!("  Listening on: {}", addr);
    println!("  Base dir:     {}", config.reader.base_dir.display());

    let reader = Arc::new(ExternalDataReader::new(config.reader));
    serve(listener, reader, config.max_line_length, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {:?}", e);
        }
        println!("\nShutting down exd-sheet server...");
    })
    .await
}

/// Accepts connections until `shutdown` resolves, then closes every open handle.
///
/// A connection sending a request line longer than `max_line_length` bytes gets a `BadRequest`
/// response and is closed.
pub async fn serve<F>(
    listener: TcpListener,
    reader: Arc<ExternalDataReader>,
    max_line_length: usize,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        log::debug!("Connection from {}", peer);
                        let reader_ref = reader.clone();
                        tokio::spawn(async move {
                            if let Err(e) = process_socket(stream, reader_ref, max_line_length).await {
                                log::error!("Connection error: {:?}", e);
                            }
                        });
                    }
                    Err(e) => {
                        log::error!("Accept error: {:?}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    let closed = reader.close_all();
    log::info!("Server stopped, released {} handles", closed);
    Ok(())
}

/// Answers request lines in order until the peer hangs up.
async fn process_socket(stream: TcpStream, reader: Arc<ExternalDataReader>, max_line_length: usize) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut requests = BufReader::new(read_half);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let limit = u64::try_from(max_line_length).unwrap_or(u64::MAX).saturating_add(1);
        let size = (&mut requests)
            .take(limit)
            .read_until(b'\n', &mut buffer)
            .await
            .context("Failed to read request")?;
        if size == 0 {
            break;
        }
        if buffer.last() != Some(&b'\n') && buffer.len() > max_line_length {
            log::warn!("Closing connection after a request line over {} bytes", max_line_length);
            let mut response = protocol::reject(&format!("Request line exceeds {} bytes", max_line_length));
            response.push('\n');
            write_half
                .write_all(response.as_bytes())
                .await
                .context("Failed to write response")?;
            break;
        }

        let line = String::from_utf8_lossy(&buffer).trim().to_owned();
        if line.is_empty() {
            continue;
        }
        let reader_ref = reader.clone();
        let mut response = tokio::task::spawn_blocking(move || protocol::dispatch(&reader_ref, &line))
            .await
            .context("Request worker failed")?;
        response.push('\n');
        write_half
            .write_all(response.as_bytes())
            .await
            .context("Failed to write response")?;
    }
    Ok(())
}
