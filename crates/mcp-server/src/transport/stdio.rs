//! stdio transport for MCP (used by desktop MCP clients)

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::protocol::{IncomingPayload, McpMessage, RequestHandler};
use crate::registry::Registry;

/// stdio transport for MCP protocol
///
/// One handler serves the whole process lifetime.
pub struct StdioTransport {
    handler: RequestHandler,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new(registry: Registry) -> Self {
        Self {
            handler: RequestHandler::new(registry),
        }
    }

    /// Run the stdio transport until stdin closes
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting MCP server on stdio");

        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, replying on `writer`
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut notifications = self.handler.subscribe();
        let mut buffer = Vec::new();

        // Raw bytes: a line that is not UTF-8 is answered with a parse error
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                break;
            }

            let line = buffer.trim_ascii();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", String::from_utf8_lossy(line));

            match IncomingPayload::parse(line) {
                Ok(payload) => {
                    if let Some(reply) = self.handler.handle_payload(payload).await {
                        write_line(&mut writer, &reply).await?;
                    }
                }
                Err(e) => {
                    error!("Failed to parse message: {}", e.message);
                    write_line(&mut writer, &McpMessage::error_response(None, e)).await?;
                }
            }

            flush_notifications(&mut notifications, &mut writer).await?;
        }

        info!("EOF received, shutting down");
        Ok(())
    }
}

async fn flush_notifications<W>(
    notifications: &mut broadcast::Receiver<McpMessage>,
    writer: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match notifications.try_recv() {
            Ok(notification) => write_line(writer, &notification).await?,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Dropped {} notifications", skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = serde_json::to_string(message)?;
    debug!("Sending: {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
