use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

/// Line-protocol client. Commands go through a background task that owns the
/// connection, one in-flight command at a time. Every request is a single
/// round trip; a dead connection is reported to the caller, never retried.
#[derive(Default)]
pub struct ChatService {
    /// Sender used by the app to request the background task to send a command
    /// and wait for a response.
    pub tx: Option<mpsc::UnboundedSender<(String, oneshot::Sender<String>)>>,
    /// Keep the background task handle so it stays alive for the lifetime of the service
    pub _bg: Option<tokio::task::JoinHandle<()>>,
}

impl ChatService {
    pub fn new() -> Self {
        Self { tx: None, _bg: None }
    }

    /// Drop the connection and background task.
    pub async fn reset(&mut self) {
        self.tx = None;
        self._bg = None;
    }

    /// Ensure there is an active background task connected to `host`.
    pub async fn ensure_connected(&mut self, host: &str) -> anyhow::Result<()> {
        if self.tx.is_some() {
            return Ok(());
        }

        let stream = TcpStream::connect(host).await?;
        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);

        let (tx, mut rx) = mpsc::unbounded_channel::<(String, oneshot::Sender<String>)>();

        let handle = tokio::spawn(async move {
            let mut server_line = String::new();
            while let Some((cmd, resp_tx)) = rx.recv().await {
                if let Err(e) = writer.write_all(cmd.as_bytes()).await {
                    let _ = resp_tx.send(format!("ERR: connection closed: {}", e));
                    break;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    let _ = resp_tx.send(format!("ERR: connection closed: {}", e));
                    break;
                }
                if let Err(e) = writer.flush().await {
                    let _ = resp_tx.send(format!("ERR: connection closed: {}", e));
                    break;
                }
                server_line.clear();
                match reader.read_line(&mut server_line).await {
                    Ok(0) => {
                        let _ = resp_tx.send("ERR: connection closed by server".to_string());
                        break;
                    }
                    Ok(_) => {
                        let _ = resp_tx.send(server_line.trim_end().to_string());
                    }
                    Err(e) => {
                        let _ = resp_tx.send(format!("ERR: read failed: {}", e));
                        break;
                    }
                }
            }
        });

        self.tx = Some(tx);
        self._bg = Some(handle);
        Ok(())
    }

    /// Send one command line and wait for its single-line response.
    pub async fn send_command(&mut self, host: &str, cmd: String) -> anyhow::Result<String> {
        self.ensure_connected(host).await?;
        let (resp_tx, resp_rx) = oneshot::channel();
        let tx = self.tx.as_ref().ok_or_else(|| anyhow::anyhow!("not connected"))?;
        if tx.send((cmd, resp_tx)).is_err() {
            self.reset().await;
            return Err(anyhow::anyhow!("connection task ended"));
        }
        match resp_rx.await {
            Ok(resp) => Ok(resp),
            Err(_) => {
                self.reset().await;
                Err(anyhow::anyhow!("no response from server"))
            }
        }
    }
}
