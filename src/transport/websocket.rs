use super::{Transport, TransportHandle};
use crate::types::Result;
use async_trait::async_trait;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Websocket transport backed by `tokio-tungstenite`.
///
/// Each connection gets a pair of pump tasks bridging the socket halves to
/// the [`TransportHandle`] channels. The write pump closes the socket when
/// the outgoing sender is dropped; the read pump drops the incoming sender
/// when the socket closes or errors, which the session manager observes as
/// end-of-stream.
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<TransportHandle> {
        tracing::debug!("Opening websocket connection to {}", endpoint);
        let (ws_stream, _response) = connect_async(endpoint).await?;
        let (mut write_half, mut read_half) = ws_stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<String>(100);

        tokio::spawn(async move {
            while let Some(payload) = outgoing_rx.recv().await {
                if let Err(e) = write_half.send(Message::Text(payload.into())).await {
                    tracing::error!("WebSocket write error: {}", e);
                    break;
                }
            }
            // sender dropped or write failed; close the socket politely
            let _ = write_half.close().await;
            tracing::debug!("Write pump finished");
        });

        tokio::spawn(async move {
            while let Some(msg_result) = read_half.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        if let Some(close_frame) = frame {
                            tracing::warn!(
                                "Server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason
                            );
                        } else {
                            tracing::warn!("Server closed connection without close frame");
                        }
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::trace!("Received ping ({} bytes)", data.len());
                    }
                    Ok(Message::Pong(data)) => {
                        tracing::trace!("Received pong ({} bytes)", data.len());
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::warn!("Ignoring unexpected binary message ({} bytes)", data.len());
                    }
                    Ok(Message::Frame(_)) => {}
                    Err(e) => {
                        tracing::error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Read pump finished");
            // incoming_tx drops here; the session sees end-of-stream
        });

        Ok(TransportHandle {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}
