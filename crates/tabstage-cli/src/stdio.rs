//! JSON-lines transport between stdin/stdout and the engine worker

use tabstage_engine::{Envelope, ErrorKind, Outbound, Response, WorkerHandle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Decode one request line; blank lines decode to nothing
pub fn decode_line(line: &str) -> Option<Result<Envelope, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(serde_json::from_str(trimmed))
    }
}

/// Error reply for a JSON object that names a request but fails to decode.
///
/// The caller's `correlationId` is echoed when it can be read. Lines that
/// are not JSON objects get no reply.
pub fn rejection(line: &str, error: &serde_json::Error) -> Option<Outbound> {
    let serde_json::Value::Object(fields) = serde_json::from_str(line.trim()).ok()? else {
        return None;
    };
    let correlation_id = fields.get("correlationId").and_then(serde_json::Value::as_u64);
    let request = fields
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<missing type>");
    Some(Outbound::reply(
        correlation_id,
        Response::Error {
            kind: ErrorKind::ParseError,
            message: format!("Invalid '{}' request: {}", request, error),
        },
    ))
}

/// Pump requests from `input` into the worker and its events to `output`
/// until the input ends and the worker has drained.
pub async fn serve<R, W>(handle: WorkerHandle, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let WorkerHandle {
        requests,
        mut events,
        task,
    } = handle;

    let (rejections_tx, mut rejections) = mpsc::channel::<Outbound>(16);

    let writer = tokio::spawn(async move {
        loop {
            let outbound = tokio::select! {
                Some(outbound) = events.recv() => outbound,
                Some(outbound) = rejections.recv() => outbound,
                else => break,
            };
            if let Err(e) = write_event(&mut output, &outbound).await {
                tracing::error!(error = %e, "failed to write response");
                break;
            }
        }
    });

    let mut lines = input.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        match decode_line(&line) {
            None => continue,
            Some(Err(e)) => match rejection(&line, &e) {
                Some(outbound) => {
                    tracing::warn!(line = line_number, error = %e, "rejecting malformed request");
                    if rejections_tx.send(outbound).await.is_err() {
                        break;
                    }
                }
                None => {
                    tracing::warn!(line = line_number, error = %e, "ignoring undecodable line");
                }
            },
            Some(Ok(envelope)) => {
                if requests.send(envelope).await.is_err() {
                    tracing::warn!("engine worker stopped, no longer reading requests");
                    break;
                }
            }
        }
    }

    tracing::debug!(lines = line_number, "input closed");
    drop(requests);
    drop(rejections_tx);
    task.await?;
    writer.await?;
    Ok(())
}

async fn write_event<W: AsyncWrite + Unpin>(output: &mut W, outbound: &Outbound) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(outbound)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
