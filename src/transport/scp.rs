//! SCP file transfer
//!
//! Minimal SCP source/sink conversation over a one-shot exec channel, just
//! enough for pushing a file to the host (`scp -t`) and pulling one back
//! (`scp -f`). Transfers use mode 0644 and the basename of the source path.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::transport::{RemoteSession, RemoteStream};

/// Wall-clock budget for a whole transfer
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Send a local file to `remote_dir` on the host, keeping its basename
pub async fn send_file(
    session: &dyn RemoteSession,
    local_path: &Path,
    remote_dir: &str,
) -> Result<()> {
    let contents = tokio::fs::read(local_path)
        .await
        .map_err(|_| Error::LocalFileUnreadable {
            path: local_path.to_path_buf(),
        })?;
    let name = file_name(local_path)?;
    let remote_dir = if remote_dir.is_empty() {
        "."
    } else {
        remote_dir
    };

    let mut stream = session.open_exec(&format!("scp -t {}", remote_dir)).await?;
    let deadline = Instant::now() + TRANSFER_TIMEOUT;

    read_ack(stream.as_mut(), deadline).await?;
    let header = format!("C0644 {} {}\n", contents.len(), name);
    stream.write_all(header.as_bytes()).await?;
    read_ack(stream.as_mut(), deadline).await?;
    stream.write_all(&contents).await?;
    stream.write_all(&[0]).await?;
    read_ack(stream.as_mut(), deadline).await?;
    stream.close().await?;
    info!(file = %name, remote_dir, "file sent to server");
    Ok(())
}

/// Fetch `remote_path` from the host into `local_dir` (the working
/// directory when None), returning the written path
pub async fn receive_file(
    session: &dyn RemoteSession,
    remote_path: &str,
    local_dir: Option<&Path>,
) -> Result<PathBuf> {
    let mut stream = session.open_exec(&format!("scp -f {}", remote_path)).await?;
    let deadline = Instant::now() + TRANSFER_TIMEOUT;

    // The sink drives the conversation with zero-byte acks.
    stream.write_all(&[0]).await?;
    let header = read_line(stream.as_mut(), deadline).await?;
    let size = parse_header(&header)?;
    stream.write_all(&[0]).await?;

    let body = read_exact(stream.as_mut(), size, deadline).await?;
    // Trailing status byte after the payload.
    let _ = read_exact(stream.as_mut(), 1, deadline).await?;
    stream.write_all(&[0]).await?;
    stream.close().await?;

    let name = remote_path
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::ScpRejected {
            reason: format!("remote path '{}' has no file name", remote_path),
        })?;
    let target = local_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(name);
    tokio::fs::write(&target, &body).await?;
    info!(file = %target.display(), "file received from server");
    Ok(target)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::LocalFileUnreadable {
            path: path.to_path_buf(),
        })
}

/// `Cmmmm <length> <name>` with mode and length in the fixed positions
fn parse_header(header: &str) -> Result<usize> {
    let mut parts = header.trim_end().splitn(3, ' ');
    let kind = parts.next().unwrap_or_default();
    if !kind.starts_with('C') {
        return Err(Error::ScpRejected {
            reason: format!("unexpected transfer header '{}'", header.trim_end()),
        });
    }
    let size = parts
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| Error::ScpRejected {
            reason: format!("unparsable length in header '{}'", header.trim_end()),
        })?;
    Ok(size)
}

async fn read_ack(stream: &mut dyn RemoteStream, deadline: Instant) -> Result<()> {
    let byte = read_exact(stream, 1, deadline).await?;
    match byte[0] {
        0 => Ok(()),
        code => {
            let message = read_line(stream, deadline).await.unwrap_or_default();
            Err(Error::ScpRejected {
                reason: format!("remote responded {}: {}", code, message.trim_end()),
            })
        }
    }
}

async fn read_exact(
    stream: &mut dyn RemoteStream,
    wanted: usize,
    deadline: Instant,
) -> Result<Vec<u8>> {
    let mut collected = Vec::with_capacity(wanted);
    while collected.len() < wanted {
        if Instant::now() > deadline {
            return Err(Error::CommandTimeout {
                seconds: TRANSFER_TIMEOUT.as_secs(),
            });
        }
        let chunk = stream.read_chunk(wanted - collected.len()).await?;
        collected.extend_from_slice(&chunk);
    }
    Ok(collected)
}

async fn read_line(stream: &mut dyn RemoteStream, deadline: Instant) -> Result<String> {
    let mut line = Vec::new();
    loop {
        if Instant::now() > deadline {
            return Err(Error::CommandTimeout {
                seconds: TRANSFER_TIMEOUT.as_secs(),
            });
        }
        let chunk = stream.read_chunk(1).await?;
        if let Some(&byte) = chunk.first() {
            if byte == b'\n' {
                break;
            }
            line.push(byte);
        }
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}
