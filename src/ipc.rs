//! i3 IPC over the window manager's Unix socket.
//!
//! Every message is `"i3-ipc"`, the payload length and the message type (both
//! `u32` in native byte order), then a JSON payload. Events use the same
//! framing with the high bit of the type set.

use std::{io, path::PathBuf};

use anyhow::Context as _;
use futures::StreamExt as _;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::data::{WorkspaceEvent, WorkspaceReply};
use crate::transport::{EventStream, Transport};

pub const SOCK_PATH_VAR: &str = "I3SOCK";

const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = MAGIC.len() + 8;
const MAX_PAYLOAD_LEN: u32 = 64 << 20;

pub(crate) const RUN_COMMAND: u32 = 0;
pub(crate) const GET_WORKSPACES: u32 = 1;
pub(crate) const SUBSCRIBE: u32 = 2;

const EVENT_BIT: u32 = 1 << 31;
pub(crate) const EVENT_WORKSPACE: u32 = EVENT_BIT;
pub(crate) const EVENT_SHUTDOWN: u32 = EVENT_BIT | 6;

pub(crate) async fn write_message(
    write: &mut (impl AsyncWrite + Unpin),
    msg_type: u32,
    payload: &[u8],
) -> io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(io::Error::other)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&len.to_ne_bytes());
    buf.extend_from_slice(&msg_type.to_ne_bytes());
    buf.extend_from_slice(payload);

    write.write_all(&buf).await?;
    write.flush().await
}

/// Reads one message. `None` if the socket was closed between messages.
pub(crate) async fn read_message(
    read: &mut (impl AsyncRead + Unpin),
) -> anyhow::Result<Option<(u32, Vec<u8>)>> {
    let mut header = [0; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match read.read(&mut header[filled..]).await {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => anyhow::bail!("Truncated i3 IPC header after {filled} bytes"),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err).context("Failed to read i3 IPC header"),
        }
    }

    let (magic, rest) = header.split_at(MAGIC.len());
    anyhow::ensure!(magic == MAGIC, "Invalid i3 IPC magic {magic:?}");
    let (len, msg_type) = rest.split_at(4);
    let len = u32::from_ne_bytes(len.try_into()?);
    let msg_type = u32::from_ne_bytes(msg_type.try_into()?);
    anyhow::ensure!(
        len <= MAX_PAYLOAD_LEN,
        "i3 IPC message of type {msg_type:#x} is too large ({len} bytes)"
    );

    let mut payload = vec![0; len as usize];
    read.read_exact(&mut payload)
        .await
        .with_context(|| format!("Truncated i3 IPC message of type {msg_type:#x}"))?;

    log::trace!("Received {len} bytes of type {msg_type:#x}");
    Ok(Some((msg_type, payload)))
}

/// Resolves the socket from `$I3SOCK`, falling back to `i3 --get-socketpath`.
pub async fn socket_path() -> anyhow::Result<PathBuf> {
    if let Some(path) = std::env::var_os(SOCK_PATH_VAR) {
        return Ok(path.into());
    }

    let std::process::Output {
        status,
        stdout,
        stderr,
    } = tokio::process::Command::new("i3")
        .arg("--get-socketpath")
        .output()
        .await
        .context("Failed to run i3 --get-socketpath")?;

    anyhow::ensure!(
        status.success(),
        "i3 --get-socketpath exited with exit code {status}. Stderr: {}",
        String::from_utf8_lossy(&stderr)
    );

    let path = String::from_utf8(stdout).context("i3 socket path is not valid UTF-8")?;
    Ok(path.trim_end().into())
}

#[derive(Deserialize)]
struct SubscribeReply {
    success: bool,
}

#[derive(Deserialize)]
struct CommandOutcome {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Request connection to i3. Event subscriptions open their own socket.
#[derive(Debug)]
pub struct I3Connection {
    sock_path: PathBuf,
    requests: Mutex<UnixStream>,
}
impl I3Connection {
    pub async fn connect() -> anyhow::Result<Self> {
        Self::connect_to(socket_path().await?).await
    }

    pub async fn connect_to(sock_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let sock_path = sock_path.into();
        let stream = UnixStream::connect(&sock_path)
            .await
            .with_context(|| format!("Failed to connect to i3 at {}", sock_path.display()))?;
        log::info!("Connected to i3 at {}", sock_path.display());

        Ok(Self {
            sock_path,
            requests: Mutex::new(stream),
        })
    }

    async fn request(&self, msg_type: u32, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut stream = self.requests.lock().await;
        write_message(&mut *stream, msg_type, payload)
            .await
            .context("Failed to send i3 IPC request")?;

        loop {
            let Some((reply_type, reply)) = read_message(&mut *stream).await? else {
                anyhow::bail!("i3 closed the connection");
            };
            if reply_type == msg_type {
                break Ok(reply);
            }
            log::debug!("Skipping i3 message of type {reply_type:#x}");
        }
    }
}

impl Transport for I3Connection {
    async fn fetch_workspaces(&self) -> anyhow::Result<Vec<WorkspaceReply>> {
        let reply = self.request(GET_WORKSPACES, &[]).await?;
        serde_json::from_slice(&reply).context("Failed to parse workspaces reply")
    }

    async fn run_command(&self, command: &str) -> anyhow::Result<()> {
        let reply = self.request(RUN_COMMAND, command.as_bytes()).await?;
        let outcomes: Vec<CommandOutcome> =
            serde_json::from_slice(&reply).context("Failed to parse command reply")?;

        for CommandOutcome { success, error } in outcomes {
            if !success {
                anyhow::bail!(error.unwrap_or_else(|| "i3 rejected the command".into()));
            }
        }
        Ok(())
    }

    async fn subscribe(&self) -> anyhow::Result<EventStream> {
        let mut stream = UnixStream::connect(&self.sock_path)
            .await
            .context("Failed to open i3 event connection")?;

        write_message(&mut stream, SUBSCRIBE, br#"["workspace","shutdown"]"#).await?;
        let reply = loop {
            match read_message(&mut stream).await? {
                Some((SUBSCRIBE, reply)) => break reply,
                Some((other, _)) => log::debug!("Skipping i3 message of type {other:#x}"),
                None => anyhow::bail!("i3 closed the event connection"),
            }
        };
        let SubscribeReply { success } =
            serde_json::from_slice(&reply).context("Failed to parse subscribe reply")?;
        anyhow::ensure!(success, "i3 rejected the event subscription");

        let events = futures::stream::unfold(Some(stream), |stream| async move {
            let mut stream = stream?;
            loop {
                match read_message(&mut stream).await {
                    Ok(Some((EVENT_WORKSPACE, payload))) => {
                        let ev = serde_json::from_slice::<WorkspaceEvent>(&payload)
                            .context("Failed to parse workspace event");
                        return Some((ev, Some(stream)));
                    }
                    Ok(Some((EVENT_SHUTDOWN, _))) => {
                        log::info!("i3 is shutting down");
                        return None;
                    }
                    Ok(Some((other, _))) => log::debug!("Ignoring i3 message of type {other:#x}"),
                    Ok(None) => return None,
                    Err(err) => return Some((Err(err), None)),
                }
            }
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt as _;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::UnixListener;

    use super::*;
    use crate::data::Change;

    #[tokio::test]
    async fn message_framing() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_message(&mut a, GET_WORKSPACES, b"").await.unwrap();
        write_message(&mut a, RUN_COMMAND, b"workspace 1").await.unwrap();
        drop(a);

        assert_eq!(
            read_message(&mut b).await.unwrap(),
            Some((GET_WORKSPACES, Vec::new()))
        );
        assert_eq!(
            read_message(&mut b).await.unwrap(),
            Some((RUN_COMMAND, b"workspace 1".to_vec()))
        );
        assert_eq!(read_message(&mut b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_bad_magic_and_truncation() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(b"i4-ipc\0\0\0\0\0\0\0\0").await.unwrap();
        assert!(read_message(&mut b).await.is_err());

        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(MAGIC).await.unwrap();
        a.write_all(&10u32.to_ne_bytes()).await.unwrap();
        a.write_all(&GET_WORKSPACES.to_ne_bytes()).await.unwrap();
        a.write_all(b"[]").await.unwrap();
        drop(a);
        assert!(read_message(&mut b).await.is_err());
    }

    #[tokio::test]
    async fn closed_mid_header_is_an_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(b"i3-ip").await.unwrap();
        drop(a);
        let err = read_message(&mut b).await.unwrap_err();
        assert!(err.to_string().contains("Truncated"), "{err}");
    }

    #[tokio::test]
    async fn rejects_oversized_payload() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(MAGIC).await.unwrap();
        a.write_all(&u32::MAX.to_ne_bytes()).await.unwrap();
        a.write_all(&GET_WORKSPACES.to_ne_bytes()).await.unwrap();
        let err = read_message(&mut b).await.unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    async fn fake_i3(listener: UnixListener) {
        // Request connection
        let (mut requests, _) = listener.accept().await.unwrap();
        // Event connection
        let (mut events, _) = listener.accept().await.unwrap();

        tokio::spawn(async move {
            while let Some((msg_type, payload)) = read_message(&mut requests).await.unwrap() {
                let reply: &[u8] = match msg_type {
                    GET_WORKSPACES => {
                        br#"[{"num":1,"name":"1","focused":true,"urgent":false,"output":"eDP-1"}]"#
                    }
                    RUN_COMMAND if payload == br#"workspace "1""# => br#"[{"success":true}]"#,
                    RUN_COMMAND => br#"[{"success":false,"error":"no such workspace"}]"#,
                    _ => unreachable!(),
                };
                write_message(&mut requests, msg_type, reply).await.unwrap();
            }
        });

        let (msg_type, payload) = read_message(&mut events).await.unwrap().unwrap();
        assert_eq!(msg_type, SUBSCRIBE);
        assert_eq!(payload, br#"["workspace","shutdown"]"#);
        write_message(&mut events, SUBSCRIBE, br#"{"success":true}"#)
            .await
            .unwrap();
        write_message(
            &mut events,
            EVENT_WORKSPACE,
            br#"{"change":"init","current":{"name":"2"},"old":null}"#,
        )
        .await
        .unwrap();
        write_message(&mut events, EVENT_SHUTDOWN, br#"{"change":"exit"}"#)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn talks_to_i3_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipc.sock");
        let server = tokio::spawn(fake_i3(UnixListener::bind(&path).unwrap()));

        let conn = I3Connection::connect_to(&path).await.unwrap();
        let mut events = conn.subscribe().await.unwrap();

        let wss = conn.fetch_workspaces().await.unwrap();
        assert_eq!(wss.len(), 1);
        assert_eq!(&*wss[0].output, "eDP-1");

        conn.run_command(r#"workspace "1""#).await.unwrap();
        let err = conn.run_command(r#"workspace "9""#).await.unwrap_err();
        assert_eq!(err.to_string(), "no such workspace");

        let ev: WorkspaceEvent = events.next().await.unwrap().unwrap();
        assert_eq!(ev.change, Change::Init);
        assert_eq!(ev.current_name(), Some("2"));
        assert!(events.next().await.is_none());

        server.await.unwrap();
    }
}
