//! Locating and starting the secondary interpreter.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};
use which::which;

/// A live interpreter that evaluates whole programs.
#[async_trait]
pub trait Interpreter: Send + Sync {
    fn version(&self) -> &str;

    /// Run `program` in a fresh namespace and return the text stored in
    /// `__verdict_output__`. An exception raised by the program is an `Err`
    /// carrying `"<ExceptionType>: <message>"`.
    async fn run(&self, program: &str) -> Result<String>;
}

/// Produces the interpreter on first use. Swappable so tests can observe provisioning.
#[async_trait]
pub trait RuntimeProvisioner: Send + Sync {
    async fn provision(&self) -> Result<Arc<dyn Interpreter>>;
}

/// Request loop run by the child interpreter.
///
/// Protocol is one JSON object per line. Every reply echoes the request `id`
/// (`null` when the line could not be decoded). The protocol streams are
/// captured before any user code runs; user stdin/stdout are swapped for
/// in-memory buffers so `print` and `input` cannot touch the channel.
const BOOTSTRAP: &str = r#"
import io, json, sys

def __verdict_serve():
    channel_in = sys.stdin
    channel_out = sys.stdout
    version = "%d.%d.%d" % tuple(sys.version_info[:3])
    channel_out.write(json.dumps({"ready": True, "version": version}) + "\n")
    channel_out.flush()
    for line in channel_in:
        line = line.strip()
        if not line:
            continue
        request_id = None
        try:
            request = json.loads(line)
            request_id = request.get("id")
            namespace = {"__name__": "__verdict__", "__builtins__": __builtins__}
            sys.stdin = io.StringIO("")
            sys.stdout = io.StringIO()
            try:
                exec(compile(request["program"], "<submission>", "exec"), namespace)
            finally:
                sys.stdin = channel_in
                sys.stdout = channel_out
            reply = {"id": request_id, "ok": str(namespace.get("__verdict_output__", ""))}
        except BaseException as exc:
            reply = {"id": request_id, "error": "%s: %s" % (type(exc).__name__, exc)}
        channel_out.write(json.dumps(reply) + "\n")
        channel_out.flush()

__verdict_serve()
"#;

#[derive(Debug, Deserialize)]
struct Handshake {
    ready: bool,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    program: &'a str,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Host-installed CPython found on `PATH`
pub struct ProcessProvisioner {
    candidates: Vec<String>,
}

impl ProcessProvisioner {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    fn find_executable(&self) -> Result<PathBuf> {
        self.candidates
            .iter()
            .find_map(|name| which(name).ok())
            .with_context(|| {
                format!(
                    "Python runtime not found (tried: {})",
                    self.candidates.join(", ")
                )
            })
    }
}

#[async_trait]
impl RuntimeProvisioner for ProcessProvisioner {
    async fn provision(&self) -> Result<Arc<dyn Interpreter>> {
        let path = self.find_executable()?;
        debug!(path = %path.display(), "Starting Python runtime");

        let mut child = Command::new(&path)
            .args(["-I", "-u", "-c", BOOTSTRAP])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start Python runtime at {}", path.display()))?;

        let stdin = child.stdin.take().context("Python runtime stdin unavailable")?;
        let stdout = child.stdout.take().context("Python runtime stdout unavailable")?;
        let mut stdout = BufReader::new(stdout);

        let mut line = String::new();
        let read = stdout
            .read_line(&mut line)
            .await
            .context("Failed to read Python runtime handshake")?;
        if read == 0 {
            bail!("Python runtime exited during startup");
        }

        let handshake: Handshake = serde_json::from_str(line.trim())
            .with_context(|| format!("Unexpected Python runtime handshake: {}", line.trim()))?;
        if !handshake.ready {
            bail!("Python runtime reported not ready");
        }

        info!(path = %path.display(), version = %handshake.version, "Python runtime ready");

        Ok(Arc::new(PythonProcess {
            version: handshake.version,
            channel: Mutex::new(Channel {
                _child: child,
                stdin,
                stdout,
                next_id: 0,
            }),
        }))
    }
}

struct Channel {
    // held so the process lives (and is killed) with the channel
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// Persistent interpreter process. Requests are serialized on the channel lock.
///
/// A caller dropped mid-request leaves its reply (or a partial request line)
/// in the pipes. Requests are tagged with a sequence id and start on a fresh
/// line, so the next caller skips leftovers until its own id comes back.
pub struct PythonProcess {
    version: String,
    channel: Mutex<Channel>,
}

#[async_trait]
impl Interpreter for PythonProcess {
    fn version(&self) -> &str {
        &self.version
    }

    async fn run(&self, program: &str) -> Result<String> {
        let mut channel = self.channel.lock().await;
        channel.next_id += 1;
        let id = channel.next_id;

        let request = encode_request(id, program)?;
        channel
            .stdin
            .write_all(request.as_bytes())
            .await
            .context("Python runtime channel closed")?;
        channel.stdin.flush().await.context("Python runtime channel closed")?;

        loop {
            let mut line = String::new();
            let read = channel
                .stdout
                .read_line(&mut line)
                .await
                .context("Python runtime channel closed")?;
            if read == 0 {
                bail!("Python runtime exited");
            }

            // a reader dropped mid-line leaves the tail of a reply behind
            let reply: Reply = match serde_json::from_str(line.trim()) {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(error = %e, "Discarding partial Python runtime reply");
                    continue;
                }
            };
            if reply.id != Some(id) {
                debug!(expected = id, received = ?reply.id, "Discarding stale Python runtime reply");
                continue;
            }

            return match (reply.ok, reply.error) {
                (_, Some(error)) => bail!("{}", error),
                (Some(ok), None) => Ok(ok),
                (None, None) => bail!("Empty Python runtime reply"),
            };
        }
    }
}

/// One request line. The leading newline terminates any partial line left
/// by an abandoned write.
fn encode_request(id: u64, program: &str) -> Result<String> {
    let body = serde_json::to_string(&Request { id, program })?;
    Ok(format!("\n{}\n", body))
}
