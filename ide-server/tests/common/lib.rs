//! Shared harness for the `simple-ide-server` integration tests.
//!
//! [`TestServer`] binds an ephemeral port, serves a router over a fresh
//! temporary store root, and shuts down when dropped.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde_json::Value;
use simple_ide_core::{CompileConfig, ServiceConfig};
use simple_ide_server::AppState;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Compiler stand-in. Invoked as `fake-cc <src> -o <out>`: fails on sources
/// containing `syntax error`, sleeps on `sleep forever`, and writes the
/// artifact unless the source says `no output`.
pub const FAKE_CC: &str = r#"#!/bin/sh
src="$1"
out="$3"
if grep -q "syntax error" "$src"; then
  echo "$src:1:1: error: expected ';' before '}' token" >&2
  exit 1
fi
if grep -q "sleep forever" "$src"; then
  sleep 10
fi
echo "compiling $src"
if ! grep -q "no output" "$src"; then
  printf '#!/bin/sh\n' > "$out"
fi
exit 0
"#;

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    root: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    _home: TempDir,
}

impl TestServer {
    /// Server with the fake compiler and a short timeout.
    pub async fn start() -> Self {
        Self::start_with(|_, _| {}).await
    }

    /// Server whose config is adjusted by `tweak` before it starts. The
    /// second argument is the temp directory, for placing helper files.
    pub async fn start_with(tweak: impl FnOnce(&mut ServiceConfig, &Path)) -> Self {
        let home = TempDir::new().expect("tempdir");
        let root = home.path().join("projects");
        std::fs::create_dir_all(&root).expect("create store root");

        let mut config = ServiceConfig {
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            store_root: root.clone(),
            compile: CompileConfig {
                compiler: write_fake_compiler(home.path()),
                timeout_secs: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        tweak(&mut config, home.path());

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel();
        tokio::spawn(simple_ide_server::serve(
            listener,
            AppState::new(config),
            async move {
                let _ = rx.await;
            },
        ));

        Self {
            addr,
            client: reqwest::Client::new(),
            root,
            shutdown: Some(tx),
            _home: home,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// On-disk store root, for asserting filesystem effects.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create_project(&self, name: &str) {
        let resp = self
            .client
            .post(self.url("/api/projects"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .expect("create project");
        assert_eq!(resp.status(), 201, "create project {name}");
    }

    pub async fn create_file(&self, project: &str, file: &str, content: &str) {
        let resp = self
            .client
            .post(self.url(&format!("/api/projects/{project}/file")))
            .json(&serde_json::json!({ "fileName": file, "content": content }))
            .send()
            .await
            .expect("create file");
        assert_eq!(resp.status(), 201, "create file {project}/{file}");
    }

    /// Send a request without client-side URL normalization, so dot
    /// segments reach the server as written.
    pub async fn send_raw(&self, method: &str, path: &str) -> (u16, Value) {
        let mut stream = tokio::net::TcpStream::connect(self.addr)
            .await
            .expect("connect server");
        let req = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            self.addr
        );
        stream
            .write_all(req.as_bytes())
            .await
            .expect("write request");
        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .await
            .expect("read response");
        let (head, body) = response
            .split_once("\r\n\r\n")
            .expect("http response must have separator");
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|s| s.parse::<u16>().ok())
            .expect("http status");
        let body = serde_json::from_str(body).unwrap_or(Value::Null);
        (status, body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Write [`FAKE_CC`] into `dir` as an executable and return its path.
pub fn write_fake_compiler(dir: &Path) -> String {
    let path = dir.join("fake-cc");
    std::fs::write(&path, FAKE_CC).expect("write fake compiler");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake compiler");
    }
    path.to_string_lossy().into_owned()
}

/// Decode a JSON response body, panicking on anything else.
pub async fn json_body(resp: reqwest::Response) -> Value {
    resp.json::<Value>().await.expect("json body")
}
