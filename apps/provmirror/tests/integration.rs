//! Integration tests for the provmirror server binary

use std::process::{Child, Command, Stdio};
use std::time::Duration;

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_provmirror"))
        .arg("--version")
        .output()
        .expect("Failed to execute provmirror");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("provmirror"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_provmirror"))
        .arg("--help")
        .output()
        .expect("Failed to execute provmirror");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--listen"));
    assert!(stdout.contains("--storage-dir"));
    assert!(stdout.contains("--public-url"));
}

#[test]
fn test_missing_config_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_provmirror"))
        .args(["--config", "/nonexistent/provmirror.toml"])
        .output()
        .expect("Failed to execute provmirror");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_serves_discovery_and_storage() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("dl")).unwrap();
    std::fs::write(dir.path().join("dl/a.zip"), b"zip-bytes").unwrap();

    let port = free_port();
    let base = format!("http://127.0.0.1:{port}");
    let _server = Server(
        Command::new(env!("CARGO_BIN_EXE_provmirror"))
            .args(["--listen", &format!("127.0.0.1:{port}")])
            .arg("--storage-dir")
            .arg(dir.path())
            .args(["--public-url", &format!("{base}/storage")])
            .env("PROVMIRROR_CACHE_BACKEND", "memory")
            .env_remove("GITHUB_TOKEN")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start provmirror"),
    );

    let client = reqwest::Client::new();
    let mut discovery = None;
    for _ in 0..50 {
        if let Ok(response) = client
            .get(format!("{base}/.well-known/terraform.json"))
            .send()
            .await
        {
            discovery = Some(response);
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let body: serde_json::Value = discovery
        .expect("server did not come up")
        .json()
        .await
        .unwrap();
    assert_eq!(body["providers.v1"], "/v1/providers/");

    let stored = client
        .get(format!("{base}/storage/dl/a.zip"))
        .send()
        .await
        .unwrap();
    assert_eq!(stored.status().as_u16(), 200);
    assert_eq!(stored.bytes().await.unwrap().as_ref(), b"zip-bytes");

    let missing = client
        .get(format!("{base}/storage/dl/missing.zip"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
