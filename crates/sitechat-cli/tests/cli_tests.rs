//! Integration tests for the sitechat binary
//!
//! Everything runs against a JSONL memory store. The only network service is
//! a loopback embedding endpoint served from the test itself.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use tempfile::TempDir;

fn sitechat_cmd() -> Command {
    let mut cmd = Command::cargo_bin("sitechat").unwrap();
    cmd.env_clear();
    cmd
}

/// Nothing listens on the discard port, so requests fail fast
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn write_memory_config(
    dir: &TempDir,
    embedding_url: Option<&str>,
    generator_url: Option<&str>,
) -> PathBuf {
    let chunks = dir.path().join("chunks.jsonl");
    fs::write(
        &chunks,
        concat!(
            r#"{"site_name":"acme.io","url":"https://acme.io/about","chunk_index":0,"run_id":"r1","text":"About us","$vector":[0.1,0.2,0.3]}"#,
            "\n",
            r#"{"site_name":"acme.io","url":"https://acme.io/pricing","chunk_index":0,"run_id":"r1","text":"Pricing","$vector":[0.3,0.2,0.1]}"#,
            "\n",
            r#"{"site_name":"other.org","url":"https://other.org","chunk_index":0,"text":"Other","$vector":[1.0,0.0,0.0]}"#,
            "\n",
        ),
    )
    .unwrap();

    let mut yaml = String::from("site:\n  site_id: acme.io\nembedding:\n  dimensions: 3\n");
    if let Some(url) = embedding_url {
        yaml.push_str(&format!("  url: {}\n", url));
    }
    if let Some(url) = generator_url {
        yaml.push_str(&format!("generator:\n  provider: openai\n  url: {}\n", url));
    }
    yaml.push_str(&format!(
        "store:\n  kind: memory\n  chunks_path: {}\n",
        chunks.display()
    ));

    let config = dir.path().join("config.yml");
    fs::write(&config, yaml).unwrap();
    config
}

/// Serve `/v1/embeddings` on a local port, answering every request with `vector`
fn serve_embedding(vector: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            read_request(&mut stream);
            let body = format!(r#"{{"data":[{{"index":0,"embedding":{}}}]}}"#, vector);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{}", addr)
}

fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}

#[test]
fn test_help() {
    sitechat_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_terms_offline() {
    sitechat_cmd()
        .args(["terms", "Do", "you", "hire", "C++", "developers?"])
        .assert()
        .success()
        .stdout("hire\nc++\ndevelopers\n");
}

#[test]
fn test_terms_json() {
    sitechat_cmd()
        .args(["--format", "json", "terms", r#""machine learning" models for finance"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"machine learning\""))
        .stdout(predicate::str::contains("\"finance\""));
}

#[test]
fn test_ask_without_site_is_config_error() {
    let dir = TempDir::new().unwrap();
    sitechat_cmd()
        .arg("--config")
        .arg(dir.path().join("missing.yml"))
        .args(["ask", "What do you do?"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("site.site_id"));
}

#[test]
fn test_ask_without_services_is_config_error() {
    let dir = TempDir::new().unwrap();
    sitechat_cmd()
        .arg("--config")
        .arg(dir.path().join("missing.yml"))
        .args(["ask", "--site", "acme.io", "What do you do?"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("embedding.url"));
}

#[test]
fn test_inspect_memory_store() {
    let dir = TempDir::new().unwrap();
    let config = write_memory_config(&dir, None, None);

    sitechat_cmd()
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("memory store | site_name=acme.io"))
        .stdout(predicate::str::contains("https://acme.io/pricing"))
        .stdout(predicate::str::contains("other.org").not())
        .stdout(predicate::str::contains("match embedding.dimensions (3)"));
}

#[test]
fn test_inspect_reports_dimension_mismatch_as_json() {
    let dir = TempDir::new().unwrap();
    let config = write_memory_config(&dir, None, None);
    let yaml = fs::read_to_string(&config)
        .unwrap()
        .replace("dimensions: 3", "dimensions: 768");
    fs::write(&config, yaml).unwrap();

    let output = sitechat_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "inspect", "--site", "acme.io"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["dimensions_match"], false);
    assert_eq!(parsed["documents"].as_array().unwrap().len(), 2);
}

#[test]
fn test_search_runs_without_generator() {
    let dir = TempDir::new().unwrap();
    let embedding_url = serve_embedding("[0.3,0.2,0.1]");
    let config = write_memory_config(&dir, Some(&embedding_url), None);

    sitechat_cmd()
        .arg("--config")
        .arg(&config)
        .args(["search", "pricing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 fetched, 1 after keyword gate"))
        .stdout(predicate::str::contains("keyword fallback"))
        .stdout(predicate::str::contains("https://acme.io/pricing"))
        .stdout(predicate::str::contains("https://acme.io/about").not());
}

#[test]
fn test_ask_still_requires_generator() {
    let dir = TempDir::new().unwrap();
    let config = write_memory_config(&dir, Some(UNREACHABLE), None);

    sitechat_cmd()
        .arg("--config")
        .arg(&config)
        .args(["ask", "pricing"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("generator.url"));
}

fn chat_with_stdin(input: &str) -> assert_cmd::assert::Assert {
    let dir = TempDir::new().unwrap();
    let config = write_memory_config(&dir, Some(UNREACHABLE), Some(UNREACHABLE));

    sitechat_cmd()
        .arg("--config")
        .arg(&config)
        .arg("chat")
        .write_stdin(input)
        .assert()
}

#[test]
fn test_chat_ends_on_eof() {
    chat_with_stdin("")
        .success()
        .stdout(predicate::str::contains("Ask: ").count(1));
}

#[test]
fn test_chat_ends_on_empty_line() {
    chat_with_stdin("\nWhat do you charge?\n")
        .success()
        .stdout(predicate::str::contains("Ask: ").count(1));
}

#[test]
fn test_chat_ends_on_exit_or_quit() {
    chat_with_stdin("exit\nWhat do you charge?\n")
        .success()
        .stdout(predicate::str::contains("Ask: ").count(1));
    chat_with_stdin("  QUIT \nWhat do you charge?\n")
        .success()
        .stdout(predicate::str::contains("Ask: ").count(1));
}

#[test]
fn test_chat_keeps_going_after_a_failed_question() {
    chat_with_stdin("What do you charge?\nquit\n")
        .success()
        .stdout(predicate::str::contains("Ask: ").count(2))
        .stderr(predicate::str::contains("Error:"));
}
