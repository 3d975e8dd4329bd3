//! Checksum verification against a local one-shot HTTP endpoint.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use wpscaffold::wp_cli::verify::{Checker, HashAlgo, VerifyOutcome};

/// Serve exactly one HTTP response on a loopback port, then shut down.
fn serve_once(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let addr = listener.local_addr().expect("local address");
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/wp-cli.phar")
}

fn artifact_with(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create artifact directory");
    let path = dir.path().join("wp-cli.phar");
    fs::write(&path, contents).expect("write artifact");
    (dir, path)
}

#[test]
fn matching_digest_verifies() {
    let contents = b"phar bytes";
    let digest = HashAlgo::Sha512.digest_hex(contents);
    let url = serve_once("200 OK", format!("{digest}  wp-cli.phar\n"));
    let (_dir, artifact) = artifact_with(contents);

    let outcome = Checker::new(&url).verify(&artifact).expect("verify");
    assert_eq!(outcome, VerifyOutcome::Verified);
}

#[test]
fn corrupted_artifact_reports_a_mismatch() {
    let digest = HashAlgo::Sha512.digest_hex(b"pristine bytes");
    let url = serve_once("200 OK", format!("{digest}\n"));
    let (_dir, artifact) = artifact_with(b"tampered bytes");

    let outcome = Checker::new(&url).verify(&artifact).expect("verify");
    assert!(matches!(outcome, VerifyOutcome::Mismatch { .. }));
    let message = outcome.to_string();
    assert!(message.contains("hash check failed"));
    assert!(message.contains(&digest));
}

#[test]
fn unreachable_checksum_endpoint_reports_a_fetch_failure() {
    let url = serve_once("404 Not Found", "missing\n".to_string());
    let (_dir, artifact) = artifact_with(b"whatever");

    let outcome = Checker::new(&url).verify(&artifact).expect("verify");
    match &outcome {
        VerifyOutcome::FetchFailed { url, .. } => {
            assert!(url.ends_with(".sha512"));
        }
        other => panic!("expected a fetch failure, got {other:?}"),
    }
    assert!(outcome.to_string().contains("checksum fetch failed"));
}

#[test]
fn md5_fallback_uses_its_own_endpoint() {
    let contents = b"legacy bytes";
    let digest = HashAlgo::Md5.digest_hex(contents);
    let checker = Checker::with_algo("http://unused.invalid/wp-cli.phar", HashAlgo::Md5);
    assert!(checker.checksum_url().ends_with(".md5"));

    let url = serve_once("200 OK", format!("{digest}\n"));
    let (_dir, artifact) = artifact_with(contents);
    let outcome = Checker::with_algo(&url, HashAlgo::Md5)
        .verify(&artifact)
        .expect("verify");
    assert_eq!(outcome, VerifyOutcome::Verified);
}
