use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use assert_matches::assert_matches;

use kira_geo_fetch::config::Settings;
use kira_geo_fetch::error::KiraError;
use kira_geo_fetch::geo::{GeoClient, GeoHttpClient};

/// Answers a single request with `response` and closes the connection.
fn serve_once(response: &[u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = response.to_vec();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(read) => request.extend_from_slice(&buf[..read]),
            }
        }
        let _ = stream.write_all(&response);
        let _ = stream.flush();
    });
    format!("http://{addr}/GSE1_RAW.tar")
}

fn client() -> GeoHttpClient {
    let settings = Settings {
        chunk_size: 4,
        listing_timeout_secs: 5,
        download_connect_timeout_secs: 5,
        download_timeout_secs: 5,
        ..Settings::default()
    };
    GeoHttpClient::new(&settings).unwrap()
}

fn entries(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect()
}

#[test]
fn body_is_written_in_chunks() {
    let temp = tempfile::tempdir().unwrap();
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\nhello world",
    );
    let dest = temp.path().join("GSE1_RAW.tar");

    let written = client().download_url(&url, &dest).unwrap();
    assert_eq!(written, 11);
    assert_eq!(fs::read(&dest).unwrap(), b"hello world");
    assert_eq!(entries(temp.path()), vec!["GSE1_RAW.tar".to_string()]);
}

#[test]
fn not_found_creates_no_file() {
    let temp = tempfile::tempdir().unwrap();
    let url =
        serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let dest = temp.path().join("GSE1_RAW.tar");

    let err = client().download_url(&url, &dest).unwrap_err();
    assert_matches!(err, KiraError::GeoStatus { status: 404, .. });
    assert!(entries(temp.path()).is_empty());
}

#[test]
fn only_200_counts_as_success() {
    let temp = tempfile::tempdir().unwrap();
    let url = serve_once(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n");
    let dest = temp.path().join("GSE1_RAW.tar");

    let err = client().download_url(&url, &dest).unwrap_err();
    assert_matches!(err, KiraError::GeoStatus { status: 204, .. });
    assert!(!dest.exists());
}

#[test]
fn truncated_body_leaves_nothing_behind() {
    let temp = tempfile::tempdir().unwrap();
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nonly part",
    );
    let dest = temp.path().join("GSE1_RAW.tar");

    let err = client().download_url(&url, &dest).unwrap_err();
    assert_matches!(err, KiraError::GeoHttp(_));
    assert!(entries(temp.path()).is_empty());
}

#[test]
fn page_text_is_returned() {
    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>",
    );
    assert_eq!(client().fetch_page(&url).unwrap(), "<html></html>");
}
