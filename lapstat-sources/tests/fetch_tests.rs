//! Integration tests for document sources

use lapstat_core::config::FetchSettings;
use lapstat_core::error::SourceError;
use lapstat_core::source::DocumentSource;
use lapstat_sources::{FileSource, HttpSource};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Helper: serve one canned response per connection, in order
///
/// Returns the document URL and a counter of requests received.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/replays/1", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let served = Arc::clone(&hits);

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            served.fetch_add(1, Ordering::SeqCst);
            let reason = if status == 200 { "OK" } else { "Internal Server Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (url, hits)
}

fn quick_retries(retries: u32) -> FetchSettings {
    FetchSettings {
        retries,
        backoff_ms: 0,
        timeout_s: 5,
    }
}

#[test]
fn test_file_source_reads_document() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"laps": []}}"#).unwrap();

    let source = FileSource::new(file.path());
    assert_eq!(source.name(), "file");
    assert_eq!(source.load().unwrap(), r#"{"laps": []}"#);
}

#[test]
fn test_missing_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("misano.json");

    let err = FileSource::new(&path).load().unwrap_err();
    match err {
        SourceError::SourceUnavailable { location, .. } => {
            assert_eq!(location, path.display().to_string());
        }
        other => panic!("expected SourceUnavailable, got {:?}", other),
    }
}

#[test]
fn test_unreachable_http_source_gives_up_after_retries() {
    let settings = FetchSettings {
        retries: 1,
        backoff_ms: 0,
        timeout_s: 2,
    };
    // nothing listens on the discard port of the loopback interface
    let source = HttpSource::new("http://127.0.0.1:9/api/replays/1", settings).unwrap();
    assert_eq!(source.name(), "http");

    let err = source.load().unwrap_err();
    let SourceError::SourceUnavailable { ref location, .. } = err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(location, "http://127.0.0.1:9/api/replays/1");
}

#[test]
fn test_http_source_retries_after_server_error() {
    let (url, hits) = serve(vec![(500, "oops"), (200, r#"{"laps": []}"#)]);
    let source = HttpSource::new(&url, quick_retries(2)).unwrap();

    assert_eq!(source.load().unwrap(), r#"{"laps": []}"#);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_http_source_server_errors_exhaust_retries() {
    let (url, hits) = serve(vec![(500, "oops"), (500, "oops"), (200, "never sent")]);
    let source = HttpSource::new(&url, quick_retries(1)).unwrap();

    let err = source.load().unwrap_err();
    assert!(
        matches!(err, SourceError::SourceUnavailable { ref location, .. } if *location == url),
        "unexpected error: {err:?}"
    );
    // one attempt plus one retry, the third response is never requested
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
