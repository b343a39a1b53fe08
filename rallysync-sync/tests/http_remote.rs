use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rallysync_core::{EventFields, Field, RowPosition, UniqueId};
use rallysync_sync::remote::{CreateRowRequest, RequestMetadata};
use rallysync_sync::{HttpRemote, RemoteApi, RemoteError};

/// Accept one connection, answer it with `status` and `body`, and hand back
/// the request body that was received.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = format!("http://{}/hook", listener.local_addr().expect("addr"));

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("length");
                }
            }
        }
        let mut request = vec![0; content_length];
        reader.read_exact(&mut request).expect("body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("respond");
        String::from_utf8(request).expect("utf8")
    });

    (endpoint, handle)
}

fn create_request() -> CreateRowRequest {
    CreateRowRequest {
        unique_id: UniqueId::placeholder(RowPosition(2)),
        data: EventFields::default()
            .with(Field::DateTime, "2024-05-01 10:00")
            .with(Field::Player1, "Tan")
            .with(Field::Player2, "Lee"),
        metadata: RequestMetadata::now("sheet", Some(RowPosition(2))),
    }
}

#[test]
fn create_posts_tagged_json_and_reads_the_id() {
    let (endpoint, server) = serve_once("200 OK", r#"{"success":true,"remoteId":4567}"#);
    let remote = HttpRemote::new(endpoint, Duration::from_secs(5));

    let response = remote.create_row(&create_request()).expect("create");
    let sent: serde_json::Value =
        serde_json::from_str(&server.join().expect("server")).expect("json");

    assert_eq!(response.remote_id.as_deref(), Some("4567"));
    assert_eq!(sent["operation"], "CREATE_HUBDB_ROW");
    assert_eq!(sent["uniqueId"], "row:2");
    assert_eq!(sent["data"]["player1"], "Tan");
    assert_eq!(sent["metadata"]["sourcePosition"], 2);
}

#[test]
fn non_success_status_carries_code_and_body() {
    let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#);
    let remote = HttpRemote::new(endpoint, Duration::from_secs(5));

    let err = remote.create_row(&create_request()).unwrap_err();
    server.join().expect("server");

    match err {
        RemoteError::Status { code, body } => {
            assert_eq!(code, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn unreachable_endpoint_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let remote = HttpRemote::new(format!("http://127.0.0.1:{port}/"), Duration::from_secs(2));

    let err = remote.create_row(&create_request()).unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)), "{err:?}");
}
