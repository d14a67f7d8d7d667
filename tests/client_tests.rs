//! Tests that drive `AgoraClient` against a local HTTP server serving canned
//! responses.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use agora::{AgoraClient, ApiConfig, ChunkType, MessageRole, StreamReducer, reduce_stream};

/// Serve one connection: read the request, write `parts` with a short pause
/// between each, then close.  Resolves to the raw request.
async fn serve(parts: Vec<Vec<u8>>) -> (AgoraClient, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        for part in parts {
            socket.write_all(&part).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        socket.shutdown().await.unwrap();
        request
    });
    let base = format!("http://{addr}");
    let config = ApiConfig::new(&base, "ws://localhost:8000/ws").unwrap();
    (AgoraClient::new(config).unwrap(), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if request_complete(&buf) {
            break;
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let head = text[..head_end].to_ascii_lowercase();
    let body_len = buf.len() - (head_end + 4);
    if head.contains("transfer-encoding: chunked") {
        return text.ends_with("0\r\n\r\n");
    }
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    body_len >= content_length
}

fn response(status: &str, content_type: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

fn json(status: &str, body: &str) -> Vec<Vec<u8>> {
    vec![response(status, "application/json", body)]
}

#[tokio::test]
async fn list_sessions() {
    let (client, server) = serve(json(
        "200 OK",
        r#"[
            {"id": "session-1", "username": "ada", "created_at": "2024-05-01T12:00:00"},
            {"id": "session-2", "username": "grace", "created_at": "2024-05-02T08:30:00",
             "last_used": "2024-05-02T09:00:00"}
        ]"#,
    ))
    .await;

    let sessions = client.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "session-1");
    assert_eq!(sessions[1].username, "grace");
    assert_eq!(sessions[1].last_used.as_deref(), Some("2024-05-02T09:00:00"));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/sessions HTTP/1.1"));
}

#[tokio::test]
async fn create_session_posts_username() {
    let (client, server) = serve(json(
        "200 OK",
        r#"{"id": "session-9", "username": "ada", "created_at": "2024-05-01T12:00:00"}"#,
    ))
    .await;

    let session = client.create_session("ada").await.unwrap();
    assert_eq!(session.id, "session-9");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/sessions HTTP/1.1"));
    assert!(request.contains(r#"{"username":"ada"}"#));
}

#[tokio::test]
async fn get_messages_fills_in_ids() {
    let (client, server) = serve(json(
        "200 OK",
        r#"[
            {"role": "user", "content": "What is 2+2?"},
            {"role": "model", "content": "4", "metadata": {
                "code_result": {"code": "print(2+2)", "explanation": "adds", "execution_result": "4"}
            }}
        ]"#,
    ))
    .await;

    let messages = client.get_messages("session-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.id.is_some()));
    assert_ne!(messages[0].id, messages[1].id);
    assert!(
        messages
            .iter()
            .all(|m| m.session_id.as_deref() == Some("session-1"))
    );
    assert_eq!(messages[1].role, MessageRole::Model);
    assert!(messages[1].has_results());
    assert_eq!(messages[1].metadata_or_default().code[0].content, "print(2+2)");
    assert!(messages[0].metadata.is_some());

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/sessions/session-1/messages HTTP/1.1"));
}

#[tokio::test]
async fn not_found_uses_detail() {
    let (client, _server) = serve(json("404 Not Found", r#"{"detail": "Session not found"}"#)).await;

    let err = client.delete_session("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Session not found"));
}

#[tokio::test]
async fn validation_error_names_parameter() {
    let (client, _server) = serve(json(
        "422 Unprocessable Entity",
        r#"{"detail": [{"loc": ["body", "message"], "msg": "field required", "type": "value_error.missing"}]}"#,
    ))
    .await;

    let err = client.send_message("session-1", "", None).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "Validation error: field required (parameter: message)"
    );
}

#[tokio::test]
async fn server_error_without_body_uses_status_text() {
    let (client, _server) = serve(vec![response("503 Service Unavailable", "text/plain", "")]).await;

    let err = client.clear_session("session-1").await.unwrap_err();
    assert!(err.is_server_error());
    assert_eq!(err.to_string(), "Service unavailable: Service Unavailable");
}

#[tokio::test]
async fn clear_session_posts() {
    let (client, server) = serve(json("200 OK", r#"{"status": "cleared"}"#)).await;
    client.clear_session("session-1").await.unwrap();
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/sessions/session-1/clear HTTP/1.1"));
}

#[tokio::test]
async fn send_message_returns_reconciled_reply() {
    let (client, server) = serve(json(
        "200 OK",
        r#"{
            "session_id": "session-1",
            "result": {
                "answer": "Here is what I found.",
                "search_result": {"answer": "Rust 1.0 shipped in 2015.", "sources": ["https://blog.rust-lang.org"]}
            },
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }"#,
    ))
    .await;

    let reply = client
        .send_message("session-1", "When did Rust 1.0 ship?", Some("/uploads/x.png"))
        .await
        .unwrap();
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, "Here is what I found.");
    let metadata = reply.metadata_or_default();
    assert_eq!(metadata.search_results.len(), 1);
    assert_eq!(metadata.search_results[0].title, "Search Results");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/chat HTTP/1.1"));
    assert!(request.contains(r#""image_url":"/uploads/x.png""#));
}

#[tokio::test]
async fn stream_chat_survives_split_events() {
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";
    let body = concat!(
        "data: {\"type\":\"content\",\"role\":\"user\",\"content\":\"Caf\u{e9}?\"}\n\n",
        "data: {\"type\":\"content\",\"content\":\"Caf\u{e9}\"}\n\n",
        "data: {not json}\n\n",
        "data: {\"type\":\"content\",\"content\":\"Caf\u{e9} au lait\"}\n\n",
        "data: {\"type\":\"final\",\"metadata\":{\"code\":[]}}\n\n",
    )
    .as_bytes();

    // Split inside the second event, then between the two bytes of the
    // second "é".
    let mid_event = body.iter().position(|&b| b == b'}').unwrap() + 10;
    let second_e = body
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] == 0xc3 && w[1] == 0xa9)
        .map(|(i, _)| i)
        .nth(1)
        .unwrap();
    let mut parts = vec![head.as_bytes().to_vec()];
    parts.push(body[..mid_event].to_vec());
    parts.push(body[mid_event..second_e + 1].to_vec());
    parts.push(body[second_e + 1..].to_vec());
    let (client, server) = serve(parts).await;

    let stream = client
        .stream_chat("session-1", "Café?", None)
        .await
        .unwrap();
    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(Result::is_ok));
    let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
    assert!(chunks[0].is_user_echo());
    assert_eq!(chunks[1].content.as_deref(), Some("Café"));
    assert_eq!(chunks[3].r#type, ChunkType::Final);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/chat/stream HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("accept: text/event-stream"));
}

#[tokio::test]
async fn stream_chat_reduces_to_final_message() {
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";
    let body = concat!(
        "data: {\"type\":\"content\",\"content\":\"Hi\"}\n\n",
        "data: {\"type\":\"content\",\"content\":\"Hi there\"}\n\n",
        "data: {\"type\":\"final\",\"metadata\":{\"code\":[]}}\n\n",
    );
    let (client, _server) = serve(vec![head.as_bytes().to_vec(), body.as_bytes().to_vec()]).await;

    let stream = client.stream_chat("session-1", "hello", None).await.unwrap();
    let mut updates = Vec::new();
    let message = reduce_stream(stream, StreamReducer::new("session-1"), |m| {
        updates.push(m.content.clone())
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(message.content, "Hi there");
    assert_eq!(message.metadata, Some(agora::MessageMetadata::default()));
    assert_eq!(updates.last().map(String::as_str), Some("Hi there"));
}

#[tokio::test]
async fn stream_chat_reports_http_errors_before_streaming() {
    let (client, _server) = serve(json("500 Internal Server Error", r#"{"detail": "agent crashed"}"#)).await;
    let err = match client.stream_chat("session-1", "hello", None).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert!(err.is_server_error());
    assert!(err.to_string().contains("agent crashed"));
}

#[tokio::test]
async fn upload_image_bytes_sends_multipart() {
    let (client, server) = serve(json(
        "200 OK",
        r#"{"filename": "4f2a.png", "image_url": "/uploads/4f2a.png"}"#,
    ))
    .await;

    let upload = client
        .upload_image_bytes("cat.png", vec![0x89, b'P', b'N', b'G'])
        .await
        .unwrap();
    assert_eq!(upload.filename, "4f2a.png");
    assert_eq!(upload.image_url, "/uploads/4f2a.png");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/upload-image HTTP/1.1"));
    let request = request.to_ascii_lowercase();
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains(r#"name="file"; filename="cat.png""#));
    assert!(request.contains("content-type: image/png"));
}

#[tokio::test]
async fn empty_upload_is_rejected_locally() {
    let config = ApiConfig::new("http://127.0.0.1:9", "ws://127.0.0.1:9/ws").unwrap();
    let client = AgoraClient::new(config).unwrap();
    let err = client.upload_image_bytes("empty.png", Vec::new()).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn unreachable_service_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ApiConfig::new(&format!("http://{addr}"), "ws://localhost:8000/ws").unwrap();
    let client = AgoraClient::new(config).unwrap();
    let err = client.list_sessions().await.unwrap_err();
    assert!(err.is_connection());
}
