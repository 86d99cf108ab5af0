//! Integration tests for the travelbot library.
//!
//! The local-server tests speak just enough HTTP to serve one canned
//! response.  The live test requires an API key in the environment to run.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use travelbot::{
        API_KEY_ENV, ApiKey, BotConfig, ChatSession, ContentGenerator, DisplayRole, Gemini,
        GenerateContentRequest, GenerationConfig, Message, Model, Renderer, build_contents,
    };

    #[derive(Default)]
    struct CollectingRenderer {
        frames: Vec<String>,
        finished: Vec<String>,
    }

    impl Renderer for CollectingRenderer {
        fn print_message(&mut self, _role: DisplayRole, _text: &str) {}

        fn update_response(&mut self, frame: &str) {
            self.frames.push(frame.to_string());
        }

        fn finish_response(&mut self, text: &str) {
            self.finished.push(text.to_string());
        }

        fn print_error(&mut self, _error: &str) {}

        fn print_info(&mut self, _info: &str) {}
    }

    /// Serve one request with `status` and `body`, returning what was received.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/v1beta/"), handle)
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
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Stream `texts` one event at a time, pausing `pause` before each one.
    async fn serve_slowly(texts: &'static [&'static str], pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            for text in texts {
                tokio::time::sleep(pause).await;
                socket.write_all(text_event(text).as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/v1beta/")
    }

    /// Accept one request and never answer it.
    async fn serve_nothing() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        (format!("http://{addr}/v1beta/"), handle)
    }

    fn text_event(text: &str) -> String {
        let chunk = serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        });
        format!("data: {chunk}\r\n\r\n")
    }

    fn sse_body(texts: &[&str]) -> String {
        let mut body = String::new();
        for text in texts {
            body.push_str(&text_event(text));
        }
        body.push_str("data: {\"usageMetadata\": {\"totalTokenCount\": 42}}\r\n\r\n");
        body
    }

    fn connect(base_url: &str) -> ChatSession {
        ChatSession::connect(
            Ok(ApiKey::new("test-key").unwrap()),
            BotConfig::new().with_base_url(base_url),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn streamed_turn_over_http() {
        let (base_url, server) =
            serve_once("200 OK", "text/event-stream", sse_body(&["嘉義", "三日遊"])).await;
        let mut session = connect(&base_url);
        let mut renderer = CollectingRenderer::default();

        session
            .send_streaming("請規劃嘉義3天2夜行程", &mut renderer)
            .await
            .unwrap();

        assert_eq!(
            session.transcript().as_slice(),
            &[
                Message::user("請規劃嘉義3天2夜行程"),
                Message::model("嘉義三日遊"),
            ]
        );
        assert_eq!(renderer.frames, vec!["嘉義▌", "嘉義三日遊▌"]);
        assert_eq!(renderer.finished, vec!["嘉義三日遊"]);

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with(
            "POST /v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse HTTP/1.1"
        ));
        assert!(head.to_lowercase().contains("x-goog-api-key: test-key"));
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "請規劃嘉義3天2夜行程");
        assert_eq!(body["tools"], serde_json::json!([{"googleSearch": {}}]));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 65535);
        assert!(body["systemInstruction"]["parts"][0]["text"].is_string());
    }

    #[tokio::test]
    async fn rejected_key_is_reported() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let (base_url, server) =
            serve_once("400 Bad Request", "application/json", body.to_string()).await;
        let mut session = connect(&base_url);
        let mut renderer = CollectingRenderer::default();

        let err = session.send_streaming("hi", &mut renderer).await.unwrap_err();

        assert!(err.is_bad_request());
        assert!(err.to_string().contains("API key not valid"));
        assert_eq!(session.transcript().as_slice(), &[Message::user("hi")]);
        assert!(renderer.frames.is_empty());
        server.await.unwrap();
    }

    fn one_turn_request() -> GenerateContentRequest {
        GenerateContentRequest::new(
            build_contents(&[Message::user("請規劃嘉義3天2夜行程")]),
            &GenerationConfig::new(),
        )
    }

    #[tokio::test]
    async fn slow_stream_outlives_timeout() {
        let texts: &'static [&'static str] = &["第一天", "第二天", "第三天", "阿里山", "夜市", "結束"];
        let base_url = serve_slowly(texts, Duration::from_millis(400)).await;
        let key = ApiKey::new("test-key").unwrap();
        let client =
            Gemini::with_options(&key, Some(&base_url), Some(Duration::from_secs(1))).unwrap();

        let stream = client
            .stream_generate_content(&Model::default(), &one_turn_request())
            .await
            .unwrap();
        let chunks: Vec<_> = stream.collect().await;

        let mut reply = String::new();
        for chunk in chunks {
            reply.push_str(chunk.unwrap().text().unwrap_or_default());
        }
        assert_eq!(reply, texts.concat());
    }

    #[tokio::test]
    async fn missing_response_headers_time_out() {
        let (base_url, server) = serve_nothing().await;
        let key = ApiKey::new("test-key").unwrap();
        let client =
            Gemini::with_options(&key, Some(&base_url), Some(Duration::from_millis(200))).unwrap();

        let err = match client
            .stream_generate_content(&Model::default(), &one_turn_request())
            .await
        {
            Ok(_) => panic!("request without response headers should time out"),
            Err(err) => err,
        };

        assert!(err.is_timeout());
        server.abort();
    }

    #[tokio::test]
    async fn live_gemini_turn() {
        // This test requires GEMINI_API_KEY to be set
        let Some(key) = std::env::var(API_KEY_ENV).ok().and_then(ApiKey::new) else {
            eprintln!("Skipping test: {API_KEY_ENV} not set");
            return;
        };

        let config = BotConfig::new()
            .without_tools()
            .with_max_output_tokens(64);
        let mut session = ChatSession::connect(Ok(key), config).expect("Failed to create client");
        let mut renderer = CollectingRenderer::default();

        let result = session
            .send_streaming("Reply with the word 'ok'.", &mut renderer)
            .await;
        assert!(result.is_ok(), "Request should succeed with valid API key");
        assert_eq!(session.message_count(), 2);
    }
}
