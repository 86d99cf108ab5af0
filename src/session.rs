//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript and
//! the client for one conversation and runs streaming turns against it.

use std::time::Instant;

use crate::client::{ContentGenerator, Gemini};
use crate::config::BotConfig;
use crate::consumer::consume_stream;
use crate::credential::ApiKey;
use crate::error::Result;
use crate::observability::{SESSION_TURN_DURATION, SESSION_TURN_ERRORS, SESSION_TURNS};
use crate::render::{Renderer, render_transcript};
use crate::request::build_request;
use crate::transcript::{Message, Transcript};
use crate::types::Model;

/// A chat session that manages conversation state and API interactions.
///
/// The session keeps the transcript and sends all of it with every turn.
/// The generator and configuration are fixed once the session exists.
#[derive(Debug)]
pub struct ChatSession<G: ContentGenerator = Gemini> {
    generator: G,
    config: BotConfig,
    transcript: Transcript,
    completed_turns: u64,
    failed_turns: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Turns that produced a recorded reply.
    pub completed_turns: u64,
    /// Turns that ended in an error.
    pub failed_turns: u64,
    /// The maximum output tokens per reply.
    pub max_output_tokens: u32,
    /// The sampling temperature.
    pub temperature: f64,
    /// Whether Google Search grounding is enabled.
    pub search_enabled: bool,
    /// The system instruction, if any.
    pub system_instruction: Option<String>,
}

impl ChatSession<Gemini> {
    /// Connect to Gemini with a resolved credential.
    ///
    /// A missing credential is returned unchanged and no client is built.
    pub fn connect(credential: Result<ApiKey>, config: BotConfig) -> Result<Self> {
        Self::initialize(credential, config, |key, config| {
            Gemini::with_options(key, config.base_url.as_deref(), None)
        })
    }
}

impl<G: ContentGenerator> ChatSession<G> {
    /// Initialize a session from the outcome of credential resolution.
    ///
    /// `connect` runs only when the credential resolved.  Either failure is
    /// returned as-is; no session exists afterwards.
    pub fn initialize<F>(credential: Result<ApiKey>, config: BotConfig, connect: F) -> Result<Self>
    where
        F: FnOnce(&ApiKey, &BotConfig) -> Result<G>,
    {
        let key = credential?;
        let generator = connect(&key, &config).inspect_err(|err| {
            tracing::warn!(error = %err, "failed to initialize Gemini client");
        })?;
        tracing::info!(model = %config.model, "chat session initialized");
        Ok(Self::with_generator(generator, config))
    }

    /// Creates a new chat session around an existing generator.
    pub fn with_generator(generator: G, config: BotConfig) -> Self {
        Self {
            generator,
            config,
            transcript: Transcript::new(),
            completed_turns: 0,
            failed_turns: 0,
        }
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to the transcript
    /// 2. Sends the whole transcript as a streaming request
    /// 3. Renders response chunks as they arrive
    /// 4. Adds the complete reply to the transcript, even when it is empty
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the stream breaks.  The user
    /// message stays in the transcript and no reply is recorded.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        SESSION_TURNS.click();
        let start = Instant::now();

        self.transcript.push(Message::user(user_input));
        let result = self.run_turn(renderer).await;
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                if reply.is_empty() {
                    tracing::warn!(model = %self.config.model, "model returned an empty reply");
                }
                self.transcript.push(Message::model(reply));
                self.completed_turns += 1;
                Ok(())
            }
            Err(err) => {
                SESSION_TURN_ERRORS.click();
                tracing::warn!(error = %err, "turn failed");
                self.failed_turns += 1;
                Err(err)
            }
        }
    }

    async fn run_turn(&self, renderer: &mut dyn Renderer) -> Result<String> {
        let request = build_request(self.transcript.as_slice(), &self.config.generation);
        let stream = self
            .generator
            .stream_generate_content(&self.config.model, &request)
            .await?;
        consume_stream(stream, renderer).await
    }

    /// Draw every stored message, in order.
    pub fn render_history(&self, renderer: &mut dyn Renderer) {
        render_transcript(&self.transcript, renderer);
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let generation = &self.config.generation;
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.message_count(),
            completed_turns: self.completed_turns,
            failed_turns: self.failed_turns,
            max_output_tokens: generation.max_output_tokens,
            temperature: generation.temperature,
            search_enabled: self.config.search_enabled(),
            system_instruction: generation.system_instruction.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;
    use crate::Error;
    use crate::client::ChunkStream;
    use crate::render::testing::{Call, RecordingRenderer};
    use crate::transcript::Role;
    use crate::types::{ContentRole, GenerateContentRequest, StreamChunk};

    #[derive(Debug)]
    enum Reply {
        Chunks(Vec<Result<StreamChunk>>),
        Reject(Error),
    }

    #[derive(Debug, Default)]
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> GenerateContentRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn stream_generate_content(
            &self,
            _model: &Model,
            request: &GenerateContentRequest,
        ) -> Result<ChunkStream> {
            self.requests.lock().unwrap().push(request.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Chunks(chunks)) => Ok(Box::pin(stream::iter(chunks))),
                Some(Reply::Reject(err)) => Err(err),
                None => Ok(Box::pin(stream::empty())),
            }
        }
    }

    fn text(t: &str) -> Result<StreamChunk> {
        Ok(StreamChunk::TextDelta(t.to_string()))
    }

    fn session(replies: Vec<Reply>) -> ChatSession<ScriptedGenerator> {
        ChatSession::with_generator(ScriptedGenerator::new(replies), BotConfig::new())
    }

    #[tokio::test]
    async fn successful_turn_adds_two_messages() {
        let mut session = session(vec![Reply::Chunks(vec![
            text("嘉義"),
            text("三日遊"),
            text("建議：..."),
        ])]);
        let mut renderer = RecordingRenderer::default();

        session
            .send_streaming("請規劃嘉義3天2夜行程", &mut renderer)
            .await
            .unwrap();

        assert_eq!(
            session.transcript().as_slice(),
            &[
                Message::user("請規劃嘉義3天2夜行程"),
                Message::model("嘉義三日遊建議：..."),
            ]
        );
        assert_eq!(
            renderer.updates(),
            vec!["嘉義▌", "嘉義三日遊▌", "嘉義三日遊建議：...▌"]
        );
        assert_eq!(
            renderer.calls.last(),
            Some(&Call::Finish("嘉義三日遊建議：...".to_string()))
        );
        assert_eq!(session.stats().completed_turns, 1);
    }

    #[tokio::test]
    async fn request_carries_whole_transcript() {
        let mut session = session(vec![
            Reply::Chunks(vec![text("第一天：文化路夜市")]),
            Reply::Chunks(vec![text("阿里山日出")]),
        ]);
        let mut renderer = RecordingRenderer::default();

        session.send_streaming("嘉義", &mut renderer).await.unwrap();
        session
            .send_streaming("第二天想去阿里山", &mut renderer)
            .await
            .unwrap();

        let request = session.generator.last_request();
        let contents: Vec<(Option<ContentRole>, Option<String>)> = request
            .contents
            .iter()
            .map(|content| (content.role, content.text()))
            .collect();
        assert_eq!(
            contents,
            vec![
                (Some(ContentRole::User), Some("嘉義".to_string())),
                (Some(ContentRole::Model), Some("第一天：文化路夜市".to_string())),
                (Some(ContentRole::User), Some("第二天想去阿里山".to_string())),
            ]
        );
        assert_eq!(session.message_count(), 4);
        assert_eq!(session.generator.calls(), 2);
    }

    #[tokio::test]
    async fn empty_reply_is_recorded() {
        let mut session = session(vec![Reply::Chunks(vec![Ok(StreamChunk::Other(
            serde_json::json!({"usageMetadata": {}}),
        ))])]);
        let mut renderer = RecordingRenderer::default();

        session.send_streaming("hi", &mut renderer).await.unwrap();

        assert_eq!(session.message_count(), 2);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.content, "");
    }

    #[tokio::test]
    async fn rejected_request_keeps_only_user_message() {
        let mut session = session(vec![Reply::Reject(Error::bad_request(
            "API key not valid.",
        ))]);
        let mut renderer = RecordingRenderer::default();

        let err = session.send_streaming("hi", &mut renderer).await.unwrap_err();

        assert!(err.is_bad_request());
        assert_eq!(session.transcript().as_slice(), &[Message::user("hi")]);
        assert!(renderer.calls.is_empty());
        assert_eq!(session.stats().failed_turns, 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_only_user_message() {
        let mut session = session(vec![Reply::Chunks(vec![
            text("嘉義"),
            Err(Error::streaming("connection reset", None)),
        ])]);
        let mut renderer = RecordingRenderer::default();

        let err = session.send_streaming("hi", &mut renderer).await.unwrap_err();

        assert!(err.is_streaming());
        assert_eq!(session.message_count(), 1);
        assert_eq!(renderer.updates(), vec!["嘉義▌"]);
    }

    #[test]
    fn missing_credential_never_connects() {
        let connects = AtomicUsize::new(0);
        let result = ChatSession::initialize(
            Err(Error::missing_credential("GEMINI_API_KEY")),
            BotConfig::new(),
            |_, _| {
                connects.fetch_add(1, Ordering::SeqCst);
                Ok(ScriptedGenerator::default())
            },
        );

        assert!(result.unwrap_err().is_missing_credential());
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn connect_failure_yields_no_session() {
        let result: Result<ChatSession<ScriptedGenerator>> = ChatSession::initialize(
            Ok(ApiKey::new("key").unwrap()),
            BotConfig::new(),
            |_, _| Err(Error::connection("dns lookup failed", None)),
        );
        assert!(result.unwrap_err().is_connection());
    }

    #[test]
    fn connect_builds_gemini_client() {
        let session = ChatSession::connect(
            Ok(ApiKey::new("key").unwrap()),
            BotConfig::new().with_base_url("http://localhost:8080/v1beta"),
        )
        .unwrap();
        assert_eq!(
            session.generator.base_url().as_str(),
            "http://localhost:8080/v1beta/"
        );
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn history_replays_in_order() {
        let mut session = session(vec![]);
        session.transcript.push(Message::user("請規劃嘉義3天2夜行程"));
        session.transcript.push(Message::model("嘉義三日遊建議：..."));
        let mut renderer = RecordingRenderer::default();

        session.render_history(&mut renderer);

        assert_eq!(renderer.calls.len(), 2);
        assert_eq!(session.message_count(), 2);
    }

    #[test]
    fn stats_reflect_config() {
        let session = session(vec![]);
        let stats = session.stats();
        assert_eq!(stats.model, Model::default());
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.max_output_tokens, 65535);
        assert_eq!(stats.temperature, 0.6);
        assert!(stats.search_enabled);
        assert!(stats.system_instruction.is_some());
    }
}
