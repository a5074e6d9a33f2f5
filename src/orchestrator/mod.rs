//! Conversation orchestrator
//!
//! Top-level state machine over the turn lifecycle. Owns the append-only
//! conversation log, drives one outstanding remote request at a time, routes
//! each raw reply through directive classification before segmentation, and
//! arbitrates the speech controllers against turn transitions. No failure
//! from a remote call leaves this module as an unhandled fault; every
//! failure path ends in an appended assistant message.

use crate::config::AssistantConfig;
use crate::error::{classify, ErrorKind, IMAGE_APOLOGY, TURN_APOLOGY};
use crate::messages::{ConversationLog, Message, MessagePart, Role};
use crate::reply::{classify_reply, parse_reply, ReplyKind};
use crate::service::{ChatService, GeminiChat, GeminiImage, ImageService};
use crate::speech::{SpeechInput, SpeechInputEvent, SpeechOutput};
use tracing::{debug, info, warn};

/// Turn lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingReply,
    GeneratingImage,
    /// Transient annotation of a failed turn; resolves back to [`Phase::Idle`]
    /// once the failure message has been appended
    Failed,
}

type OnlineProbe = Box<dyn Fn() -> bool + Send>;

pub struct Orchestrator {
    /// `None` when session creation failed at startup; submission disabled
    chat: Option<Box<dyn ChatService>>,
    image: Box<dyn ImageService>,
    log: ConversationLog,
    draft: String,
    phase: Phase,
    speech_input: SpeechInput,
    speech_output: SpeechOutput,
    online: OnlineProbe,
}

impl Orchestrator {
    /// Create an orchestrator over the Gemini adapters.
    ///
    /// A configuration without a usable credential leaves the orchestrator in
    /// a degraded state: a single pre-seeded assistant message explains the
    /// problem and `submit` is permanently refused.
    pub fn new(
        config: AssistantConfig,
        speech_input: SpeechInput,
        speech_output: SpeechOutput,
    ) -> Self {
        let chat: Option<Box<dyn ChatService>> = match config.validate() {
            Ok(()) => Some(Box::new(GeminiChat::new(&config))),
            Err(reason) => {
                warn!("Session creation failed: {}", reason);
                None
            }
        };
        let image = Box::new(GeminiImage::new(&config));

        Self::assemble(chat, image, speech_input, speech_output)
    }

    /// Compose an orchestrator from explicit collaborators.
    ///
    /// `chat = None` models the degraded no-session state.
    pub fn with_services(
        chat: Option<Box<dyn ChatService>>,
        image: Box<dyn ImageService>,
        speech_input: SpeechInput,
        speech_output: SpeechOutput,
    ) -> Self {
        Self::assemble(chat, image, speech_input, speech_output)
    }

    fn assemble(
        chat: Option<Box<dyn ChatService>>,
        image: Box<dyn ImageService>,
        speech_input: SpeechInput,
        speech_output: SpeechOutput,
    ) -> Self {
        let mut log = ConversationLog::new();
        if chat.is_none() {
            log.append(Message::assistant_text(
                ErrorKind::Configuration.user_message(),
            ));
        }

        Self {
            chat,
            image,
            log,
            draft: String::new(),
            phase: Phase::Idle,
            speech_input,
            speech_output,
            online: Box::new(|| true),
        }
    }

    /// Replace the connectivity probe consulted during failure classification
    pub fn with_online_probe(mut self, probe: impl Fn() -> bool + Send + 'static) -> Self {
        self.online = Box::new(probe);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Whether a submit would currently be accepted
    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Idle && self.chat.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.speech_input.is_listening()
    }

    pub fn speech_input_available(&self) -> bool {
        self.speech_input.is_available()
    }

    pub fn tts_enabled(&self) -> bool {
        self.speech_output.is_enabled()
    }

    pub fn set_tts_enabled(&mut self, enabled: bool) {
        self.speech_output.set_enabled(enabled);
    }

    /// Begin speech capture: clears the draft and silences playback
    pub fn start_listening(&mut self) -> crate::Result<()> {
        self.draft.clear();
        self.speech_output.cancel();
        self.speech_input.start()
    }

    /// Request capture to end; the idle transition arrives via [`Self::poll_speech`]
    pub fn stop_listening(&mut self) {
        self.speech_input.stop();
    }

    /// Reconcile pending recognizer events into the draft input.
    ///
    /// Returns true when anything changed (draft text or listening state).
    pub fn poll_speech(&mut self) -> bool {
        let events = self.speech_input.poll();
        let changed = !events.is_empty();

        for event in events {
            match event {
                SpeechInputEvent::TranscriptChanged(transcript) => {
                    self.draft = transcript;
                }
                SpeechInputEvent::Stopped => {
                    debug!("Capture ended");
                }
            }
        }

        changed
    }

    /// Run one complete turn: append the user message, await the reply,
    /// route it, and append exactly one assistant message.
    ///
    /// Rejected as a defensive no-op (no observable effect on the log or
    /// phase) when a turn is already in flight, the text is blank, or no
    /// session exists.
    pub async fn submit(&mut self, text: &str) {
        if self.phase != Phase::Idle {
            warn!(phase = ?self.phase, "submit rejected: turn already in flight");
            return;
        }
        if text.trim().is_empty() {
            debug!("submit rejected: blank input");
            return;
        }
        if self.chat.is_none() {
            warn!("submit rejected: no session");
            return;
        }

        if self.speech_input.is_listening() {
            self.speech_input.stop();
        }
        self.speech_output.cancel();

        self.log.append(Message::user_text(text));
        self.draft.clear();
        self.phase = Phase::AwaitingReply;
        info!(chars = text.len(), "Turn dispatched");

        let reply = match self.chat.as_mut() {
            Some(chat) => chat.send_turn(text).await,
            None => {
                self.phase = Phase::Idle;
                return;
            }
        };

        match reply {
            Ok(raw) => self.route_reply(&raw).await,
            Err(failure) => {
                self.phase = Phase::Failed;
                self.append_failure(&failure.message, TURN_APOLOGY);
                self.phase = Phase::Idle;
            }
        }
    }

    /// Directive check runs before segmentation: a reply that is entirely an
    /// image directive never reaches the fence parser.
    async fn route_reply(&mut self, raw: &str) {
        match classify_reply(raw) {
            ReplyKind::ImageDirective(prompt) => {
                self.phase = Phase::GeneratingImage;
                info!("Image directive detected");

                match self.image.generate(&prompt).await {
                    Ok(image) => {
                        self.append_assistant(vec![MessagePart::image(
                            image.to_data_uri(),
                            prompt,
                        )]);
                    }
                    Err(failure) => {
                        self.phase = Phase::Failed;
                        self.append_failure(&failure.message, IMAGE_APOLOGY);
                    }
                }
                self.phase = Phase::Idle;
            }
            ReplyKind::NotADirective => {
                self.append_assistant(parse_reply(raw));
                self.phase = Phase::Idle;
            }
        }
    }

    fn append_assistant(&mut self, parts: Vec<MessagePart>) {
        let message = Message::new(Role::Assistant, parts);
        self.speech_output.on_assistant_message(&message);
        self.log.append(message);
    }

    fn append_failure(&mut self, raw_message: &str, apology: &str) {
        let kind = classify(raw_message, (self.online)());
        warn!(kind = ?kind, "Turn failed: {}", raw_message);
        self.append_assistant(vec![MessagePart::text(format!(
            "{apology} {}",
            kind.user_message()
        ))]);
    }

    /// End-of-session teardown: silence playback and capture
    pub fn shutdown(&mut self) {
        self.speech_output.cancel();
        self.speech_input.stop();
        debug!("Orchestrator shut down");
    }

    #[cfg(test)]
    pub(crate) fn force_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ImageBytes, ServiceFailure};
    use crate::speech::platform::{RecognizerEvent, SpeechRecognizer, SpeechSynthesizer};
    use async_trait::async_trait;
    use crossbeam_channel::{bounded, Receiver, Sender};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct ScriptedChat {
        replies: VecDeque<Result<String, ServiceFailure>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Result<String, ServiceFailure>>) -> Self {
            Self {
                replies: replies.into(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl ChatService for ScriptedChat {
        async fn send_turn(&mut self, text: &str) -> Result<String, ServiceFailure> {
            self.calls.lock().push(text.to_string());
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(ServiceFailure::new("script exhausted")))
        }
    }

    struct ScriptedImage {
        result: Result<ImageBytes, ServiceFailure>,
    }

    impl ScriptedImage {
        fn ok() -> Self {
            Self {
                result: Ok(ImageBytes {
                    data: vec![1, 2, 3],
                    mime_type: "image/png".to_string(),
                }),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                result: Err(ServiceFailure::new(message)),
            }
        }
    }

    #[async_trait]
    impl ImageService for ScriptedImage {
        async fn generate(&self, _prompt: &str) -> Result<ImageBytes, ServiceFailure> {
            self.result.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SpeechCall {
        Speak(String),
        Cancel,
    }

    #[derive(Clone, Default)]
    struct RecordingSynthesizer {
        calls: Arc<Mutex<Vec<SpeechCall>>>,
    }

    impl SpeechSynthesizer for RecordingSynthesizer {
        fn speak(&self, text: &str) -> crate::Result<()> {
            self.calls.lock().push(SpeechCall::Speak(text.to_string()));
            Ok(())
        }

        fn cancel(&self) {
            self.calls.lock().push(SpeechCall::Cancel);
        }
    }

    struct FakeRecognizer {
        tx: Sender<RecognizerEvent>,
        rx: Receiver<RecognizerEvent>,
    }

    impl FakeRecognizer {
        fn new() -> Self {
            let (tx, rx) = bounded(16);
            Self { tx, rx }
        }
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self) -> crate::Result<()> {
            Ok(())
        }

        fn stop(&mut self) {
            let _ = self.tx.send(RecognizerEvent::End);
        }

        fn events(&self) -> Receiver<RecognizerEvent> {
            self.rx.clone()
        }
    }

    fn orchestrator(chat: ScriptedChat, image: ScriptedImage) -> Orchestrator {
        Orchestrator::with_services(
            Some(Box::new(chat)),
            Box::new(image),
            SpeechInput::unavailable(),
            SpeechOutput::new(None),
        )
    }

    #[tokio::test]
    async fn test_text_turn_appends_user_then_assistant() {
        let chat = ScriptedChat::new(vec![Ok("plain answer".to_string())]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("hello").await;

        let messages = orch.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].parts, vec![MessagePart::text("plain answer")]);
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_reply_with_fences_is_segmented() {
        let chat = ScriptedChat::new(vec![Ok("Hi ```js\nconsole.log(1)\n``` bye".to_string())]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("show me code").await;

        let parts = &orch.log().messages()[1].parts;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], MessagePart::code("console.log(1)", "js"));
    }

    #[tokio::test]
    async fn test_directive_reply_yields_single_image_part() {
        let chat = ScriptedChat::new(vec![Ok(r#"{"image_prompt": "a red fox"}"#.to_string())]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("draw a fox").await;

        let message = orch.log().last().expect("assistant message");
        assert_eq!(message.parts.len(), 1);
        match &message.parts[0] {
            MessagePart::Image { data_uri, prompt } => {
                assert!(data_uri.starts_with("data:image/png;base64,"));
                assert_eq!(prompt, "a red fox");
            }
            other => panic!("expected image part, got {other:?}"),
        }
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_directive_embedded_in_prose_stays_text() {
        let chat = ScriptedChat::new(vec![Ok(
            r#"here is some json: {"image_prompt": "x"}"#.to_string()
        )]);
        let mut orch = orchestrator(chat, ScriptedImage::failing("should not be called"));

        orch.submit("hm").await;

        let message = orch.log().last().expect("assistant message");
        assert!(message.parts.iter().all(MessagePart::is_text));
    }

    #[tokio::test]
    async fn test_image_failure_gets_image_apology() {
        let chat = ScriptedChat::new(vec![Ok(r#"{"image_prompt": "x"}"#.to_string())]);
        let mut orch = orchestrator(chat, ScriptedImage::failing("no image data received"));

        orch.submit("draw").await;

        let message = orch.log().last().expect("assistant message");
        match &message.parts[0] {
            MessagePart::Text { content } => assert!(content.starts_with(IMAGE_APOLOGY)),
            other => panic!("expected text part, got {other:?}"),
        }
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_transport_failure_gets_turn_apology() {
        let chat = ScriptedChat::new(vec![Err(ServiceFailure::new("API key not valid"))]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("hello").await;

        let messages = orch.log().messages();
        assert_eq!(messages.len(), 2);
        match &messages[1].parts[0] {
            MessagePart::Text { content } => {
                assert!(content.starts_with(TURN_APOLOGY));
                assert!(content.contains("API key"));
            }
            other => panic!("expected text part, got {other:?}"),
        }
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_offline_probe_wins_over_message_content() {
        let chat = ScriptedChat::new(vec![Err(ServiceFailure::new("API key not valid"))]);
        let mut orch = orchestrator(chat, ScriptedImage::ok()).with_online_probe(|| false);

        orch.submit("hello").await;

        let message = orch.log().last().expect("assistant message");
        match &message.parts[0] {
            MessagePart::Text { content } => {
                assert!(content.contains("offline"), "got: {content}");
            }
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejected_while_turn_in_flight() {
        let chat = ScriptedChat::new(vec![Ok("unused".to_string())]);
        let calls = chat.calls();
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.force_phase(Phase::AwaitingReply);
        orch.submit("second").await;

        assert!(orch.log().is_empty());
        assert_eq!(orch.phase(), Phase::AwaitingReply);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_blank_submit_is_noop() {
        let chat = ScriptedChat::new(vec![Ok("unused".to_string())]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("   ").await;

        assert!(orch.log().is_empty());
        assert_eq!(orch.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_no_session_preseeds_and_disables_submission() {
        let mut orch = Orchestrator::with_services(
            None,
            Box::new(ScriptedImage::ok()),
            SpeechInput::unavailable(),
            SpeechOutput::new(None),
        );

        assert_eq!(orch.log().len(), 1);
        assert!(!orch.can_submit());

        orch.submit("hello").await;
        assert_eq!(orch.log().len(), 1);
    }

    #[tokio::test]
    async fn test_assistant_turn_is_spoken_when_tts_enabled() {
        let synth = RecordingSynthesizer::default();
        let mut orch = Orchestrator::with_services(
            Some(Box::new(ScriptedChat::new(vec![Ok("spoken answer".to_string())]))),
            Box::new(ScriptedImage::ok()),
            SpeechInput::unavailable(),
            SpeechOutput::new(Some(Box::new(synth.clone()))),
        );
        orch.set_tts_enabled(true);

        orch.submit("hello").await;

        let calls = synth.calls.lock().clone();
        assert!(calls.contains(&SpeechCall::Speak("spoken answer".to_string())));
    }

    #[tokio::test]
    async fn test_submit_cancels_in_flight_speech() {
        let synth = RecordingSynthesizer::default();
        let mut orch = Orchestrator::with_services(
            Some(Box::new(ScriptedChat::new(vec![Ok("a".to_string())]))),
            Box::new(ScriptedImage::ok()),
            SpeechInput::unavailable(),
            SpeechOutput::new(Some(Box::new(synth.clone()))),
        );

        orch.submit("hello").await;

        assert_eq!(synth.calls.lock().first(), Some(&SpeechCall::Cancel));
    }

    #[tokio::test]
    async fn test_listening_flow_updates_draft() {
        let recognizer = FakeRecognizer::new();
        let tx = recognizer.tx.clone();
        let mut orch = Orchestrator::with_services(
            Some(Box::new(ScriptedChat::new(vec![]))),
            Box::new(ScriptedImage::ok()),
            SpeechInput::new(Some(Box::new(recognizer))),
            SpeechOutput::new(None),
        );

        orch.set_draft("stale draft");
        orch.start_listening().expect("start");
        assert!(orch.is_listening());
        assert_eq!(orch.draft(), "");

        tx.send(RecognizerEvent::Results(vec!["turn on ".into(), "the lights".into()]))
            .unwrap();
        assert!(orch.poll_speech());
        assert_eq!(orch.draft(), "turn on the lights");

        orch.stop_listening();
        orch.poll_speech();
        assert!(!orch.is_listening());
    }

    #[tokio::test]
    async fn test_listening_affordance_absent_without_recognizer() {
        let chat = ScriptedChat::new(vec![]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        assert!(!orch.speech_input_available());
        // Requesting capture anyway degrades to a no-op
        assert!(orch.start_listening().is_ok());
        assert!(!orch.is_listening());
        assert!(!orch.poll_speech());
    }

    #[tokio::test]
    async fn test_log_grows_by_two_per_turn_even_on_failure() {
        let chat = ScriptedChat::new(vec![
            Ok("fine".to_string()),
            Err(ServiceFailure::new("server error")),
        ]);
        let mut orch = orchestrator(chat, ScriptedImage::ok());

        orch.submit("one").await;
        assert_eq!(orch.log().len(), 2);

        orch.submit("two").await;
        assert_eq!(orch.log().len(), 4);
    }
}
