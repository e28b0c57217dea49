//! Telegram message handler
//!
//! Every update runs in its own task: access check, `/start`, typing
//! indicator, then one agent turn bounded by the turn deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use vayuu_ai::{AgentExecutor, ChatTransport, TurnContext};

use crate::channel::IncomingMessage;

pub const WELCOME_MESSAGE: &str = "Hi! I'm Vayuu, your AI assistant. How can I help you today?";
pub const ERROR_REPLY: &str = "Sorry, I encountered an error processing your request.";

pub struct BotHandler {
    agent: Arc<AgentExecutor>,
    transport: Arc<dyn ChatTransport>,
    allowed_username: String,
    turn_timeout: Duration,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl BotHandler {
    pub fn new(
        agent: Arc<AgentExecutor>,
        transport: Arc<dyn ChatTransport>,
        allowed_username: &str,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            agent,
            transport,
            allowed_username: allowed_username.trim().trim_start_matches('@').to_string(),
            turn_timeout,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// In-flight turns are cancelled when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn is_allowed(&self, username: Option<&str>) -> bool {
        username.is_some_and(|name| {
            !self.allowed_username.is_empty()
                && name
                    .trim_start_matches('@')
                    .eq_ignore_ascii_case(&self.allowed_username)
        })
    }

    /// Handle `message` on a new task.
    pub fn dispatch(self: &Arc<Self>, message: IncomingMessage) -> JoinHandle<()> {
        let handler = Arc::clone(self);
        self.tasks.spawn(async move { handler.handle(message).await })
    }

    /// Wait for every dispatched message and the agent's background work.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.agent.drain_background().await;
    }

    pub async fn handle(&self, message: IncomingMessage) {
        let chat_id = message.chat_id;
        let username = message.username.as_deref();
        if !self.is_allowed(username) {
            warn!(chat_id, username = ?username, "Ignoring message from unauthorized user");
            return;
        }

        let Some(text) = message
            .text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        else {
            debug!(chat_id, "Ignoring message without text");
            return;
        };

        if is_start_command(text) {
            self.reply(chat_id, WELCOME_MESSAGE).await;
            return;
        }

        info!(
            chat_id,
            message_id = message.message_id,
            username = ?username,
            chars = text.chars().count(),
            "Incoming message"
        );
        if let Err(e) = self.transport.send_typing(chat_id).await {
            warn!(chat_id, error = %e, "Failed to send typing action");
        }

        let reply = match self.run_turn(chat_id, text).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!(chat_id, "Agent returned an empty answer");
                ERROR_REPLY.to_string()
            }
            Err(e) => {
                error!(chat_id, error = %e, "Agent turn failed");
                ERROR_REPLY.to_string()
            }
        };
        self.reply(chat_id, &reply).await;
    }

    /// One agent turn; the turn token is cancelled once the deadline passes
    /// and the loop is left to observe it.
    async fn run_turn(&self, chat_id: i64, text: &str) -> vayuu_ai::Result<String> {
        let cancel = self.shutdown.child_token();
        let turn = TurnContext::new(chat_id, cancel.clone());

        let respond = self.agent.respond(&turn, text);
        tokio::pin!(respond);
        tokio::select! {
            result = &mut respond => result,
            _ = tokio::time::sleep(self.turn_timeout) => {
                warn!(chat_id, timeout_secs = self.turn_timeout.as_secs(), "Turn deadline reached");
                cancel.cancel();
                respond.await
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            error!(chat_id, error = %e, "Failed to send reply");
        }
    }
}

fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    command == "/start" || command.starts_with("/start@")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vayuu_ai::{
        AgentConfig, AiError, CompletionRequest, CompletionResponse, LlmClient, ToolRegistry,
    };

    #[derive(Default)]
    struct RecordingTransport {
        texts: Mutex<Vec<(i64, String)>>,
        typing: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(&self, chat_id: i64, text: &str) -> vayuu_ai::Result<()> {
            self.texts.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }

        async fn send_file(
            &self,
            _chat_id: i64,
            _path: &Path,
            _caption: Option<&str>,
        ) -> vayuu_ai::Result<()> {
            Ok(())
        }

        async fn send_typing(&self, _chat_id: i64) -> vayuu_ai::Result<()> {
            self.typing.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    enum Behaviour {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct StubLlm {
        behaviour: Behaviour,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        fn provider(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> vayuu_ai::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(last) = request.messages.last() {
                self.inputs.lock().unwrap().push(last.content.clone());
            }
            match self.behaviour {
                Behaviour::Answer(text) => Ok(CompletionResponse::text(text)),
                Behaviour::Fail => Err(AiError::Llm("upstream unavailable".to_string())),
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    fn handler(
        llm: Arc<StubLlm>,
        transport: Arc<RecordingTransport>,
        timeout: Duration,
    ) -> Arc<BotHandler> {
        let agent = AgentExecutor::new(llm, Arc::new(ToolRegistry::new()), AgentConfig::default());
        Arc::new(BotHandler::new(Arc::new(agent), transport, "@Alex", timeout))
    }

    fn message(username: Option<&str>, text: &str) -> IncomingMessage {
        IncomingMessage {
            update_id: 1,
            chat_id: 77,
            message_id: 3,
            username: username.map(str::to_string),
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_start_command_detection() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("/start@vayuu_bot"));
        assert!(is_start_command("/start hello"));
        assert!(!is_start_command("/started"));
        assert!(!is_start_command("start"));
    }

    #[tokio::test]
    async fn test_unauthorized_user_is_ignored() {
        let llm = StubLlm::new(Behaviour::Answer("hi"));
        let transport = Arc::new(RecordingTransport::default());
        let bot = handler(llm.clone(), transport.clone(), Duration::from_secs(5));

        bot.handle(message(Some("mallory"), "hello")).await;
        bot.handle(message(None, "hello")).await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert!(transport.texts.lock().unwrap().is_empty());
        assert_eq!(transport.typing.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_sends_welcome_without_agent() {
        let llm = StubLlm::new(Behaviour::Answer("hi"));
        let transport = Arc::new(RecordingTransport::default());
        let bot = handler(llm.clone(), transport.clone(), Duration::from_secs(5));

        bot.handle(message(Some("alex"), "/start")).await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *transport.texts.lock().unwrap(),
            vec![(77, WELCOME_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_message_answered_by_agent() {
        let llm = StubLlm::new(Behaviour::Answer("Hello Alex!"));
        let transport = Arc::new(RecordingTransport::default());
        let bot = handler(llm.clone(), transport.clone(), Duration::from_secs(5));

        bot.dispatch(message(Some("ALEX"), "  hi there  "))
            .await
            .unwrap();

        assert_eq!(transport.typing.load(Ordering::SeqCst), 1);
        assert_eq!(*llm.inputs.lock().unwrap(), vec!["hi there".to_string()]);
        assert_eq!(
            *transport.texts.lock().unwrap(),
            vec![(77, "Hello Alex!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_agent_failure_sends_apology() {
        let llm = StubLlm::new(Behaviour::Fail);
        let transport = Arc::new(RecordingTransport::default());
        let bot = handler(llm, transport.clone(), Duration::from_secs(5));

        bot.handle(message(Some("alex"), "hello")).await;

        assert_eq!(
            *transport.texts.lock().unwrap(),
            vec![(77, ERROR_REPLY.to_string())]
        );
    }

    #[tokio::test]
    async fn test_deadline_cancels_turn() {
        let llm = StubLlm::new(Behaviour::Hang);
        let transport = Arc::new(RecordingTransport::default());
        let bot = handler(llm, transport.clone(), Duration::from_millis(50));

        tokio::time::timeout(
            Duration::from_secs(5),
            bot.handle(message(Some("alex"), "hello")),
        )
        .await
        .unwrap();

        assert_eq!(
            *transport.texts.lock().unwrap(),
            vec![(77, ERROR_REPLY.to_string())]
        );
        assert!(bot.agent.short_term_memory().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_turn() {
        let llm = StubLlm::new(Behaviour::Hang);
        let transport = Arc::new(RecordingTransport::default());
        let shutdown = CancellationToken::new();
        let agent = AgentExecutor::new(llm, Arc::new(ToolRegistry::new()), AgentConfig::default());
        let bot = Arc::new(
            BotHandler::new(Arc::new(agent), transport.clone(), "alex", Duration::from_secs(60))
                .with_shutdown(shutdown.clone()),
        );

        let task = bot.dispatch(message(Some("alex"), "hello"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(transport.texts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_waits_for_dispatched_turns() {
        let llm = StubLlm::new(Behaviour::Hang);
        let transport = Arc::new(RecordingTransport::default());
        let shutdown = CancellationToken::new();
        let agent = AgentExecutor::new(llm, Arc::new(ToolRegistry::new()), AgentConfig::default());
        let bot = Arc::new(
            BotHandler::new(Arc::new(agent), transport.clone(), "alex", Duration::from_secs(60))
                .with_shutdown(shutdown.clone()),
        );

        drop(bot.dispatch(message(Some("alex"), "first")));
        drop(bot.dispatch(message(Some("alex"), "second")));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), bot.drain())
            .await
            .unwrap();

        assert_eq!(
            *transport.texts.lock().unwrap(),
            vec![(77, ERROR_REPLY.to_string()), (77, ERROR_REPLY.to_string())]
        );
    }
}
