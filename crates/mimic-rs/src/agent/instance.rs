//! The persona agent: one chat session at a time around a generation backend.
//!
//! A session starts with a three-message preamble (system prompt, user
//! information, assistant intro) that is pinned and never summarized. Each
//! [`generate_response`](PersonaAgent::generate_response) call then:
//!
//! 1. appends the prompt and runs the summarization check,
//! 2. records memories for the prompt (when enabled),
//! 3. generates a reply from the full history and trims any hung sentence,
//! 4. appends the reply and runs the summarization check again,
//! 5. records memories for the reply.
//!
//! Summarization and memory failures are reported through the event handler
//! and never fail a turn. Generation failures do.

use crate::agent::backend::{ChatGenerator, GenerationParams, SummaryBackend};
use crate::agent::config::{AgentConfig, load_preset};
use crate::agent::events::{ChatEvent, EventHandler, NoopHandler};
use crate::agent::persona::{
    LLM_INTRO, TIMESTAMP_FORMAT, UserProfile, build_user_info, load_persona,
};
use crate::chat::mirror::{JsonFileMirror, SessionInfo, chat_log_filename, generate_chat_id};
use crate::chat::session::ChatSession;
use crate::chat::tokens::{CharRatioEstimator, TokenEstimator};
use crate::chat::window::SummarizationPolicy;
use crate::error::{ConfigError, MimicError};
use crate::memory::{AnalyzerProvider, MemoryRecorder};
use crate::text::trim_after_last_punctuation;
use crate::weather::{OpenWeatherClient, WeatherProvider};
use crate::MessageRole;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// File name of the preset table inside the config directory.
pub const PRESETS_FILE: &str = "presets.json";

struct ActiveSession {
    chat: ChatSession,
    params: GenerationParams,
    memory: Option<MemoryRecorder>,
    chat_id: String,
    log_path: PathBuf,
}

pub struct PersonaAgent {
    config: AgentConfig,
    config_dir: PathBuf,
    persona_root: PathBuf,
    chat_log_dir: PathBuf,
    generator: Arc<dyn ChatGenerator>,
    summarizer: Arc<dyn SummaryBackend>,
    analyzers: Option<Arc<dyn AnalyzerProvider>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    estimator: Arc<dyn TokenEstimator>,
    policy: SummarizationPolicy,
    events: Arc<dyn EventHandler>,
    active: Option<ActiveSession>,
}

impl PersonaAgent {
    /// Start building an agent.
    ///
    /// `config_dir` holds `presets.json`, `persona_root` holds one directory
    /// per persona, and chat logs are written to `chat_log_dir`.
    pub fn builder(
        config: AgentConfig,
        config_dir: impl Into<PathBuf>,
        persona_root: impl Into<PathBuf>,
        chat_log_dir: impl Into<PathBuf>,
    ) -> PersonaAgentBuilder {
        PersonaAgentBuilder {
            config,
            config_dir: config_dir.into(),
            persona_root: persona_root.into(),
            chat_log_dir: chat_log_dir.into(),
            generator: None,
            summarizer: None,
            analyzers: None,
            weather: None,
            estimator: None,
            policy: SummarizationPolicy::default(),
            events: None,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active chat session, if any.
    pub fn session(&self) -> Option<&ChatSession> {
        self.active.as_ref().map(|a| &a.chat)
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.chat_id.as_str())
    }

    /// Path of the active session's chat log.
    pub fn log_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.log_path.as_path())
    }

    /// Start a session for `profile` with the generation preset `preset_name`.
    pub async fn start(&mut self, profile: UserProfile, preset_name: &str) -> Result<(), MimicError> {
        if self.active.is_some() {
            return Err(MimicError::SessionActive);
        }
        let started = Instant::now();

        let preset = load_preset(self.config_dir.join(PRESETS_FILE), preset_name)?;
        let persona = load_persona(&self.persona_root, &self.config.persona_name)?;
        let system_message = format!("{persona} {}", preset.system_message);

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let weather = match (&self.weather, self.config.get_weather) {
            (Some(provider), true) => Some(
                provider
                    .current(self.config.weather_lat, self.config.weather_lon)
                    .await,
            ),
            _ => None,
        };
        let user_info = build_user_info(&profile, &timestamp, weather.as_ref());

        let chat_id = generate_chat_id();
        let log_path = self.chat_log_dir.join(chat_log_filename(&timestamp, &chat_id));
        let mirror = JsonFileMirror::create(
            &log_path,
            SessionInfo {
                id: chat_id.clone(),
                date_time: timestamp.clone(),
                user_data: profile.to_value(),
            },
        )
        .map_err(MimicError::ChatLog)?;
        self.events.on_event(&ChatEvent::SessionStarted {
            chat_id: &chat_id,
            log_path: &log_path,
        });

        let mut chat = ChatSession::new(
            self.policy.clone(),
            Box::new(mirror),
            self.estimator.clone(),
            self.summarizer.clone(),
            self.events.clone(),
        );
        chat.append_message(MessageRole::System, system_message);
        chat.append_message(MessageRole::User, user_info);
        chat.append_message(MessageRole::Assistant, LLM_INTRO);
        chat.pin_prefix();

        let memory = match (&self.analyzers, self.config.use_memory) {
            (Some(analyzers), true) => Some(MemoryRecorder::new(
                &self.persona_root.join(&self.config.persona_name),
                analyzers.clone(),
                self.events.clone(),
            )),
            (None, true) => {
                warn!("Memory is enabled but no analyzers are configured; skipping memory");
                None
            }
            _ => None,
        };

        self.active = Some(ActiveSession {
            chat,
            params: preset.params,
            memory,
            chat_id,
            log_path,
        });
        self.events.on_event(&ChatEvent::AgentReady {
            elapsed: started.elapsed(),
        });
        info!(
            "Session started for a {} {} named {}, born {}.",
            profile.race, profile.sex, profile.name, profile.birthday
        );
        Ok(())
    }

    /// Run one turn: record the prompt, generate a reply, record the reply.
    pub async fn generate_response(&mut self, prompt: &str) -> Result<String, MimicError> {
        let active = self.active.as_mut().ok_or(MimicError::NoSession)?;
        let started = Instant::now();

        active.chat.record(MessageRole::User, prompt).await;
        if let Some(memory) = &active.memory {
            memory.check_for_memories(MessageRole::User, prompt).await;
        }

        self.events.on_event(&ChatEvent::GenerationStarted {
            messages: active.chat.len(),
        });
        let reply = self
            .generator
            .generate(active.chat.messages(), &active.params)
            .await
            .map_err(MimicError::Generation)?;
        let trimmed = trim_after_last_punctuation(&reply).to_string();

        active.chat.record(MessageRole::Assistant, trimmed.clone()).await;
        if let Some(memory) = &active.memory {
            memory.check_for_memories(MessageRole::Assistant, &trimmed).await;
        }

        self.events.on_event(&ChatEvent::GenerationCompleted {
            chars: trimmed.chars().count(),
            elapsed: started.elapsed(),
        });
        Ok(trimmed)
    }

    /// Close the active session.
    pub fn end(&mut self) -> Result<(), MimicError> {
        let session = self.active.take().ok_or(MimicError::NoSession)?;
        info!("Session {} ended after {} messages", session.chat_id, session.chat.len());
        Ok(())
    }
}

// ── Builder ────────────────────────────────────────────────────────

pub struct PersonaAgentBuilder {
    config: AgentConfig,
    config_dir: PathBuf,
    persona_root: PathBuf,
    chat_log_dir: PathBuf,
    generator: Option<Arc<dyn ChatGenerator>>,
    summarizer: Option<Arc<dyn SummaryBackend>>,
    analyzers: Option<Arc<dyn AnalyzerProvider>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    estimator: Option<Arc<dyn TokenEstimator>>,
    policy: SummarizationPolicy,
    events: Option<Arc<dyn EventHandler>>,
}

impl PersonaAgentBuilder {
    pub fn generator(mut self, generator: Arc<dyn ChatGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn SummaryBackend>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Analyzers for the memory recorder. Only used when `use_memory` is on.
    pub fn analyzers(mut self, analyzers: Arc<dyn AnalyzerProvider>) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    /// Weather source. Defaults to OpenWeather when `get_weather` is on and
    /// an API key is configured.
    pub fn weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Token estimator for candidate selection. Default: 3.5 chars per token.
    pub fn estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn policy(mut self, policy: SummarizationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn event_handler(mut self, events: Arc<dyn EventHandler>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<PersonaAgent, MimicError> {
        let generator = self
            .generator
            .ok_or(ConfigError::MissingField("generator"))?;
        let summarizer = self
            .summarizer
            .ok_or(ConfigError::MissingField("summarizer"))?;

        let weather = match (self.weather, &self.config.weather_api_key) {
            (Some(weather), _) => Some(weather),
            (None, Some(key)) if self.config.get_weather => Some(
                Arc::new(OpenWeatherClient::new(key.clone()).map_err(MimicError::Client)?)
                    as Arc<dyn WeatherProvider>,
            ),
            (None, None) if self.config.get_weather => {
                warn!("get_weather is on but no weather_api_key is configured");
                None
            }
            _ => None,
        };

        Ok(PersonaAgent {
            config: self.config,
            config_dir: self.config_dir,
            persona_root: self.persona_root,
            chat_log_dir: self.chat_log_dir,
            generator,
            summarizer,
            analyzers: self.analyzers,
            weather,
            estimator: self
                .estimator
                .unwrap_or_else(|| Arc::new(CharRatioEstimator::default())),
            policy: self.policy,
            events: self.events.unwrap_or_else(|| Arc::new(NoopHandler)),
            active: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::backend::{BackendFuture, SummaryInput};
    use crate::agent::events::FnEventHandler;
    use crate::chat::tokens::WordCountEstimator;
    use crate::error::BackendError;
    use crate::Message;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    impl ChatGenerator for Echo {
        fn generate<'a>(
            &'a self,
            messages: &'a [Message],
            _params: &'a GenerationParams,
        ) -> BackendFuture<'a, String> {
            let n = messages.len();
            Box::pin(async move { Ok(format!("I saw {n} messages. And then I")) })
        }
    }

    struct Broken;

    impl ChatGenerator for Broken {
        fn generate<'a>(
            &'a self,
            _messages: &'a [Message],
            _params: &'a GenerationParams,
        ) -> BackendFuture<'a, String> {
            Box::pin(async { Err(BackendError::Unavailable("offline".into())) })
        }
    }

    /// Long replies that end on a full stop, so trimming keeps them whole.
    struct Chatty;

    impl ChatGenerator for Chatty {
        fn generate<'a>(
            &'a self,
            messages: &'a [Message],
            _params: &'a GenerationParams,
        ) -> BackendFuture<'a, String> {
            let n = messages.len();
            Box::pin(async move { Ok(format!("reply {n} {}.", vec!["word"; 30].join(" "))) })
        }
    }

    struct Counting(AtomicUsize);

    impl SummaryBackend for Counting {
        fn summarize_batch<'a>(
            &'a self,
            inputs: &'a [SummaryInput],
        ) -> BackendFuture<'a, Vec<Option<String>>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(vec![Some("short summary".to_string()); inputs.len()]) })
        }
    }

    struct Unused;

    impl SummaryBackend for Unused {
        fn summarize_batch<'a>(
            &'a self,
            inputs: &'a [SummaryInput],
        ) -> BackendFuture<'a, Vec<Option<String>>> {
            Box::pin(async move { Ok(vec![None; inputs.len()]) })
        }
    }

    fn fixture(dir: &Path) {
        let configs = dir.join("configs");
        std::fs::create_dir_all(&configs).unwrap();
        std::fs::write(
            configs.join(PRESETS_FILE),
            r#"{"presets": {"default": {"system_message": "Be kind.", "max_tokens": 64}}}"#,
        )
        .unwrap();
        let persona = dir.join("persona").join("generic");
        std::fs::create_dir_all(&persona).unwrap();
        std::fs::write(persona.join("generic.json"), r#"{"name": "Sam"}"#).unwrap();
    }

    fn agent(dir: &Path, generator: Arc<dyn ChatGenerator>) -> PersonaAgent {
        PersonaAgent::builder(
            AgentConfig::new("m", 0.0, 0.0),
            dir.join("configs"),
            dir.join("persona"),
            dir.join("chat_logs"),
        )
        .generator(generator)
        .summarizer(Arc::new(Unused))
        .build()
        .unwrap()
    }

    fn profile() -> UserProfile {
        use crate::agent::persona::{Race, Sex};
        UserProfile::new("John Doe", "1970-01-01", Sex::Male, Race::Caucasian)
    }

    #[tokio::test]
    async fn start_writes_pinned_preamble() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Echo));
        agent.start(profile(), "default").await.unwrap();

        let session = agent.session().unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.state().summarize_cursor, 3);
        assert_eq!(
            session.get(0).unwrap().content,
            "Persona Information: name: Sam End of persona data. Be kind."
        );
        assert!(session.get(1).unwrap().content.starts_with("User Information: "));
        assert_eq!(session.get(2).unwrap().content, LLM_INTRO);

        assert_eq!(agent.chat_id().unwrap().len(), 16);
        let log = JsonFileMirror::open(agent.log_path().unwrap()).load().unwrap();
        assert_eq!(log.messages.len(), 3);
        assert_eq!(log.session_info.user_data["name"], "John Doe");
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Echo));
        agent.start(profile(), "default").await.unwrap();
        assert!(matches!(
            agent.start(profile(), "default").await,
            Err(MimicError::SessionActive)
        ));
        agent.end().unwrap();
        assert!(!agent.is_active());
    }

    #[tokio::test]
    async fn unknown_preset_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Echo));
        let err = agent.start(profile(), "spicy").await.unwrap_err();
        assert!(matches!(err, MimicError::Config(ConfigError::UnknownPreset(_))));
        assert!(!agent.is_active());
    }

    #[tokio::test]
    async fn response_is_trimmed_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Echo));
        agent.start(profile(), "default").await.unwrap();

        let reply = agent.generate_response("Hello!").await.unwrap();
        assert_eq!(reply, "I saw 4 messages.");

        let session = agent.session().unwrap();
        assert_eq!(session.len(), 5);
        assert_eq!(session.get(3).unwrap().content, "Hello!");
        assert_eq!(session.get(4).unwrap().content, "I saw 4 messages.");
    }

    #[tokio::test]
    async fn generation_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Broken));
        agent.start(profile(), "default").await.unwrap();
        let err = agent.generate_response("Hi").await.unwrap_err();
        assert!(matches!(err, MimicError::Generation(_)));
    }

    #[tokio::test]
    async fn no_session_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent(dir.path(), Arc::new(Echo));
        assert!(matches!(
            agent.generate_response("Hi").await,
            Err(MimicError::NoSession)
        ));
        assert!(matches!(agent.end(), Err(MimicError::NoSession)));
    }

    #[test]
    fn build_requires_backends() {
        let result = PersonaAgent::builder(AgentConfig::new("m", 0.0, 0.0), "c", "p", "l").build();
        assert!(matches!(
            result,
            Err(MimicError::Config(ConfigError::MissingField("generator")))
        ));
    }

    #[tokio::test]
    async fn turns_summarize_after_the_assistant_reply() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());

        // Role of the newest message each time a pass starts.
        let last_role = Arc::new(Mutex::new(None));
        let pass_roles = Arc::new(Mutex::new(Vec::new()));
        let (role_sink, pass_sink) = (last_role.clone(), pass_roles.clone());
        let handler = FnEventHandler::new(move |event| match event {
            ChatEvent::MessageAppended { role, .. } => *role_sink.lock().unwrap() = Some(*role),
            ChatEvent::SummarizationStarted { .. } => {
                pass_sink.lock().unwrap().push(*role_sink.lock().unwrap());
            }
            _ => {}
        });

        let summarizer = Arc::new(Counting(AtomicUsize::new(0)));
        let mut agent = PersonaAgent::builder(
            AgentConfig::new("m", 0.0, 0.0),
            dir.path().join("configs"),
            dir.path().join("persona"),
            dir.path().join("chat_logs"),
        )
        .generator(Arc::new(Chatty))
        .summarizer(summarizer.clone())
        .estimator(Arc::new(WordCountEstimator))
        .policy(SummarizationPolicy::default().with_max_length(20))
        .event_handler(Arc::new(handler))
        .build()
        .unwrap();
        agent.start(profile(), "default").await.unwrap();

        let mut cursors = Vec::new();
        for turn in 0..6 {
            let prompt = format!("prompt {turn} {}", "about the lighthouse ".repeat(10));
            agent.generate_response(&prompt).await.unwrap();
            cursors.push(agent.session().unwrap().state().summarize_cursor);
        }

        assert_eq!(cursors, [3, 3, 3, 7, 7, 11]);
        assert_eq!(summarizer.0.load(Ordering::SeqCst), 2);
        assert_eq!(
            *pass_roles.lock().unwrap(),
            [Some(MessageRole::Assistant), Some(MessageRole::Assistant)]
        );

        let session = agent.session().unwrap();
        assert_eq!(session.len(), 15);
        assert_eq!(
            session.state().summarize_cursor,
            session.len() - session.policy().recent_skip
        );
        for index in 3..11 {
            assert_eq!(session.get(index).unwrap().content, "short summary");
        }
        assert!(session.get(11).unwrap().content.starts_with("prompt 4"));
        assert!(session.get(14).unwrap().content.starts_with("reply 14 word"));

        let log = JsonFileMirror::open(agent.log_path().unwrap()).load().unwrap();
        assert_eq!(log.messages.len(), session.len());
        for (record, message) in log.messages.iter().zip(session.messages()) {
            assert_eq!(&record.message, message);
        }
    }

    #[tokio::test]
    async fn back_to_back_sessions_keep_separate_logs() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let mut agent = agent(dir.path(), Arc::new(Echo));

        agent.start(profile(), "default").await.unwrap();
        agent.generate_response("first session").await.unwrap();
        let first = agent.log_path().unwrap().to_path_buf();
        agent.end().unwrap();

        agent.start(profile(), "default").await.unwrap();
        let second = agent.log_path().unwrap().to_path_buf();
        assert_ne!(first, second);

        let log = JsonFileMirror::open(&first).load().unwrap();
        assert_eq!(log.messages.len(), 5);
        assert_eq!(log.messages[3].message.content, "first session");
        assert_eq!(JsonFileMirror::open(&second).load().unwrap().messages.len(), 3);
    }
}
