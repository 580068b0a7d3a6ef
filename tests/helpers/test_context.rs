//! Test context for unified test setup
//!
//! This module provides a test context that wires a full `ServiceFactory`
//! against the mock server, with recorded navigation, notifications and
//! scripted confirmation answers.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use EventHub::config::Settings;
use EventHub::models::User;
use EventHub::services::{
    ConfirmationPrompt, Confirmer, HistoryNavigator, HttpPaymentGateway, MemorySink, Navigator, Route,
    ServiceFactory,
};

use super::api_mock::ApiMockServer;

/// Answers prompts from a script, then falls back to a default
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    prompts: Mutex<Vec<ConfirmationPrompt>>,
}

impl ScriptedConfirmer {
    pub fn always(answer: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer: answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<ConfirmationPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answers.lock().unwrap().pop_front().unwrap_or(self.default_answer)
    }
}

/// Configuration for test context
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub confirm: bool,
    pub max_retries: usize,
    pub api_timeout_seconds: u64,
    pub token: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            confirm: true,
            max_retries: 2,
            api_timeout_seconds: 5,
            token: None,
        }
    }
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub mock: ApiMockServer,
    pub settings: Settings,
    pub navigator: HistoryNavigator,
    pub confirmer: Arc<ScriptedConfirmer>,
    pub sink: MemorySink,
    pub services: ServiceFactory,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::new_with_config(TestConfig::default()).await
    }

    pub async fn new_with_config(config: TestConfig) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mock = ApiMockServer::new().await;
        let settings = Self::create_test_settings(&mock, &config);

        let navigator = HistoryNavigator::starting_at(Route::Events);
        let confirmer = Arc::new(ScriptedConfirmer::always(config.confirm));
        let sink = MemorySink::new();
        let gateway = HttpPaymentGateway::shared(&settings.payments).expect("gateway client");

        let services = ServiceFactory::with_gateway(
            settings.clone(),
            Arc::new(navigator.clone()),
            confirmer.clone(),
            Arc::new(sink.clone()),
            gateway,
        )
        .expect("service factory");

        Self {
            mock,
            settings,
            navigator,
            confirmer,
            sink,
            services,
        }
    }

    fn create_test_settings(mock: &ApiMockServer, config: &TestConfig) -> Settings {
        let mut settings = Settings::default();
        settings.api.base_url = mock.api_url();
        settings.api.timeout_seconds = config.api_timeout_seconds;
        settings.payments.gateway_url = mock.gateway_url();
        settings.payments.publishable_key = "pk_test_123".to_string();
        settings.session.token = config.token.clone();
        settings.retry.max_retries = config.max_retries;
        settings.retry.initial_delay_ms = 1;
        settings.retry.max_delay_ms = 5;
        settings.retry.jitter = false;
        settings
    }

    /// Start a session for `user` with an opaque token
    pub fn sign_in_as(&self, user: &User) {
        self.services.session.sign_in("test-token").expect("sign in");
        self.services.session.set_user(user.clone());
    }

    pub fn current_route(&self) -> Option<Route> {
        self.navigator.current()
    }
}
