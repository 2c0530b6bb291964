//! Intent router.
//!
//! Turns one utterance into a `CommandResponse`. Every non-empty command is
//! counted in the frequency store first, then matched against the rule
//! table. Matched rules answer locally (or through the weather provider);
//! everything else goes to the fallback classifier. Nothing here returns an
//! error to the caller: collaborator failures become apology text.

use crate::apps::{AppRegistry, AppTarget};
use crate::clock::{format_date, format_time, Clock, SystemClock};
use crate::config::Config;
use crate::fallback::FallbackClassifier;
use crate::intents::{Intent, IntentMatcher};
use crate::llm_client::LlmClient;
use crate::store::{FrequencyStore, NO_COMMANDS_YET};
use crate::weather::{OpenWeatherClient, WeatherProvider};
use anyhow::Result;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use voxa_shared::{Action, CommandResponse};

/// Reply to blank input
pub const DID_NOT_CATCH: &str = "I didn't catch that. Could you say it again?";

/// Reply when the fallback model fails for any reason
pub const FALLBACK_APOLOGY: &str = "Sorry, I had trouble understanding that. Can you try rephrasing?";

pub const WEATHER_TIMEOUT_APOLOGY: &str = "Sorry, the weather service took too long to respond.";

pub const WEATHER_PROMPT: &str = "Sure, which city's weather are you interested in?";

pub const DEFAULT_WEATHER_TIMEOUT: Duration = Duration::from_secs(8);

const YOUTUBE_URL: &str = "https://www.youtube.com";

const JOKES: [&str; 3] = [
    "Why don't skeletons fight each other? Because they don't have the guts!",
    "Why did the computer catch a cold? Because it left its Windows open!",
    "Why don't some couples go to the gym? Because some relationships don't work out!",
];

pub struct IntentRouter {
    matcher: IntentMatcher,
    apps: AppRegistry,
    store: Arc<dyn FrequencyStore>,
    weather: Arc<dyn WeatherProvider>,
    fallback: FallbackClassifier,
    clock: Arc<dyn Clock>,
    weather_timeout: Duration,
}

impl IntentRouter {
    pub fn new(
        store: Arc<dyn FrequencyStore>,
        weather: Arc<dyn WeatherProvider>,
        fallback: FallbackClassifier,
    ) -> Self {
        Self {
            matcher: IntentMatcher::default(),
            apps: AppRegistry::builtin(),
            store,
            weather,
            fallback,
            clock: Arc::new(SystemClock),
            weather_timeout: DEFAULT_WEATHER_TIMEOUT,
        }
    }

    /// Wire up the HTTP collaborators described by `config`
    pub fn from_config(config: &Config, store: Arc<dyn FrequencyStore>) -> Result<Self> {
        let weather = OpenWeatherClient::new(
            config.weather.api_url.clone(),
            config.weather.api_key.clone(),
            config.weather.timeout(),
        );
        if !weather.is_configured() {
            warn!("No weather API key configured, weather lookups will apologise");
        }

        let llm = LlmClient::new(
            &config.llm.api_url,
            &config.llm.model,
            config.llm.api_key.clone(),
            config.llm.timeout(),
        );
        info!("Fallback model: {} ({:?})", llm.model(), llm.api_format());

        let mut fallback = FallbackClassifier::new(Arc::new(llm)).with_timeout(config.llm.timeout());
        if let Some(template) = config.llm.load_template()? {
            fallback = fallback.with_template(template);
        }

        let apps = AppRegistry::builtin().with_entries(config.apps.clone());

        Ok(Self::new(store, Arc::new(weather), fallback)
            .with_apps(apps)
            .with_matcher(IntentMatcher::new(config.router.transport_max_len))
            .with_weather_timeout(config.weather.timeout()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_apps(mut self, apps: AppRegistry) -> Self {
        self.apps = apps;
        self
    }

    pub fn with_matcher(mut self, matcher: IntentMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_weather_timeout(mut self, weather_timeout: Duration) -> Self {
        self.weather_timeout = weather_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn FrequencyStore> {
        &self.store
    }

    /// Classify and answer a single command
    pub async fn classify(&self, command: &str) -> CommandResponse {
        if command.trim().is_empty() {
            return CommandResponse::spoken(DID_NOT_CATCH);
        }

        self.record(command).await;

        match self.matcher.match_intent(command) {
            Some(intent) => {
                info!("Matched {} {:?}", intent.kind(), intent.params());
                self.respond(intent).await
            }
            None => {
                info!("No rule matched, asking fallback model");
                self.interpret(command).await
            }
        }
    }

    /// Build the reply for a matched rule
    pub async fn respond(&self, intent: Intent) -> CommandResponse {
        match intent {
            Intent::Greeting => CommandResponse::spoken("Hello! How can I assist you today?"),
            Intent::Time => CommandResponse::spoken(format!(
                "The current time is {}.",
                format_time(&self.clock.now())
            )),
            Intent::Date => CommandResponse::spoken(format!(
                "Today's date is {}.",
                format_date(&self.clock.now())
            )),
            Intent::OpenYoutube => CommandResponse::spoken("Opening YouTube.").with_action(Action::OpenUrl {
                url: YOUTUBE_URL.to_string(),
            }),
            Intent::PlayMusic => CommandResponse::spoken(
                "Playing music. Desktop player control is not available yet.",
            ),
            Intent::Power(action) => CommandResponse::spoken(format!(
                "Simulating system {}. This action is not performed by the assistant.",
                action.as_str()
            )),
            Intent::SystemStatus => CommandResponse::spoken(
                "System status checks for CPU and memory are not available yet.",
            ),
            Intent::Joke => CommandResponse::spoken(self.pick_joke()),
            Intent::MediaControl { verb } => CommandResponse::spoken(format!(
                "Simulating {} media. Desktop player control is not available yet.",
                verb
            )),
            Intent::Preferences => {
                let store = self.store.clone();
                let most_used = tokio::task::spawn_blocking(move || store.most_frequent())
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Store task failed: {}", e);
                        None
                    })
                    .map(|(command, _)| command)
                    .unwrap_or_else(|| NO_COMMANDS_YET.to_string());
                CommandResponse::spoken(format!("Your most used command is: {}", most_used))
            }
            Intent::OpenApp { name } => self.open_app(&name).await,
            Intent::Weather { city } => self.weather(&city).await,
            Intent::WeatherPrompt => CommandResponse::spoken(WEATHER_PROMPT),
            Intent::Wikipedia { query } => {
                search_response("Wikipedia", &query, wikipedia_url(&query))
            }
            Intent::WebSearch { query } => {
                search_response("Google", &query, google_search_url(&query))
            }
        }
    }

    /// Up to `limit` of the user's most frequent commands
    pub async fn suggestions(&self, limit: usize) -> Vec<String> {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.top(limit)).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Store task failed: {}", e);
                Vec::new()
            }
        }
    }

    // The JSON store does file IO, keep it off the async workers
    async fn record(&self, command: &str) {
        let store = self.store.clone();
        let command = command.to_string();
        match tokio::task::spawn_blocking(move || store.record(&command)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Could not record command: {}", e),
            Err(e) => warn!("Store task failed: {}", e),
        }
    }

    /// Short confirmation summary. Falls back to the command itself.
    pub async fn summarize(&self, command: &str) -> String {
        if command.trim().is_empty() {
            return command.to_string();
        }
        match self.fallback.summarize(command).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary unavailable: {}", e);
                command.to_string()
            }
        }
    }

    async fn interpret(&self, prompt: &str) -> CommandResponse {
        match self.fallback.interpret(prompt).await {
            Ok(reply) => CommandResponse::spoken(reply),
            Err(e) => {
                warn!("Fallback failed: {}", e);
                CommandResponse::spoken(FALLBACK_APOLOGY)
            }
        }
    }

    async fn open_app(&self, requested: &str) -> CommandResponse {
        let Some(app) = self.apps.resolve(requested) else {
            info!("Unknown application {:?}, asking fallback model", requested);
            let prompt = format!(
                "open {} (no installed application is called \"{}\"; ask which application they mean)",
                requested, requested
            );
            return self.interpret(&prompt).await;
        };

        info!("Resolved {:?} to {} (score {:.2})", requested, app.name, app.score);
        match app.target {
            AppTarget::Web { url } => CommandResponse::spoken(format!("Opening {}.", app.name))
                .with_action(Action::OpenUrl { url: url.clone() }),
            AppTarget::Local { .. } => CommandResponse::spoken(format!(
                "Opening {} is left to your desktop client.",
                app.name
            ))
            .with_action(Action::ExecuteLocal {
                description: format!("open {}", app.name),
            }),
        }
    }

    async fn weather(&self, city: &str) -> CommandResponse {
        match timeout(self.weather_timeout, self.weather.current(city)).await {
            Ok(Ok(report)) => CommandResponse::spoken(report.summary()),
            Ok(Err(e)) => {
                warn!("Weather lookup for {} failed: {}", city, e);
                CommandResponse::spoken(e.apology(city))
            }
            Err(_) => {
                warn!("Weather lookup for {} timed out after {:?}", city, self.weather_timeout);
                CommandResponse::spoken(WEATHER_TIMEOUT_APOLOGY)
            }
        }
    }

    fn pick_joke(&self) -> &'static str {
        let index = self.clock.now().timestamp().rem_euclid(JOKES.len() as i64) as usize;
        JOKES[index]
    }
}

fn search_response(site: &str, query: &str, url: Option<Url>) -> CommandResponse {
    let response = CommandResponse::spoken(format!("Searching {} for \"{}\".", site, query));
    match url {
        Some(url) => response.with_action(Action::OpenUrl { url: url.into() }),
        None => response,
    }
}

/// Article URL with the query as a single percent-encoded path segment
pub fn wikipedia_url(query: &str) -> Option<Url> {
    let mut url = Url::parse("https://en.wikipedia.org/wiki/").ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(query);
    Some(url)
}

/// Search URL with the query form-encoded
pub fn google_search_url(query: &str) -> Option<Url> {
    Url::parse_with_params("https://www.google.com/search", &[("q", query)]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::fallback::TextCompletion;
    use crate::store::MemoryFrequencyStore;
    use crate::weather::{WeatherError, WeatherReport};
    use async_trait::async_trait;

    struct NoWeather;

    #[async_trait]
    impl WeatherProvider for NoWeather {
        async fn current(&self, _city: &str) -> Result<WeatherReport, WeatherError> {
            Err(WeatherError::NotConfigured)
        }
    }

    struct Echo;

    #[async_trait]
    impl TextCompletion for Echo {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            let command = prompt.rsplit("User Command: ").next().unwrap_or_default();
            Ok(serde_json::json!({ "interpretedCommand": format!("echo: {}", command) }).to_string())
        }
    }

    fn router() -> IntentRouter {
        IntentRouter::new(
            Arc::new(MemoryFrequencyStore::new()),
            Arc::new(NoWeather),
            FallbackClassifier::new(Arc::new(Echo)),
        )
        .with_clock(Arc::new(FixedClock::at_local(2024, 3, 9, 15, 4, 5).unwrap()))
    }

    #[test]
    fn test_wikipedia_url_encoding() {
        assert_eq!(
            wikipedia_url("Alan Turing").unwrap().as_str(),
            "https://en.wikipedia.org/wiki/Alan%20Turing"
        );
        assert_eq!(
            wikipedia_url("AC/DC").unwrap().as_str(),
            "https://en.wikipedia.org/wiki/AC%2FDC"
        );
    }

    #[test]
    fn test_google_url_encoding() {
        assert_eq!(
            google_search_url("rust & tokio").unwrap().as_str(),
            "https://www.google.com/search?q=rust+%26+tokio"
        );
    }

    #[tokio::test]
    async fn test_blank_input_is_not_recorded() {
        let router = router();
        let response = router.classify("   ").await;
        assert_eq!(response.text, DID_NOT_CATCH);
        assert!(router.store().counts().is_empty());
    }

    #[tokio::test]
    async fn test_time_and_date_use_clock() {
        let router = router();
        assert_eq!(router.classify("what time is it").await.text, "The current time is 3:04:05 PM.");
        assert_eq!(
            router.classify("what's the date").await.text,
            "Today's date is Saturday, March 9, 2024."
        );
    }

    #[tokio::test]
    async fn test_joke_is_one_of_the_three() {
        let text = router().classify("tell me a joke").await.text;
        assert!(JOKES.contains(&text.as_str()));
    }

    #[tokio::test]
    async fn test_web_app_opens_url() {
        let response = router().classify("open gmail").await;
        assert_eq!(
            response.action,
            Some(Action::OpenUrl {
                url: "https://mail.google.com".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_fallback_reply_is_spoken() {
        let response = router().classify("who wrote war and peace").await;
        assert_eq!(response.text, "echo: who wrote war and peace");
        assert!(response.vocalize);
        assert!(response.action.is_none());
    }

    #[tokio::test]
    async fn test_weather_not_configured() {
        let response = router().classify("weather in Paris").await;
        assert_eq!(response.text, "Sorry, weather lookups are not configured right now.");
    }
}
