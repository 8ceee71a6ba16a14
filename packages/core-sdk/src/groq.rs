//! Plant-care chat and weather alert phrasing on top of a chat backend.
//!
//! A service is `Live` when it holds a backend, `Stub` otherwise. The state is
//! fixed at construction. No operation returns an error: failures turn into
//! user-facing text.

use std::sync::Arc;

use crate::{
    config::{self, CredentialSet},
    llm::{self, ChatBackend, ChatRequest, ErrorKind, GroqClient, GROQ_MODEL},
    models::{AlertKind, WeatherData},
    telemetry,
};

pub const NOT_CONFIGURED_MESSAGE: &str = "🌱 **Groq API Not Configured**

I'm here to help with your plant care questions! However, the Groq API key is not configured.

**To enable AI chat responses:**

**For hosted deployments:**
1. Open your deployment's secrets settings
2. Add: `groq_key = \"your_groq_api_key_here\"`

**For Local Development:**
1. Create `.streamlit/secrets.toml` (or set `GROQ_API_KEY` in `.env`)
2. Add: `groq_key = \"your_groq_api_key_here\"`

**Get free Groq API key:** https://console.groq.com/

**Note:** Groq provides ultra-fast AI responses for the chatbot feature.";

pub const EMPTY_RESPONSE_MESSAGE: &str =
    "I received an empty response. Please try asking your question again.";

pub const AUTH_ERROR_MESSAGE: &str = "🔑 **Groq API Key Error**

Please check your Groq API key configuration:

**For hosted deployments:**
1. Open your deployment's secrets settings
2. Verify `groq_key` is set correctly
3. Make sure there are no extra spaces or quotes

**For Local Development:**
1. Check `.streamlit/secrets.toml` or `.env`
2. Verify the key format: `groq_key = \"gsk_...\"`

**Get a new key:** https://console.groq.com/";

pub const RATE_LIMIT_MESSAGE: &str = "⏱️ **Rate Limit Reached**: Too many requests. Please wait a moment and try again. Groq has generous free tier limits, so this should be rare.";

pub const MODEL_ERROR_MESSAGE: &str =
    "🤖 **Model Error**: The AI model is temporarily unavailable. Please try again in a moment.";

const ASK_MAX_TOKENS: u32 = 500;
const ALERT_MAX_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.7;

const ALERT_SYSTEM_PROMPT: &str =
    "You are a helpful garden assistant. Generate friendly, concise alert messages.";

/**
 * \brief Whether a service can reach the model.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stub,
    Live,
}

/**
 * \brief Chat adapter. `backend` and `model` are either both set or both absent.
 */
#[derive(Clone)]
pub struct GroqService {
    backend: Option<Arc<dyn ChatBackend>>,
    model: Option<String>,
}

impl GroqService {
    /**
     * \brief Build from a credential set. A missing key, or a client that fails
     *        to build, yields a `Stub` service.
     */
    pub fn new(credentials: &CredentialSet) -> Self {
        let api_key = credentials.groq_api_key();
        if api_key.is_empty() {
            return Self::stub();
        }
        match GroqClient::new(api_key) {
            Ok(client) => Self::with_backend(Arc::new(client), GROQ_MODEL),
            Err(err) => {
                telemetry::log_error("groq.init", &format!("client unavailable: {}", err));
                Self::stub()
            }
        }
    }

    /**
     * \brief Build from the process-wide credentials, loading them on first use.
     */
    pub fn from_config() -> Self {
        Self::new(config::credentials_or_init())
    }

    pub fn stub() -> Self {
        Self {
            backend: None,
            model: None,
        }
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>, model: &str) -> Self {
        Self {
            backend: Some(backend),
            model: Some(model.to_string()),
        }
    }

    pub fn state(&self) -> ServiceState {
        if self.backend.is_some() {
            ServiceState::Live
        } else {
            ServiceState::Stub
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn live(&self) -> Option<(&dyn ChatBackend, &str)> {
        match (&self.backend, &self.model) {
            (Some(backend), Some(model)) => Some((backend.as_ref(), model.as_str())),
            _ => None,
        }
    }

    /**
     * \brief Answer a plant-care question. Always returns non-empty text.
     * \param user_message the user's question
     * \param plant_context optional plant description; empty means general care
     */
    pub async fn answer_question(&self, user_message: &str, plant_context: &str) -> String {
        let Some((backend, model)) = self.live() else {
            return NOT_CONFIGURED_MESSAGE.to_string();
        };

        let request = ChatRequest::new(model, botanist_prompt(plant_context), user_message)
            .max_tokens(ASK_MAX_TOKENS)
            .temperature(TEMPERATURE);

        match backend.complete(&request).await {
            Ok(reply) => {
                let reply = reply.trim();
                if reply.is_empty() {
                    EMPTY_RESPONSE_MESSAGE.to_string()
                } else {
                    reply.to_string()
                }
            }
            Err(err) => {
                let error_msg = err.to_string();
                telemetry::log_error("groq.chat", &error_msg);
                error_message(&error_msg)
            }
        }
    }

    /**
     * \brief Phrase a weather alert for one plant.
     * \details Unknown kinds, stub services and failed calls all get the fixed template.
     */
    pub async fn generate_alert(
        &self,
        kind: &AlertKind,
        plant_name: &str,
        weather: &WeatherData,
    ) -> String {
        let Some((backend, model)) = self.live() else {
            return default_alert(kind, plant_name, weather);
        };
        let Some(prompt) = alert_prompt(kind, plant_name, weather) else {
            return default_alert(kind, plant_name, weather);
        };

        let request = ChatRequest::new(model, ALERT_SYSTEM_PROMPT, prompt)
            .max_tokens(ALERT_MAX_TOKENS)
            .temperature(TEMPERATURE);

        match backend.complete(&request).await {
            Ok(reply) => reply.trim().to_string(),
            Err(err) => {
                // Never surfaced to the caller, only logged.
                telemetry::log_error(
                    "groq.alert",
                    &format!("{} alert for {} fell back: {}", kind, plant_name, err),
                );
                default_alert(kind, plant_name, weather)
            }
        }
    }
}

fn botanist_prompt(plant_context: &str) -> String {
    let context = if plant_context.is_empty() {
        "General plant care"
    } else {
        plant_context
    };
    format!(
        "You are an expert botanist and plant care advisor. You help users with their gardening questions in a friendly, knowledgeable way.

Plant context: {}

Provide helpful, accurate advice. If you're unsure, say so. Always prioritize plant health and safety. Keep responses concise but informative.",
        context
    )
}

/**
 * \brief User-facing text for a failed chat call.
 */
pub fn error_message(error_text: &str) -> String {
    match llm::classify(error_text) {
        ErrorKind::Auth => AUTH_ERROR_MESSAGE.to_string(),
        ErrorKind::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
        ErrorKind::ModelUnavailable => MODEL_ERROR_MESSAGE.to_string(),
        ErrorKind::Unknown => format!(
            "⚠️ **Groq API Error**

{}

**Troubleshooting:**
1. Check your Groq API key in your secrets file or environment
2. Verify the key is active at https://console.groq.com/
3. Try again in a moment

If the issue persists, check the error message above for details.",
            error_text
        ),
    }
}

fn alert_prompt(kind: &AlertKind, plant_name: &str, weather: &WeatherData) -> Option<String> {
    let prompt = match kind {
        AlertKind::Rain => format!(
            "Generate a friendly, helpful alert message for a garden app user.

Situation: Rain is expected soon in {}.
Plant: {}
Weather: {}

Write a short, warm message (2-3 sentences) telling the user to move their outdoor plant to shelter.
Be conversational and caring, like a helpful friend.",
            weather.city_or_default(),
            plant_name,
            weather.description_or("rainy conditions"),
        ),
        AlertKind::Storm => format!(
            "Generate an urgent but calm alert message for a garden app user.

Situation: Severe weather (thunderstorm/hail) is expected in {}.
Plant: {}
Weather: {}

Write a clear, urgent message (2-3 sentences) telling the user to immediately move their outdoor plant indoors.
Be direct but not alarming.",
            weather.city_or_default(),
            plant_name,
            weather.description_or("severe conditions"),
        ),
        AlertKind::Heat => format!(
            "Generate a helpful reminder for a garden app user.

Situation: Very hot weather ({}°C) and intense sun.
Plant: {}
Location: Outdoor/Open area

Write a friendly reminder (2-3 sentences) to check if the plant needs extra water or shade.
Be helpful and caring.",
            weather.temperature_or_default(),
            plant_name,
        ),
        AlertKind::Other(_) => return None,
    };
    Some(prompt)
}

/**
 * \brief Deterministic alert text, used whenever the model is not involved.
 */
pub fn default_alert(kind: &AlertKind, plant_name: &str, weather: &WeatherData) -> String {
    match kind {
        AlertKind::Rain => format!(
            "🌧️ Rain Alert: Rain is expected in {} soon. Your {} is outdoors - consider moving it under shelter!",
            weather.city_or_default(),
            plant_name
        ),
        AlertKind::Storm => format!(
            "⚠️ Storm Alert: Severe weather is approaching {}. Please move your {} indoors immediately!",
            weather.city_or_default(),
            plant_name
        ),
        AlertKind::Heat => format!(
            "☀️ Heat Alert: It's very hot ({}°C) and sunny. Your {} may need extra water or shade. Check the soil moisture!",
            weather.temperature_or_default(),
            plant_name
        ),
        AlertKind::Other(_) => format!("Alert for {}: Please check your plant.", plant_name),
    }
}
