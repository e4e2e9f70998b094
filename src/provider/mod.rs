//! Model provider trait and streaming adapters.

pub mod http;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::config::EngineSettings;
use crate::error::{Result, SitewrightError};
use crate::tools::ToolDefinition;
use crate::types::{Message, StreamDelta};

/// A request for one streaming round.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// The uniform event stream every adapter produces.
pub type DeltaStream = BoxStream<'static, Result<StreamDelta>>;

/// Core trait implemented by the provider adapters.
///
/// The cancellation token is observed inside the transport byte loop so an
/// in-flight network read aborts promptly, not just between rounds.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g. "anthropic").
    fn provider_name(&self) -> &str;

    /// Stream one round as internal [`StreamDelta`] events.
    async fn stream_round(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<DeltaStream>;
}

/// Create the adapter for the configured provider.
#[allow(unused_variables)]
pub fn create_provider(settings: &EngineSettings) -> Result<Box<dyn ModelProvider>> {
    match settings.provider {
        #[cfg(feature = "anthropic")]
        crate::config::ProviderKind::Anthropic => Ok(Box::new(
            anthropic::AnthropicProvider::new(settings.api_key.clone(), None),
        )),
        #[cfg(feature = "openai")]
        crate::config::ProviderKind::OpenAi => Ok(Box::new(openai::OpenAiProvider::new(
            settings.api_key.clone(),
            None,
        ))),
        #[allow(unreachable_patterns)]
        other => Err(SitewrightError::Configuration(format!(
            "provider '{other}' not enabled via feature flags"
        ))),
    }
}
