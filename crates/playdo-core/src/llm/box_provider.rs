//! BoxLlmProvider -- object-safe dynamic dispatch wrapper for LlmProvider.
//!
//! 1. Define an object-safe `LlmProviderDyn` trait with boxed futures
//! 2. Blanket-impl `LlmProviderDyn` for all `T: LlmProvider`
//! 3. `BoxLlmProvider` wraps `Box<dyn LlmProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use playdo_types::llm::UpstreamError;
use playdo_types::message::Message;

use super::provider::LlmProvider;

/// Object-safe version of [`LlmProvider`] with boxed futures.
pub trait LlmProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn reply_boxed<'a>(
        &'a self,
        history: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<Message, UpstreamError>> + Send + 'a>>;
}

/// Blanket implementation: any `LlmProvider` automatically implements `LlmProviderDyn`.
impl<T: LlmProvider> LlmProviderDyn for T {
    fn name(&self) -> &str {
        LlmProvider::name(self)
    }

    fn model(&self) -> &str {
        LlmProvider::model(self)
    }

    fn reply_boxed<'a>(
        &'a self,
        history: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<Message, UpstreamError>> + Send + 'a>> {
        Box::pin(self.reply(history))
    }
}

/// Type-erased provider, chosen at startup (Anthropic, or the unconfigured
/// placeholder when no API key is present).
///
/// `BoxLlmProvider` itself implements `LlmProvider`, so services generic
/// over the trait accept it directly.
pub struct BoxLlmProvider {
    inner: Box<dyn LlmProviderDyn + Send + Sync>,
}

impl BoxLlmProvider {
    /// Wrap a concrete `LlmProvider` in a type-erased box.
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }
}

impl LlmProvider for BoxLlmProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn reply(&self, history: &[Message]) -> Result<Message, UpstreamError> {
        self.inner.reply_boxed(history).await
    }
}
