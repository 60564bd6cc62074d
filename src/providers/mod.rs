pub mod anthropic;
pub mod gemini;
mod http;
pub mod openai;
pub mod registry;
pub mod traits;

pub use registry::{ProviderRegistry, ProviderSlot};
pub use traits::{ChatProvider, ChatRequest, ContentAdapter, ProviderId};
