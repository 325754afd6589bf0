use tracing::{debug, info};

use baymax_core::prompt::{assemble, chat_directive, GroundedPrompt};
use baymax_core::traits::{TextGenerator, VectorIndex};
use baymax_core::{Error, Result};

use crate::api::{AskRequest, AskResponse, ChatResponse};
use crate::retriever::Retriever;

/// The query service: grounded answers via `ask`, plain conversation via `chat`.
pub struct Assistant<V: VectorIndex> {
    retriever: Retriever<V>,
    generator: Box<dyn TextGenerator>,
    top_k: usize,
}

impl<V: VectorIndex> Assistant<V> {
    pub fn new(retriever: Retriever<V>, generator: Box<dyn TextGenerator>, top_k: usize) -> Self {
        Self { retriever, generator, top_k: top_k.max(1) }
    }

    pub fn retriever(&self) -> &Retriever<V> {
        &self.retriever
    }

    /// Retrieves context for `question` and assembles the grounded prompt
    /// without calling the generator.
    pub async fn prepare(&self, question: &str) -> Result<GroundedPrompt> {
        let question = non_empty(question)?;
        let retrieved = self.retriever.retrieve(question, self.top_k).await?;
        if retrieved.is_empty() {
            info!("No context retrieved; answering from the directive alone");
        }
        Ok(assemble(question, retrieved.passages(), retrieved.attributions()))
    }

    pub async fn ask(&self, question: &str) -> Result<AskResponse> {
        let prompt = self.prepare(question).await?;
        debug!("Grounded prompt: {} context chars, sources={:?}", prompt.context.len(), prompt.sources);
        let answer = self.generator.complete(&prompt.render(), None).await?;
        Ok(AskResponse { answer, sources: prompt.sources })
    }

    pub async fn handle(&self, request: &AskRequest) -> Result<AskResponse> {
        self.ask(&request.question).await
    }

    /// Ungrounded: the directive as system prompt, the message as user turn.
    pub async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let message = non_empty(message)?;
        let text = self.generator.complete(chat_directive(), Some(message)).await?;
        Ok(ChatResponse { text })
    }
}

fn non_empty(input: &str) -> Result<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyQuestion);
    }
    Ok(trimmed)
}
