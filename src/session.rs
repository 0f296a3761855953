//! Turn orchestration: one user submission in, one assistant reply out.
//!
//! A session owns the conversation log and the document context slot. At most
//! one turn is in flight at a time; uploads may overlap with a turn and only
//! affect the next one.

use crate::doc_processor::{DocumentExtractor, ExtractError};
use crate::llm::{Fallback, Reply, ReplyGenerator};
use crate::store::models::{DocumentContext, Message, Sender};
use crate::store::{ContextStore, ConversationStore};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Separator between the typed text and the injected document context.
const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Blank input; nothing changed.
    Ignored,
    /// Another turn is still in flight; nothing changed.
    Busy,
    Replied { user: Message, reply: Message },
}

/// Outbound text for a turn: the typed text, the separator, then the context.
/// The separator is sent even when no document is loaded.
pub fn augment(text: &str, context: &str) -> String {
    format!("{}{}{}", text, CONTEXT_SEPARATOR, context)
}

/// Clears the `sending` flag once the turn task finishes.
struct SendingGuard(Arc<ChatSession>);

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.0.sending.store(false, Ordering::Release);
    }
}

pub struct ChatSession {
    conversation: ConversationStore,
    context: ContextStore,
    extractor: DocumentExtractor,
    generator: Arc<dyn ReplyGenerator>,
    sending: AtomicBool,
}

impl ChatSession {
    pub fn new(generator: Arc<dyn ReplyGenerator>, extractor: DocumentExtractor) -> Self {
        Self {
            conversation: ConversationStore::new(),
            context: ContextStore::new(),
            extractor,
            generator,
            sending: AtomicBool::new(false),
        }
    }

    fn try_begin(self: &Arc<Self>) -> Option<SendingGuard> {
        self.sending
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SendingGuard(Arc::clone(self)))
    }

    /// Run one turn. The generation call and the reply append happen on a
    /// spawned task, so dropping the returned future does not abandon the turn.
    pub async fn submit(self: &Arc<Self>, text: &str) -> SubmitOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::Ignored;
        }
        let Some(guard) = self.try_begin() else {
            debug!("submit rejected: a turn is already in flight");
            return SubmitOutcome::Busy;
        };

        let user = self.conversation.append(Sender::User, trimmed);
        let context = self.context.get();
        let augmented = augment(trimmed, &context);
        let history = self.conversation.snapshot();
        info!(
            message_id = user.id,
            history = history.len(),
            context_chars = context.len(),
            "sending turn"
        );

        let session = Arc::clone(self);
        let user_id = user.id;
        let turn = tokio::spawn(async move {
            // Released only after the reply is appended.
            let _guard = guard;
            let generator = Arc::clone(&session.generator);
            let call =
                tokio::spawn(async move { generator.request_reply(&history, &augmented).await });
            let result = call.await.unwrap_or_else(|e| {
                error!(message_id = user_id, error = %e, "reply task failed");
                Reply::Fallback(Fallback::TransportFailure)
            });
            if result.is_fallback() {
                warn!(message_id = user_id, "turn answered with fallback text");
            }
            let reply = session.conversation.append(Sender::Assistant, result.text());
            info!(message_id = reply.id, chars = reply.content.len(), "turn complete");
            reply
        });

        match turn.await {
            Ok(reply) => SubmitOutcome::Replied { user, reply },
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Extract `bytes` and make the result the active context. On failure the
    /// previous context stays active.
    pub async fn upload_document(
        &self,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> Result<DocumentContext, ExtractError> {
        match self.extractor.extract_blocking(bytes, file_name).await {
            Ok(ctx) => {
                self.context.set(ctx.clone());
                Ok(ctx)
            }
            Err(e) => {
                warn!(error = %e, "document upload failed");
                Err(e)
            }
        }
    }

    pub fn remove_document(&self) {
        self.context.clear();
        debug!("document context cleared");
    }

    pub fn messages(&self) -> Vec<Message> {
        self.conversation.snapshot()
    }

    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    pub fn document(&self) -> DocumentContext {
        self.context.snapshot()
    }
}
