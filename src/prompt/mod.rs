//! Interactive prompts
//!
//! - [`Prompter`]: the question → answer provider
//! - [`PromptQueue`]: serializes every prompt of a run, one at a time
//! - [`ConfirmLoader`]: asks a yes/no question at most once per subject
//! - [`Prompts`]: the confirmations used by init and build

mod confirm;
mod queue;
mod terminal;

pub use confirm::ConfirmLoader;
pub use queue::PromptQueue;
pub use terminal::TerminalPrompter;

use crate::error::PromptError;
use crate::messages;
use async_trait::async_trait;
use std::sync::Arc;

/// Question → answer provider
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question about `subject`
    async fn confirm(&self, question: &str, subject: &str) -> Result<bool, PromptError>;

    /// Ask for free text about `subject`, offering `default`
    async fn input(
        &self,
        question: &str,
        subject: &str,
        default: Option<&str>,
    ) -> Result<String, PromptError>;
}

/// Every confirmation of a run, each asked once per subject
pub struct Prompts {
    queue: Arc<PromptQueue>,
    pub write_main_field: ConfirmLoader,
    pub write_module_field: ConfirmLoader,
    pub fix_module_field: ConfirmLoader,
    pub fix_umd_build: ConfirmLoader,
    pub fix_browser_field: ConfirmLoader,
    pub add_browser_field: ConfirmLoader,
    pub build_workspace_packages: ConfirmLoader,
}

impl Prompts {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        let queue = Arc::new(PromptQueue::new(prompter));
        let loader = |question: &str| ConfirmLoader::new(question, queue.clone());
        Self {
            write_main_field: loader(messages::WRITE_MAIN_FIELD),
            write_module_field: loader(messages::WRITE_MODULE_FIELD),
            fix_module_field: loader(messages::FIX_MODULE_FIELD),
            fix_umd_build: loader(messages::FIX_UMD_BUILD),
            fix_browser_field: loader(messages::FIX_BROWSER_FIELD),
            add_browser_field: loader(messages::ADD_BROWSER_FIELD),
            build_workspace_packages: loader(messages::BUILD_WORKSPACE_PACKAGES),
            queue,
        }
    }

    /// Shared prompt queue
    pub fn queue(&self) -> &Arc<PromptQueue> {
        &self.queue
    }

    /// Ask for free text through the queue
    pub async fn input(
        &self,
        question: &str,
        subject: &str,
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        self.queue.input(question, subject, default).await
    }
}
