use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dispatch::Dispatcher;

/// Shared state injected into each request handler.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    upload_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, upload_dir: Option<PathBuf>) -> Self {
        Self {
            dispatcher,
            upload_dir,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn upload_dir(&self) -> Option<&Path> {
        self.upload_dir.as_deref()
    }
}
