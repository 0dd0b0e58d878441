use crate::config::Settings;
use crate::extractor::MediaExtractor;
use crate::ids::IdGenerator;
use crate::progress::ProgressStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub progress: ProgressStore,
    pub extractor: Arc<dyn MediaExtractor>,
    pub ids: IdGenerator,
}
