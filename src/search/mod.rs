use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::file::{extract, FileWalker};
use crate::oracle::RelevanceOracle;

/// Event channel capacity; the pipeline blocks once the consumer lags this far
const EVENT_BUFFER: usize = 32;

/// Request-level failures, surfaced to the delivery surface
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("folder does not exist or is not a directory: {}", .0.display())]
    InvalidFolder(PathBuf),
}

/// One search invocation as submitted by a caller
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub folder: PathBuf,

    /// Accepted extensions; falls back to the configured defaults when empty
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.folder.is_dir() {
            return Err(SearchError::InvalidFolder(self.folder.clone()));
        }
        Ok(())
    }
}

/// A matching file paired with the model's justification
///
/// Field names on the wire stay `file_path`/`ia_response` for the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    #[serde(rename = "file_path")]
    pub path: PathBuf,

    #[serde(rename = "ia_response")]
    pub justification: String,
}

/// Progress events emitted while a search runs
///
/// The console surface prints all of them; the HTTP surfaces forward only
/// `Match`.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// A candidate file is about to be read
    Scanning { path: PathBuf },

    /// File had empty or whitespace-only content; no judgement requested
    Skipped { path: PathBuf },

    /// The oracle call for this file failed; classified as a non-match
    Failed { path: PathBuf, error: String },

    /// The oracle returned a judgement for this file
    Judged {
        path: PathBuf,
        judgement: String,
        matched: bool,
    },

    /// A classified match, emitted right after its `Judged` event
    Match(SearchMatch),
}

/// Counters accumulated over one search run
#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub files_judged: usize,
    pub matches: usize,
    pub oracle_errors: usize,
}

/// The sequential walk -> extract -> judge -> classify pipeline
///
/// One file is fully extracted and judged before the next begins; the only
/// suspension point is the oracle call.
pub struct SearchPipeline {
    config: SearchConfig,
    oracle: Arc<dyn RelevanceOracle>,
}

impl SearchPipeline {
    pub fn new(config: SearchConfig, oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self { config, oracle }
    }

    /// Build the fixed judgement prompt, capping the content excerpt
    pub fn build_prompt(&self, query: &str, content: &str) -> String {
        let excerpt: String = content.chars().take(self.config.excerpt_chars).collect();

        format!(
            "I am looking for files related to this phrase:\n\
             \"{query}\"\n\
             \n\
             Below is the content of the file:\n\
             {excerpt}\n\
             \n\
             Is this content directly related to the phrase above?\n\
             Answer 'Yes' or 'No' and justify in one line.\n"
        )
    }

    /// Classify a judgement: case-insensitive substring on the affirmative
    /// token. The model response carries no structure to parse.
    pub fn is_match(&self, judgement: &str) -> bool {
        judgement
            .to_lowercase()
            .contains(&self.config.affirmative_token.to_lowercase())
    }

    /// Run the search, emitting [`SearchEvent`]s into `events` as files are
    /// processed. Returns the run counters, or a request-level error.
    ///
    /// If the receiver hangs up (e.g., an HTTP client disconnected
    /// mid-stream), the remaining files are not processed.
    pub async fn run(
        &self,
        request: &SearchRequest,
        events: mpsc::Sender<SearchEvent>,
    ) -> Result<SearchStats, SearchError> {
        request.validate()?;

        let extensions = if request.extensions.is_empty() {
            self.config.extensions.clone()
        } else {
            request.extensions.clone()
        };

        let walker = FileWalker::new(&request.folder, &extensions);
        let mut stats = SearchStats::default();

        for path in walker.files() {
            stats.files_seen += 1;

            if events
                .send(SearchEvent::Scanning { path: path.clone() })
                .await
                .is_err()
            {
                debug!("Event receiver dropped, stopping search");
                break;
            }

            let content = extract(&path);
            if content.trim().is_empty() {
                stats.files_skipped += 1;
                if events
                    .send(SearchEvent::Skipped { path })
                    .await
                    .is_err()
                {
                    break;
                }
                continue;
            }

            let prompt = self.build_prompt(&request.query, &content);
            stats.files_judged += 1;

            let judgement = match self.oracle.judge(&prompt).await {
                Ok(judgement) => judgement,
                Err(err) => {
                    warn!("Oracle failed for {}: {}", path.display(), err);
                    stats.oracle_errors += 1;
                    if events
                        .send(SearchEvent::Failed {
                            path,
                            error: err.to_string(),
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                    continue;
                }
            };

            let matched = self.is_match(&judgement);
            if events
                .send(SearchEvent::Judged {
                    path: path.clone(),
                    judgement: judgement.clone(),
                    matched,
                })
                .await
                .is_err()
            {
                break;
            }

            if matched {
                stats.matches += 1;
                if events
                    .send(SearchEvent::Match(SearchMatch {
                        path,
                        justification: judgement,
                    }))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }

        Ok(stats)
    }

    /// Batch mode: run to completion and collect the matches
    pub async fn run_batch(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

        let drain = async {
            let mut matches = Vec::new();
            while let Some(event) = rx.recv().await {
                if let SearchEvent::Match(found) = event {
                    matches.push(found);
                }
            }
            matches
        };

        let (stats, matches) = futures::join!(self.run(request, tx), drain);
        stats?;

        Ok(matches)
    }
}
