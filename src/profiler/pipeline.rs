use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::query_classifier::classify_queries;
use crate::error::{ProfileError, SourceError};
use crate::history::record::QueryRecord;
use crate::history::statistics::summarize_executions;
use crate::history::store::{IngestSummary, ProfileStore};
use crate::parser::backend::ReferenceParser;
use crate::parser::sql_parser::SqlParserBackend;
use crate::profiler::config::ProfileConfig;
use crate::scoring::aggregator::{
    expand_usage, summarize_usage, ColumnSummaryRow, ColumnUsageRow,
};
use crate::scoring::normalizer::{normalize, ScaledColumnSummaryRow};

/// A query whose text could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// Failing query.
    pub query_id: String,
    /// Parser message.
    pub error: String,
}

/// Everything one profiling run publishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileOutput {
    /// Per-query, per-reference usage rows.
    pub usage: Vec<ColumnUsageRow>,
    /// One rollup per (table, column).
    pub summary: Vec<ColumnSummaryRow>,
    /// The rollups scaled within each table.
    pub scaled: Vec<ScaledColumnSummaryRow>,
    /// Parsed queries carrying an error annotation, by query id.
    pub parse_failures: Vec<ParseFailure>,
}

/// Counts from re-parsing the distinct queries of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Queries parsed for the first time, or because their text or the
    /// parser backend changed.
    pub reparsed: usize,
    /// Queries whose stored parse was reused.
    pub unchanged: usize,
}

/// Drives ingestion, parsing, and scoring over a [`ProfileStore`].
#[derive(Debug, Clone)]
pub struct Profiler<P = SqlParserBackend> {
    parser: P,
    config: ProfileConfig,
}

impl Profiler<SqlParserBackend> {
    /// Profiler using the `sqlparser` backend in the configured dialect.
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            parser: SqlParserBackend::new(config.dialect),
            config,
        }
    }
}

impl<P: ReferenceParser> Profiler<P> {
    /// Profiler with a substitute parser backend.
    pub fn with_parser(parser: P, config: ProfileConfig) -> Self {
        Self { parser, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Pull every incoming record, then append the admitted ones to the
    /// store's history.
    ///
    /// The source is drained before the store is touched: if it fails, the
    /// store is left as it was and the failure is returned.
    pub fn ingest<I, E>(
        &self,
        store: &mut ProfileStore,
        incoming: I,
    ) -> Result<IngestSummary, ProfileError>
    where
        I: IntoIterator<Item = Result<QueryRecord, E>>,
        E: Into<SourceError>,
    {
        let records = incoming
            .into_iter()
            .collect::<Result<Vec<_>, E>>()
            .map_err(|e| ProfileError::Fetch(e.into()))?;

        let fetched = records.len();
        let summary = store.history.ingest(records, &self.config.filter);
        info!(
            fetched,
            accepted = summary.accepted,
            skipped = summary.skipped_statement_type,
            duplicates = summary.duplicates,
            "ingested query records"
        );
        Ok(summary)
    }

    /// Parse the distinct queries of the history whose stored parse is
    /// missing, was made from other text, or came from a differently
    /// configured backend, and upsert the results.
    pub fn refresh_parsed(&self, store: &mut ProfileStore) -> RefreshSummary {
        let fingerprint = self.parser.fingerprint();
        let (stale, current): (Vec<_>, Vec<_>) = store
            .history
            .distinct_queries()
            .into_iter()
            .partition(|(id, text)| !store.parsed.is_current(id, text, &fingerprint));

        let reparsed = classify_queries(&self.parser, &stale);
        let summary = RefreshSummary {
            reparsed: reparsed.len(),
            unchanged: current.len(),
        };
        for parsed in reparsed {
            if let Some(previous) = store.parsed.upsert(parsed) {
                debug!(
                    query_id = %previous.query_id,
                    previous_backend = %previous.parsed_with,
                    "replaced stale parse"
                );
            }
        }

        info!(
            reparsed = summary.reparsed,
            unchanged = summary.unchanged,
            "refreshed parsed queries"
        );
        summary
    }

    /// Score the store's current contents.
    ///
    /// Pure over the store: the same store always yields the same output.
    pub fn score(&self, store: &ProfileStore) -> ProfileOutput {
        let stats = summarize_executions(store.history.records(), &self.config.filter);
        let usage = expand_usage(store.parsed.values(), &stats);
        let summary = summarize_usage(&usage);
        let scaled = normalize(summary.clone());

        let parse_failures: Vec<ParseFailure> = store
            .parsed
            .values()
            .filter_map(|parsed| {
                parsed.error.as_ref().map(|error| ParseFailure {
                    query_id: parsed.query_id.clone(),
                    error: error.clone(),
                })
            })
            .collect();
        if !parse_failures.is_empty() {
            warn!(count = parse_failures.len(), "queries could not be parsed");
        }

        info!(
            queries = stats.len(),
            usage_rows = usage.len(),
            columns = summary.len(),
            "scored column usage"
        );
        ProfileOutput {
            usage,
            summary,
            scaled,
            parse_failures,
        }
    }

    /// Full run: ingest, refresh parses, score.
    pub fn run<I, E>(
        &self,
        store: &mut ProfileStore,
        incoming: I,
    ) -> Result<ProfileOutput, ProfileError>
    where
        I: IntoIterator<Item = Result<QueryRecord, E>>,
        E: Into<SourceError>,
    {
        self.ingest(store, incoming)?;
        self.refresh_parsed(store);
        Ok(self.score(store))
    }
}
