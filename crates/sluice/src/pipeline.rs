//! Extract, clean, verify and load the four retail datasets.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::input::{Parser, SourceMetadata};
use crate::load::Destination;
use crate::schema::Dataset;
use crate::transform::{CleanedTables, DatasetTables, TransformEngine, TransformResult};
use crate::validation::ensure_clean;

/// Report of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Extracted files, keyed by table name.
    pub sources: IndexMap<String, SourceMetadata>,
    /// Cleaning results, keyed by table name.
    pub results: IndexMap<String, TransformResult>,
    /// Where the tables went; `None` for previews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl RunSummary {
    /// Rows loaded (or, for previews, that would be loaded) across datasets.
    pub fn rows_out(&self) -> usize {
        self.results.values().map(|r| r.rows_out).sum()
    }

    pub fn timestamp_failures(&self) -> usize {
        self.results.values().map(|r| r.timestamp_failures).sum()
    }
}

/// Cleaned tables together with their summary, as returned by
/// [`Pipeline::preview`].
#[derive(Debug, Clone)]
pub struct Preview {
    pub tables: CleanedTables,
    pub summary: RunSummary,
}

/// One configured ETL pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    parser: Parser,
    engine: TransformEngine,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        let engine = TransformEngine::with_config(config.cleaning.clone());
        Self {
            config,
            parser,
            engine,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    /// Read the four source files.
    pub fn extract(&self) -> Result<(DatasetTables, IndexMap<String, SourceMetadata>)> {
        let mut sources = IndexMap::new();
        let tables = DatasetTables::try_from_fn(|dataset| {
            let (table, metadata) = self
                .parser
                .parse_dataset(dataset, self.config.sources.get(dataset))?;
            sources.insert(dataset.table_name().to_string(), metadata);
            Ok(table)
        })?;
        Ok((tables, sources))
    }

    /// Clean every dataset and check the invariants of the result.
    pub fn transform(&self, tables: DatasetTables) -> Result<CleanedTables> {
        let cleaned = if self.config.parallel {
            self.engine.clean_all_parallel(tables)?
        } else {
            self.engine.clean_all(tables)?
        };
        for (dataset, table) in cleaned.iter() {
            ensure_clean(dataset, &table.table, self.engine.config())?;
        }
        Ok(cleaned)
    }

    /// Replace the four tables at `destination` in one session.
    pub fn load(&self, destination: &dyn Destination, tables: &CleanedTables) -> Result<()> {
        let mut session = destination.connect()?;
        for (dataset, cleaned) in tables.iter() {
            session.replace_table(dataset.table_name(), &cleaned.table)?;
        }
        session.commit()
    }

    /// Extract and clean without loading.
    pub fn preview(&self) -> Result<Preview> {
        let span = info_span!("preview");
        let _guard = span.enter();
        let started_at = Utc::now();

        let (raw, sources) = self.extract()?;
        let tables = self.transform(raw)?;
        let summary = summarize(started_at, sources, &tables, None);
        Ok(Preview { tables, summary })
    }

    /// One full run against the configured destination.
    ///
    /// Nothing is published unless every dataset extracts, cleans and
    /// passes its checks.
    pub fn run(&self) -> Result<RunSummary> {
        let destination = self.config.destination.open();
        self.run_with(destination.as_ref())
    }

    /// One full run against an explicit destination.
    pub fn run_with(&self, destination: &dyn Destination) -> Result<RunSummary> {
        let span = info_span!("run", destination = %destination.describe());
        let _guard = span.enter();
        let started_at = Utc::now();
        info!("Pipeline started");

        let (raw, sources) = self.extract()?;
        let tables = self.transform(raw)?;
        self.load(destination, &tables)?;

        let summary = summarize(started_at, sources, &tables, Some(destination.describe()));
        info!(
            rows_out = summary.rows_out(),
            timestamp_failures = summary.timestamp_failures(),
            duration_ms = (summary.finished_at - started_at).num_milliseconds(),
            "Pipeline complete"
        );
        Ok(summary)
    }
}

fn summarize(
    started_at: DateTime<Utc>,
    sources: IndexMap<String, SourceMetadata>,
    tables: &CleanedTables,
    destination: Option<String>,
) -> RunSummary {
    let results = Dataset::ALL
        .iter()
        .map(|d| (d.table_name().to_string(), tables.get(*d).result.clone()))
        .collect();
    RunSummary {
        started_at,
        finished_at: Utc::now(),
        sources,
        results,
        destination,
    }
}
