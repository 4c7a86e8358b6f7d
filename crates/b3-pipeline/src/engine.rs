//! ETL pipeline: extract, clean, compute indicators, load.

use b3_config::AppConfig;
use b3_core::error::{DataError, EtlResult};
use b3_core::traits::{ExtractFilter, Extractor, Loader};
use b3_data::DataCleaner;
use b3_indicators::{IndicatorEngine, IndicatorSummary};
use b3_monitor::{JobState, JobStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::report::PipelineReport;
use crate::statistics::PipelineStats;

/// One extractor, one cleaner, an optional indicator engine and one loader.
pub struct EtlPipeline {
    extractor: Arc<dyn Extractor>,
    loader: Arc<dyn Loader>,
    cleaner: DataCleaner,
    engine: Option<IndicatorEngine>,
    filter: ExtractFilter,
}

impl EtlPipeline {
    /// Pipeline with default cleaning and indicator settings and no filters.
    pub fn new(extractor: Arc<dyn Extractor>, loader: Arc<dyn Loader>) -> EtlResult<Self> {
        Ok(Self {
            extractor,
            loader,
            cleaner: DataCleaner::default(),
            engine: Some(IndicatorEngine::new(Default::default())?),
            filter: ExtractFilter::default(),
        })
    }

    /// Build a pipeline from the `cleaning`, `indicators` and `pipeline`
    /// sections of the configuration.
    pub fn from_config(
        config: &AppConfig,
        extractor: Arc<dyn Extractor>,
        loader: Arc<dyn Loader>,
    ) -> EtlResult<Self> {
        let engine = if config.pipeline.calculate_indicators {
            Some(IndicatorEngine::new(config.indicators.clone())?)
        } else {
            None
        };
        Ok(Self {
            extractor,
            loader,
            cleaner: DataCleaner::new(config.cleaning),
            engine,
            filter: ExtractFilter {
                tickers: config.pipeline.tickers.clone(),
                start_date: config.pipeline.start_date,
                end_date: config.pipeline.end_date,
            },
        })
    }

    pub fn with_cleaner(mut self, cleaner: DataCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_indicators(mut self, engine: IndicatorEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn without_indicators(mut self) -> Self {
        self.engine = None;
        self
    }

    pub fn with_filter(mut self, filter: ExtractFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn filter(&self) -> &ExtractFilter {
        &self.filter
    }

    /// Run the pipeline, reporting progress into `job`.
    ///
    /// On error the job is marked failed before the error is returned.
    pub async fn run(&self, job: &mut JobState) -> EtlResult<PipelineReport> {
        info!(
            job_id = %job.job_id,
            source = self.extractor.name(),
            destination = self.loader.name(),
            indicators = self.engine.is_some(),
            "Starting ETL pipeline"
        );

        match self.execute(job).await {
            Ok(report) => {
                job.complete();
                info!(
                    job_id = %job.job_id,
                    cleaned = report.stats.cleaned_rows,
                    indicator_rows = report.stats.indicator_rows,
                    elapsed_ms = report.stats.total_millis(),
                    "ETL pipeline complete"
                );
                Ok(report)
            }
            Err(e) => {
                job.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &mut JobState) -> EtlResult<PipelineReport> {
        let mut stats = PipelineStats::new();

        job.enter(JobStatus::Validating, "extract");
        let start = Instant::now();
        let table = self.extractor.extract(&self.filter).await?;
        stats.extracted_rows = table.len();
        stats.record_stage("extract", start.elapsed());
        job.processed_rows = table.len();
        job.info("extract", format!("{} rows read from {}", table.len(), self.extractor.name()));

        job.enter(JobStatus::Cleaning, "clean");
        let start = Instant::now();
        let (bars, cleaning) = self.cleaner.clean(&table)?;
        stats.record_stage("clean", start.elapsed());
        stats.cleaned_rows = bars.len();
        job.cleaned_rows = bars.len();
        if bars.is_empty() {
            return Err(DataError::empty("cleaning output").into());
        }
        job.info(
            "clean",
            format!(
                "{} rows kept, {} removed ({:.2}%)",
                cleaning.cleaned_rows,
                cleaning.removed_rows(),
                cleaning.removal_percentage()
            ),
        );
        if cleaning.outliers_removed > 0 {
            job.warn(
                "clean",
                format!("{} outlier rows removed", cleaning.outliers_removed),
            );
        }

        job.enter(JobStatus::Transforming, "indicators");
        let start = Instant::now();
        let computed = match &self.engine {
            Some(engine) => {
                let rows = engine.compute(&bars)?;
                let summary = IndicatorSummary::from_rows(&rows, engine.columns());
                job.info(
                    "indicators",
                    format!("{} indicators over {} rows", engine.columns().len(), rows.len()),
                );
                Some((engine, rows, summary))
            }
            None => {
                job.info("indicators", "indicator calculation skipped");
                None
            }
        };
        stats.record_stage("indicators", start.elapsed());
        if let Some((engine, rows, _)) = &computed {
            stats.indicator_rows = rows.len();
            stats.indicator_columns = engine.columns().len();
        }

        job.enter(JobStatus::Loading, "load");
        let start = Instant::now();
        let prices_loaded = self.loader.load_prices(&bars).await?;
        job.set_progress(90);
        let indicators_loaded = match &computed {
            Some((engine, rows, _)) => {
                Some(self.loader.load_indicators(rows, engine.columns()).await?)
            }
            None => None,
        };
        stats.record_stage("load", start.elapsed());
        job.info(
            "load",
            format!(
                "{} price rows inserted, {} updated",
                prices_loaded.inserted, prices_loaded.updated
            ),
        );

        Ok(PipelineReport {
            job_id: job.job_id,
            source: self.extractor.name().to_string(),
            destination: self.loader.name().to_string(),
            cleaning,
            indicators: computed.map(|(_, _, summary)| summary),
            prices_loaded,
            indicators_loaded,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use b3_core::types::{RawRecord, RawTable};
    use b3_data::MemoryLoader;

    struct StaticExtractor(RawTable);

    #[async_trait]
    impl Extractor for StaticExtractor {
        async fn extract(&self, _filter: &ExtractFilter) -> Result<RawTable, DataError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn table(days: u32) -> RawTable {
        RawTable::from_records(
            (1..=days)
                .map(|d| {
                    let close = 10.0 + d as f64 * 0.1;
                    RawRecord::new(
                        &format!("2020-01-{d:02}"),
                        "PETR4",
                        &format!("{close:.2}"),
                        &format!("{:.2}", close + 0.2),
                        &format!("{:.2}", close - 0.2),
                        &format!("{close:.2}"),
                        "1000",
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_pipeline_runs_to_completion() {
        let loader = Arc::new(MemoryLoader::new());
        let pipeline =
            EtlPipeline::new(Arc::new(StaticExtractor(table(25))), loader.clone()).unwrap();

        let mut job = JobState::new();
        let report = pipeline.run(&mut job).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.processed_rows, 25);
        assert_eq!(report.job_id, job.job_id);
        assert_eq!(report.cleaning.cleaned_rows, 25);
        assert_eq!(loader.price_count(), 25);
        assert!(loader.indicator_count() > 0);
        assert_eq!(report.stats.stage_timings.len(), 4);
    }

    #[tokio::test]
    async fn test_pipeline_without_indicators() {
        let loader = Arc::new(MemoryLoader::new());
        let pipeline = EtlPipeline::new(Arc::new(StaticExtractor(table(5))), loader.clone())
            .unwrap()
            .without_indicators();

        let mut job = JobState::new();
        let report = pipeline.run(&mut job).await.unwrap();

        assert!(report.indicators.is_none());
        assert!(report.indicators_loaded.is_none());
        assert_eq!(loader.indicator_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_marks_job_failed() {
        let loader = Arc::new(MemoryLoader::new());
        let empty = RawTable::from_records(Vec::new());
        let pipeline = EtlPipeline::new(Arc::new(StaticExtractor(empty)), loader).unwrap();

        let mut job = JobState::new();
        let err = pipeline.run(&mut job).await.unwrap_err();

        assert!(err.is_structural());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 30);
        assert_eq!(job.error_count, 1);
    }
}
