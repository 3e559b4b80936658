//! Feature Extractor
//!
//! Drives one extraction: group the input into chunks, map the chunk
//! processor over them on a backend, then assemble the table. Setup
//! problems fail before any chunk is dispatched.

use crate::assembler::{assemble_with_rows, ResultTable};
use crate::backend::{validate_batch_size, Backend, ExecutionBackend};
use crate::config::{ConcurrencyConfig, ExtractionConfig};
use crate::error::{ConfigurationError, ExtractionError, TeardownWarning};
use crate::processor::{validate_catalogs, CalculatorFault, ChunkProcessor, Emission};
use feature_engine::{CalculatorRegistry, KindOverrides, ParameterCatalog};
use serde::Serialize;
use series_grouper::{group, Chunk, ColumnRoles, EntityId, GroupingFault, LongFrame};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Everything that went wrong without aborting the run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Input rows consumed
    pub rows: usize,
    /// Chunks dispatched
    pub chunks: usize,
    pub grouping_faults: Vec<GroupingFault>,
    pub calculator_faults: Vec<CalculatorFault>,
    pub teardown_warnings: Vec<TeardownWarning>,
    pub backend: &'static str,
    pub elapsed: Duration,
}

impl ExtractionReport {
    /// Grouping plus calculator faults
    pub fn failure_count(&self) -> usize {
        self.grouping_faults.len() + self.calculator_faults.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0 && self.teardown_warnings.is_empty()
    }
}

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction<I> {
    pub table: ResultTable<I>,
    pub report: ExtractionReport,
}

/// Validated registry and catalogs, reusable across extractions
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    registry: CalculatorRegistry,
    default_catalog: ParameterCatalog,
    overrides: KindOverrides,
    roles: ColumnRoles,
}

impl FeatureExtractor {
    /// Check both catalogs against `registry`
    pub fn new(
        registry: CalculatorRegistry,
        default_catalog: ParameterCatalog,
        overrides: KindOverrides,
    ) -> Result<Self, ConfigurationError> {
        validate_catalogs(&registry, &default_catalog, &overrides)?;
        info!(
            "Feature extractor ready: {} default calculators, {} kind overrides",
            default_catalog.len(),
            overrides.len()
        );
        Ok(Self {
            registry,
            default_catalog,
            overrides,
            roles: ColumnRoles::default(),
        })
    }

    /// Extractor over the built-in calculator library
    pub fn builtin(default_catalog: ParameterCatalog, overrides: KindOverrides) -> Result<Self, ConfigurationError> {
        Self::new(CalculatorRegistry::builtin(), default_catalog, overrides)
    }

    /// Built-in extractor set up from a loaded configuration
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::builtin(config.default_catalog.clone(), config.kind_overrides.clone())?
            .with_roles(config.roles.clone()))
    }

    /// Use other column names for the id, kind and value roles
    pub fn with_roles(mut self, roles: ColumnRoles) -> Self {
        self.roles = roles;
        self
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// Extract on the backend `concurrency` selects
    pub fn extract<I: EntityId>(
        &self,
        frame: &LongFrame<I>,
        concurrency: &ConcurrencyConfig,
    ) -> Result<Extraction<I>, ExtractionError> {
        let mut backend = Backend::from_config(concurrency)?;
        self.extract_with_backend(frame, &mut backend, concurrency.batch_size)
    }

    /// Extract on a caller-supplied backend.
    ///
    /// The backend is closed when the run ends, on success and on error.
    /// A failed close is logged and reported but never replaces the
    /// outcome of the run.
    pub fn extract_with_backend<I, B>(
        &self,
        frame: &LongFrame<I>,
        backend: &mut B,
        batch_size: Option<usize>,
    ) -> Result<Extraction<I>, ExtractionError>
    where
        I: EntityId,
        B: ExecutionBackend,
    {
        let start = Instant::now();
        let outcome = self.run(frame, &*backend, batch_size);
        let teardown = backend.close();
        if let Err(warning) = &teardown {
            warn!("{}", warning);
        }

        let (table, mut report) = outcome?;
        report.backend = backend.name();
        report.elapsed = start.elapsed();
        if let Err(warning) = teardown {
            report.teardown_warnings.push(warning);
        }

        info!(
            "Extracted {} features for {} entities from {} chunks ({} faults) in {:?}",
            table.n_columns(),
            table.n_rows(),
            report.chunks,
            report.failure_count(),
            report.elapsed
        );
        Ok(Extraction { table, report })
    }

    fn run<I, B>(
        &self,
        frame: &LongFrame<I>,
        backend: &B,
        batch_size: Option<usize>,
    ) -> Result<(ResultTable<I>, ExtractionReport), ExtractionError>
    where
        I: EntityId,
        B: ExecutionBackend,
    {
        validate_batch_size(batch_size)?;
        backend.ensure_ready()?;
        let grouping = group(frame, &self.roles).map_err(ConfigurationError::from)?;
        let processor = ChunkProcessor::new(&self.registry, &self.default_catalog, &self.overrides)?;

        for fault in &grouping.faults {
            warn!("{}", fault);
        }

        let chunks = grouping.chunks;
        let entities: Vec<I> = chunks.iter().map(|c| c.entity_id.clone()).collect();
        let mut report = ExtractionReport {
            rows: grouping.rows,
            chunks: chunks.len(),
            grouping_faults: grouping.faults,
            ..Default::default()
        };

        info!(
            "Dispatching {} chunks on the {} backend",
            report.chunks,
            backend.name()
        );
        let emissions = backend.map_reduce(
            |chunk: Chunk<I>| processor.process(&chunk),
            chunks,
            batch_size,
        )?;

        let mut records = Vec::with_capacity(emissions.len());
        for emission in emissions {
            match emission {
                Emission::Record(record) => records.push(record),
                Emission::Fault(fault) => report.calculator_faults.push(fault),
            }
        }
        report.calculator_faults.sort_by(|a, b| {
            (&a.entity_key, &a.kind, &a.calculator, &a.param_key)
                .cmp(&(&b.entity_key, &b.kind, &b.calculator, &b.param_key))
        });
        if !report.calculator_faults.is_empty() {
            warn!("{} calculator calls failed", report.calculator_faults.len());
        }

        let table = assemble_with_rows(records, entities)?;
        Ok((table, report))
    }
}

/// One-shot extraction with the built-in calculators and default column
/// roles
pub fn extract<I: EntityId>(
    frame: &LongFrame<I>,
    default_catalog: &ParameterCatalog,
    overrides: &KindOverrides,
    concurrency: &ConcurrencyConfig,
) -> Result<Extraction<I>, ExtractionError> {
    FeatureExtractor::builtin(default_catalog.clone(), overrides.clone())?.extract(frame, concurrency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use series_grouper::NormalizedRecord;

    fn frame() -> LongFrame<u32> {
        LongFrame::from_records(vec![
            NormalizedRecord::new(1, "x", 1.0),
            NormalizedRecord::new(1, "x", 3.0),
            NormalizedRecord::new(2, "x", 10.0),
        ])
    }

    #[test]
    fn test_report_counts() {
        let extractor =
            FeatureExtractor::builtin(ParameterCatalog::new().with("mean", vec![]), KindOverrides::new()).unwrap();
        let extraction = extractor.extract(&frame(), &ConcurrencyConfig::sequential()).unwrap();

        assert_eq!(extraction.report.rows, 3);
        assert_eq!(extraction.report.chunks, 2);
        assert_eq!(extraction.report.backend, "sequential");
        assert!(extraction.report.is_clean());
        assert_eq!(extraction.table.cell(&1, "x__mean").and_then(|c| c.value()), Some(2.0));
    }

    #[test]
    fn test_custom_roles() {
        let frame = LongFrame::new(vec![
            ("device".to_string(), series_grouper::Column::Ids(vec![5u32, 5])),
            ("sensor".to_string(), series_grouper::Column::Text(vec!["t".into(), "t".into()])),
            ("reading".to_string(), series_grouper::Column::Float(vec![1.0, 2.0])),
        ])
        .unwrap();
        let extractor =
            FeatureExtractor::builtin(ParameterCatalog::new().with("sum_values", vec![]), KindOverrides::new())
                .unwrap()
                .with_roles(ColumnRoles::new("device", "sensor", "reading"));

        let extraction = extractor.extract(&frame, &ConcurrencyConfig::sequential()).unwrap();
        assert_eq!(extraction.table.cell(&5, "t__sum_values").and_then(|c| c.value()), Some(3.0));
    }

    #[test]
    fn test_zero_batch_size_fails_before_dispatch() {
        let extractor = FeatureExtractor::builtin(ParameterCatalog::minimal(), KindOverrides::new()).unwrap();
        let config = ConcurrencyConfig::pooled(2).with_batch_size(0);
        assert!(matches!(
            extractor.extract(&frame(), &config),
            Err(ExtractionError::Configuration(ConfigurationError::InvalidBatchSize))
        ));
    }
}
