//! Time-series Feature Extraction Engine
//!
//! Partitions normalized long-format input into (entity, kind) chunks,
//! maps a catalog of named calculators over them on a sequential or pooled
//! backend, and assembles the emitted records into an entity-by-feature
//! table with explicit missing cells.
//!
//! ```no_run
//! use extraction_engine::{extract, ConcurrencyConfig};
//! use feature_engine::{KindOverrides, ParameterCatalog};
//! use series_grouper::{LongFrame, NormalizedRecord};
//!
//! let frame = LongFrame::from_records(vec![
//!     NormalizedRecord::new(1u32, "x", 1.0),
//!     NormalizedRecord::new(1u32, "x", 3.0),
//! ]);
//! let catalog = ParameterCatalog::new().with("mean", vec![]);
//! let extraction = extract(&frame, &catalog, &KindOverrides::new(), &ConcurrencyConfig::pooled(2))?;
//! assert_eq!(extraction.table.cell(&1, "x__mean").and_then(|c| c.value()), Some(2.0));
//! # Ok::<(), extraction_engine::ExtractionError>(())
//! ```

mod assembler;
mod backend;
mod config;
mod error;
mod extractor;
mod logging;
mod processor;
mod progress;

pub use assembler::{assemble, assemble_with_rows, Cell, ResultTable};
pub use backend::{default_batch_size, Backend, ExecutionBackend, PooledBackend, SequentialBackend};
pub use config::{ConcurrencyConfig, ExecutionMode, ExtractionConfig, ENV_PREFIX};
pub use error::{ConfigurationError, ExtractionError, TeardownWarning};
pub use extractor::{extract, Extraction, ExtractionReport, FeatureExtractor};
pub use logging::{init_json_logging, init_logging};
pub use processor::{variable_name, CalculatorFault, ChunkProcessor, Emission, FeatureRecord};
pub use progress::{LogProgress, ProgressCallback, ProgressInfo};
