use crate::assemble::assemble;
use crate::classify::ConfidenceBands;
use crate::config::{Algorithm, ColumnMapping, MatchConfig};
use crate::embedding::Capabilities;
use crate::error::MatchError;
use crate::hooks::{Cancellation, NoProgress, RunHooks};
use crate::model::{MatchInput, MatchMeta, MatchOutput, RawRecord, RawValue};
use crate::normalize::Normalizer;
use crate::passes::PassController;
use crate::scorer::build_scorer;
use crate::summary::compute_summary;

/// Run one matching pass ladder per config.
///
/// Configuration and capability problems fail before any row is touched.
/// Row-level data problems never fail the run. Cancellation returns the
/// partial results with `RunStatus::Cancelled`.
pub fn run(
    config: &MatchConfig,
    input: &MatchInput,
    caps: &Capabilities,
    hooks: &RunHooks<'_>,
) -> Result<MatchOutput, MatchError> {
    config.validate()?;
    let scorer = build_scorer(config, caps)?;

    let normalizer = Normalizer::new(&config.names, config.date_order);
    let gss = normalizer.normalize_table(&input.gss, &config.gss.columns);
    let opera = normalizer.normalize_table(&input.opera, &config.opera.columns);
    log::debug!(
        "normalized {} gss rows ({} undated), {} opera rows ({} undated)",
        gss.len(),
        gss.iter().filter(|r| r.date.is_none()).count(),
        opera.len(),
        opera.iter().filter(|r| r.date.is_none()).count()
    );

    scorer.prepare(&gss, &opera)?;

    let passes = config.pass_ladder();
    let outcome = PassController::new(
        scorer.as_ref(),
        ConfidenceBands::from(&config.confidence),
        &passes,
        config.show_all_matches,
        &gss,
        &opera,
    )
    .run(hooks)?;

    let status = outcome.status;
    let results = assemble(outcome, &gss, config.unmatched_gss);
    let summary = compute_summary(&results, gss.len(), opera.len());

    log::info!(
        "{} ({}): {} matched, {} unmatched gss, {} unmatched opera",
        config.name,
        config.algorithm.label(),
        summary.matched,
        summary.unmatched_gss,
        summary.unmatched_opera
    );

    Ok(MatchOutput {
        meta: MatchMeta {
            config_name: config.name.clone(),
            algorithm: config.algorithm,
            threshold: config.threshold,
            date_tolerance_days: config.date_tolerance_days,
            show_all_matches: config.show_all_matches,
            passes,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        status,
        summary,
        results,
    })
}

/// Run the same config once per algorithm, concurrently.
///
/// Each run gets its own scorer and pass controller; the input is shared
/// read-only. Results come back in `algorithms` order.
pub fn compare_algorithms(
    config: &MatchConfig,
    input: &MatchInput,
    caps: &Capabilities,
    algorithms: &[Algorithm],
    cancel: &dyn Cancellation,
) -> Vec<(Algorithm, Result<MatchOutput, MatchError>)> {
    std::thread::scope(|s| {
        let handles: Vec<_> = algorithms
            .iter()
            .map(|&algorithm| {
                let mut cfg = config.clone();
                cfg.algorithm = algorithm;
                let handle = s.spawn(move || run(&cfg, input, caps, &RunHooks::new(&NoProgress, cancel)));
                (algorithm, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(algorithm, handle)| {
                let result = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (algorithm, result)
            })
            .collect()
    })
}

/// Load CSV text into raw records. Every column is kept; the mapped
/// columns must exist in the header.
pub fn load_csv_records(
    table: &str,
    csv_data: &str,
    columns: &ColumnMapping,
) -> Result<Vec<RawRecord>, MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MatchError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for column in columns.columns() {
        if !headers.iter().any(|h| h == column) {
            return Err(MatchError::MissingColumn {
                table: table.into(),
                column: column.into(),
            });
        }
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| MatchError::Io(e.to_string()))?;
        if record.len() != headers.len() {
            log::warn!(
                "{table}: row {} has {} fields, header has {}",
                i + 1,
                record.len(),
                headers.len()
            );
        }
        let fields = headers
            .iter()
            .enumerate()
            .map(|(ci, h)| {
                let value = record.get(ci).map(RawValue::infer).unwrap_or(RawValue::Empty);
                (h.clone(), value)
            })
            .collect();
        rows.push(RawRecord::new(fields));
    }

    Ok(rows)
}
