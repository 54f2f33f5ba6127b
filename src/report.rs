//! Rendering of per-individual results for downstream consumption.
//!
//! Two encodings share the same four logical columns: a `#`-headed
//! tab-separated table and a JSON array of objects keyed by the column
//! names. Exactly one encoding is written per run.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::evaluate::{IndividualResult, Mode};

#[derive(Debug, Serialize)]
struct MendelRow<'a> {
    ind_id: &'a str,
    fraction_of_errors: Option<f64>,
    mendelian_errors: u64,
    number_calls: u64,
}

#[derive(Debug, Serialize)]
struct FatherRow<'a> {
    ind_id: &'a str,
    fraction_of_common_variants: Option<f64>,
    common_variants: u64,
    number_calls: u64,
}

/// Write results to `outfile`, or stdout when none is given.
pub fn write_results(
    results: &[IndividualResult],
    mode: Mode,
    to_json: bool,
    outfile: Option<&Path>,
) -> Result<()> {
    match outfile {
        Some(path) => {
            let writer = File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("failed to create output file at {}", path.display()))?;
            render(writer, results, mode, to_json)
        }
        None => render(io::stdout().lock(), results, mode, to_json),
    }
}

fn render<W: Write>(
    mut writer: W,
    results: &[IndividualResult],
    mode: Mode,
    to_json: bool,
) -> Result<()> {
    if to_json {
        render_json(&mut writer, results, mode)?;
    } else {
        render_tsv(&mut writer, results, mode)?;
    }
    writer.flush().context("failed to flush results")?;
    Ok(())
}

fn render_tsv<W: Write>(writer: &mut W, results: &[IndividualResult], mode: Mode) -> Result<()> {
    writeln!(writer, "#{}", mode.columns().join("\t")).context("failed to write results")?;
    for result in results {
        let fraction = match result.fraction {
            Some(f) => format!("{f:?}"),
            None => String::from("."),
        };
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            result.ind_id, fraction, result.violations, result.number_calls
        )
        .context("failed to write results")?;
    }
    Ok(())
}

fn render_json<W: Write>(writer: &mut W, results: &[IndividualResult], mode: Mode) -> Result<()> {
    match mode {
        Mode::Mendel => {
            let rows: Vec<MendelRow<'_>> = results
                .iter()
                .map(|r| MendelRow {
                    ind_id: &r.ind_id,
                    fraction_of_errors: r.fraction,
                    mendelian_errors: r.violations,
                    number_calls: r.number_calls,
                })
                .collect();
            serde_json::to_writer(writer, &rows).context("failed to encode results as JSON")?;
        }
        Mode::Father => {
            let rows: Vec<FatherRow<'_>> = results
                .iter()
                .map(|r| FatherRow {
                    ind_id: &r.ind_id,
                    fraction_of_common_variants: r.fraction,
                    common_variants: r.violations,
                    number_calls: r.number_calls,
                })
                .collect();
            serde_json::to_writer(writer, &rows).context("failed to encode results as JSON")?;
        }
    }
    Ok(())
}
