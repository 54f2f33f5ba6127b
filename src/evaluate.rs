use std::collections::HashMap;
use std::io::BufRead;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::genotype::{
    self, all_high_quality, common_variant, extract_genotypes, mendelian_violation,
};
use crate::ped::Pedigree;
use crate::units::{self, AnalysisUnit};
use crate::vcf;

/// Which inheritance check a run performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Mendelian errors over trios.
    Mendel,
    /// Variants shared between child and father, over duos.
    Father,
}

impl Mode {
    /// Output column names, in the fixed report order.
    pub fn columns(&self) -> [&'static str; 4] {
        match self {
            Self::Mendel => [
                "ind_id",
                "fraction_of_errors",
                "mendelian_errors",
                "number_calls",
            ],
            Self::Father => [
                "ind_id",
                "fraction_of_common_variants",
                "common_variants",
                "number_calls",
            ],
        }
    }

    fn build_units(&self, pedigree: &Pedigree) -> Vec<AnalysisUnit> {
        match self {
            Self::Mendel => units::build_trios(pedigree)
                .into_iter()
                .map(AnalysisUnit::Trio)
                .collect(),
            Self::Father => units::build_duos(pedigree)
                .into_iter()
                .map(AnalysisUnit::Duo)
                .collect(),
        }
    }
}

/// Running tallies for one analysis child.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counter {
    pub number_calls: u64,
    pub violations: u64,
}

/// Finalized tallies for one analysis child.
///
/// `fraction` is `None` when no call passed the gate over the whole
/// stream; the child is still reported so the operator sees it was
/// registered but contributed nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct IndividualResult {
    pub ind_id: String,
    pub fraction: Option<f64>,
    pub violations: u64,
    pub number_calls: u64,
}

/// Fatal evaluation errors. None of these have a skip-and-continue path:
/// a structurally bad line means accumulated counts can no longer be
/// trusted.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Decode(#[from] vcf::DecodeError),
    #[error(transparent)]
    Genotype(#[from] genotype::GenotypeError),
    #[error(
        "pedigree and variant stream disagree on individuals: \
         {missing:?} missing from the stream (pedigree: {pedigree:?}, stream: {stream:?})"
    )]
    Consistency {
        missing: Vec<String>,
        pedigree: Vec<String>,
        stream: Vec<String>,
    },
}

/// Every pedigree individual must be present in the stream header; report
/// the full id sets on mismatch so the operator can diagnose the swap.
pub fn check_individuals(pedigree: &Pedigree, header: &vcf::Header) -> Result<(), EvalError> {
    let missing: Vec<String> = pedigree
        .individual_ids()
        .filter(|id| !header.contains_sample(id))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(EvalError::Consistency {
        missing,
        pedigree: pedigree.individual_ids().map(str::to_string).collect(),
        stream: header.samples().map(str::to_string).collect(),
    })
}

/// The single-pass evaluation engine.
///
/// Holds the read-only unit set and threshold plus one `Counter` per
/// analysis child. Each incoming record is fully processed before the
/// next is read; no variant or genotype data survives the step.
pub struct StreamEvaluator {
    units: Vec<AnalysisUnit>,
    analysis_ids: Vec<String>,
    gq_threshold: u32,
    counters: HashMap<String, Counter>,
    child_order: Vec<String>,
}

impl StreamEvaluator {
    pub fn new(units: Vec<AnalysisUnit>, gq_threshold: u32) -> Self {
        let mut analysis_ids: Vec<String> = Vec::new();
        let mut counters = HashMap::new();
        let mut child_order = Vec::new();

        for unit in &units {
            for id in unit.members() {
                if !analysis_ids.iter().any(|known| known == id) {
                    analysis_ids.push(id.to_string());
                }
            }
            let child = unit.child();
            if !counters.contains_key(child) {
                counters.insert(child.to_string(), Counter::default());
                child_order.push(child.to_string());
            }
        }

        info!(
            "Individuals included in analysis: {}",
            analysis_ids.join(",")
        );

        Self {
            units,
            analysis_ids,
            gq_threshold,
            counters,
            child_order,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Evaluate one variant record against every unit.
    pub fn process(
        &mut self,
        record: &vcf::Record,
        header: &vcf::Header,
    ) -> Result<(), EvalError> {
        debug!("Checking genotype calls for variant {}", record.variant_id());

        let genotypes = extract_genotypes(
            record,
            header,
            self.analysis_ids.iter().map(String::as_str),
        )?;

        for unit in &self.units {
            let child = &genotypes[unit.child()];
            if !child.has_variant {
                continue;
            }

            let (gate_passes, violated) = match unit {
                AnalysisUnit::Trio(trio) => {
                    let mother = &genotypes[&trio.mother];
                    let father = &genotypes[&trio.father];
                    (
                        all_high_quality([child, mother, father], self.gq_threshold),
                        mendelian_violation(child, mother, father),
                    )
                }
                // Duo mode gates on the child's quality alone: the check
                // asks whether the father shares the calls trusted in the
                // child, so his call quality must not mask non-sharing.
                AnalysisUnit::Duo(duo) => (
                    all_high_quality([child], self.gq_threshold),
                    common_variant(child, &genotypes[&duo.father]),
                ),
            };

            if gate_passes {
                // Counters for every unit child are registered in new().
                if let Some(counter) = self.counters.get_mut(unit.child()) {
                    counter.number_calls += 1;
                    if violated {
                        counter.violations += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Convert counters into reportable records, in unit-discovery order.
    pub fn finalize(self) -> Vec<IndividualResult> {
        self.child_order
            .into_iter()
            .map(|child| {
                let counter = self.counters[&child];
                IndividualResult {
                    ind_id: child,
                    fraction: fraction(counter.violations, counter.number_calls),
                    violations: counter.violations,
                    number_calls: counter.number_calls,
                }
            })
            .collect()
    }
}

fn fraction(violations: u64, number_calls: u64) -> Option<f64> {
    if number_calls == 0 {
        return None;
    }
    let raw = violations as f64 / number_calls as f64;
    Some((raw * 1000.0).round() / 1000.0)
}

/// Run one full analysis pass over a variant stream.
///
/// Reads the header, checks pedigree/stream consistency, derives the
/// mode's units and streams every record through the evaluator.
pub fn analyze<R: BufRead>(
    input: R,
    pedigree: &Pedigree,
    mode: Mode,
    gq_threshold: u32,
) -> Result<Vec<IndividualResult>, EvalError> {
    let mut reader = vcf::Reader::new(input);
    let header = reader.read_header()?;
    check_individuals(pedigree, &header)?;

    let mut evaluator = StreamEvaluator::new(mode.build_units(pedigree), gq_threshold);
    if evaluator.is_empty() {
        warn!("pedigree yields no analysis units; the report will be empty");
    }
    for result in reader.records(&header) {
        let record = result?;
        evaluator.process(&record, &header)?;
    }

    Ok(evaluator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ped::Pedigree;

    const TRIO_PED: &str = "\
fam1 proband dad mom 2 2
fam1 mom 0 0 2 1
fam1 dad 0 0 1 1
";

    const VCF_HEADER: &str = "\
##fileformat=VCFv4.2
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tproband\tmom\tdad
";

    fn pedigree() -> Pedigree {
        Pedigree::from_reader(TRIO_PED.as_bytes()).expect("parse pedigree")
    }

    fn variant(pos: u32, proband: &str, mom: &str, dad: &str) -> String {
        format!("1\t{pos}\t.\tA\tG\t50\tPASS\t.\tGT:GQ\t{proband}\t{mom}\t{dad}\n")
    }

    #[test]
    fn mendel_counts_errors_per_child() {
        // Heterozygous child, neither parent carries: an error.
        // Homozygous child, both parents carry: clean.
        let stream = format!(
            "{VCF_HEADER}{}{}",
            variant(100, "0/1:30", "0/0:25", "0/0:25"),
            variant(200, "1/1:30", "0/1:30", "0/1:30"),
        );
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Mendel, 20).expect("analyze");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ind_id, "proband");
        assert_eq!(results[0].number_calls, 2);
        assert_eq!(results[0].violations, 1);
        assert_eq!(results[0].fraction, Some(0.5));
    }

    #[test]
    fn low_quality_member_drops_the_call() {
        let stream = format!(
            "{VCF_HEADER}{}",
            variant(100, "0/1:10", "0/0:25", "0/0:25"),
        );
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Mendel, 20).expect("analyze");
        assert_eq!(results[0].number_calls, 0);
        assert_eq!(results[0].violations, 0);
        assert_eq!(results[0].fraction, None);
    }

    #[test]
    fn trio_gate_covers_parents_too() {
        // Child call is fine but the mother's is below threshold.
        let stream = format!(
            "{VCF_HEADER}{}",
            variant(100, "0/1:30", "0/0:5", "0/0:25"),
        );
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Mendel, 20).expect("analyze");
        assert_eq!(results[0].number_calls, 0);
    }

    #[test]
    fn father_mode_gates_child_only() {
        // Father GQ is garbage but the call still counts, and it is shared.
        let stream = format!(
            "{VCF_HEADER}{}",
            variant(100, "0/1:25", "0/0:30", "0/1:1"),
        );
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Father, 20).expect("analyze");
        let proband = results.iter().find(|r| r.ind_id == "proband").unwrap();
        assert_eq!(proband.number_calls, 1);
        assert_eq!(proband.violations, 1);
        assert_eq!(proband.fraction, Some(1.0));
    }

    #[test]
    fn non_carrying_child_is_not_counted() {
        let stream = format!(
            "{VCF_HEADER}{}",
            variant(100, "0/0:30", "0/1:30", "0/1:30"),
        );
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Mendel, 20).expect("analyze");
        assert_eq!(results[0].number_calls, 0);
    }

    #[test]
    fn consistency_error_lists_both_sets() {
        let header_missing_mom = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tproband\tdad
";
        let err = analyze(
            header_missing_mom.as_bytes(),
            &pedigree(),
            Mode::Mendel,
            20,
        )
        .unwrap_err();
        let EvalError::Consistency {
            missing,
            pedigree,
            stream,
        } = err
        else {
            panic!("expected consistency error");
        };
        assert_eq!(missing, ["mom"]);
        assert_eq!(pedigree.len(), 3);
        assert_eq!(stream, ["proband", "dad"]);
    }

    #[test]
    fn counter_invariant_holds_over_any_prefix() {
        let mut stream = String::from(VCF_HEADER);
        for pos in 0..50 {
            // Alternate clean and violating calls.
            if pos % 2 == 0 {
                stream.push_str(&variant(pos, "0/1:30", "0/0:30", "0/0:30"));
            } else {
                stream.push_str(&variant(pos, "0/1:30", "0/1:30", "0/0:30"));
            }
        }
        let results =
            analyze(stream.as_bytes(), &pedigree(), Mode::Mendel, 20).expect("analyze");
        assert!(results[0].violations <= results[0].number_calls);
        assert_eq!(results[0].number_calls, 50);
        assert_eq!(results[0].violations, 25);
    }
}
