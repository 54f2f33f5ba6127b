use std::collections::HashMap;

use thiserror::Error;

use crate::vcf::{Header, Record};

/// A single individual's call at a single position, reduced to the three
/// facts the inheritance checks need. Built fresh per (variant, individual)
/// and never kept across variants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Genotype {
    /// At least one non-reference allele was called.
    pub has_variant: bool,
    /// Both alleles are the same non-reference allele.
    pub homozygous_alt: bool,
    /// Call confidence; 0 when GQ is absent or unparseable.
    pub genotype_quality: f32,
}

/// Errors raised while building genotypes from a record. Fatal for the run.
#[derive(Debug, Error)]
pub enum GenotypeError {
    #[error(
        "sample {id} at {variant}: genotype column has {found} fields \
         against {expected} FORMAT keys"
    )]
    ArityMismatch {
        id: String,
        variant: String,
        expected: usize,
        found: usize,
    },
    #[error("sample {id} is not present in the variant stream header")]
    MissingSample { id: String },
}

/// Build a `Genotype` for every requested individual from one record.
///
/// Each individual's colon-joined column is zipped positionally against the
/// record's FORMAT keys; a component-count mismatch is an error, never a
/// partial genotype.
pub fn extract_genotypes<'a, I>(
    record: &Record,
    header: &Header,
    ids: I,
) -> Result<HashMap<String, Genotype>, GenotypeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: Vec<&str> = record.format().split(':').collect();
    let mut genotypes = HashMap::new();

    for id in ids {
        let column = record
            .sample(header, id)
            .ok_or_else(|| GenotypeError::MissingSample { id: id.to_string() })?;
        let values: Vec<&str> = column.split(':').collect();
        if values.len() != keys.len() {
            return Err(GenotypeError::ArityMismatch {
                id: id.to_string(),
                variant: record.variant_id(),
                expected: keys.len(),
                found: values.len(),
            });
        }
        genotypes.insert(id.to_string(), decode_genotype(&keys, &values));
    }

    Ok(genotypes)
}

fn decode_genotype(keys: &[&str], values: &[&str]) -> Genotype {
    let mut genotype = Genotype::default();
    for (key, value) in keys.iter().zip(values) {
        match *key {
            "GT" => {
                let (has_variant, homozygous_alt) = decode_gt(value);
                genotype.has_variant = has_variant;
                genotype.homozygous_alt = homozygous_alt;
            }
            "GQ" => {
                genotype.genotype_quality = value.parse().unwrap_or(0.0);
            }
            _ => {}
        }
    }
    genotype
}

/// Decode a GT string (`0/1`, `1|1`, `./.`, ...) into
/// (has_variant, homozygous_alt). Unknown alleles (`.`) never count as
/// variant; phasing is ignored.
fn decode_gt(gt: &str) -> (bool, bool) {
    let alleles: Vec<Option<u32>> = gt
        .split(|c| c == '/' || c == '|')
        .map(|allele| allele.parse::<u32>().ok())
        .collect();

    let has_variant = alleles.iter().any(|a| matches!(a, Some(i) if *i > 0));
    let homozygous_alt = match alleles.as_slice() {
        [Some(a), Some(b)] => a == b && *a > 0,
        _ => false,
    };

    (has_variant, homozygous_alt)
}

/// True iff every genotype's quality meets the threshold. Vacuously true
/// for an empty collection.
pub fn all_high_quality<'a, I>(genotypes: I, threshold: u32) -> bool
where
    I: IntoIterator<Item = &'a Genotype>,
{
    genotypes
        .into_iter()
        .all(|g| g.genotype_quality >= threshold as f32)
}

/// Mendelian-violation check for a trio. Only meaningful when the child
/// carries the variant; callers check `child.has_variant` first.
pub fn mendelian_violation(child: &Genotype, mother: &Genotype, father: &Genotype) -> bool {
    if child.homozygous_alt {
        // A homozygous-alternate child needs the variant in both parents.
        !(mother.has_variant && father.has_variant)
    } else {
        // Any other carrying child needs it in at least one parent.
        !(mother.has_variant || father.has_variant)
    }
}

/// Duo concordance: the father carries the variant the child carries.
/// Only meaningful when the child carries the variant.
pub fn common_variant(child: &Genotype, father: &Genotype) -> bool {
    child.has_variant && father.has_variant
}
