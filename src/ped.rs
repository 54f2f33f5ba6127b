use std::{
    collections::HashMap,
    io::{self, BufRead},
};

use thiserror::Error;

/// Sex as recorded in a PED file (`1` = male, `2` = female).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    fn from_ped_code(code: &str) -> Self {
        match code {
            "1" => Self::Male,
            "2" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// One individual from a pedigree file.
///
/// `mother`/`father` are `None` for founders (PED sentinel `0`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Individual {
    pub id: String,
    pub family: String,
    pub sex: Sex,
    pub mother: Option<String>,
    pub father: Option<String>,
}

impl Individual {
    pub fn is_founder(&self) -> bool {
        self.mother.is_none() && self.father.is_none()
    }
}

/// A named family: the ids of its members, in file order.
#[derive(Clone, Debug)]
pub struct Family {
    pub id: String,
    pub members: Vec<String>,
}

/// The full pedigree: families and individuals, read-only after load.
///
/// Families and individuals keep their file order so downstream unit
/// discovery (and therefore report ordering) is deterministic.
#[derive(Debug, Default)]
pub struct Pedigree {
    families: Vec<Family>,
    individuals: HashMap<String, Individual>,
    individual_order: Vec<String>,
}

impl Pedigree {
    /// Parse a pedigree from PED-formatted text.
    pub fn from_reader<R: BufRead>(input: R) -> Result<Self, ParseError> {
        let mut pedigree = Self::default();
        for result in Reader::new(input) {
            pedigree.insert(result?);
        }
        Ok(pedigree)
    }

    fn insert(&mut self, individual: Individual) {
        match self.families.iter_mut().find(|f| f.id == individual.family) {
            Some(family) => family.members.push(individual.id.clone()),
            None => self.families.push(Family {
                id: individual.family.clone(),
                members: vec![individual.id.clone()],
            }),
        }
        self.individual_order.push(individual.id.clone());
        self.individuals.insert(individual.id.clone(), individual);
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn get(&self, id: &str) -> Option<&Individual> {
        self.individuals.get(id)
    }

    /// Individual ids in file order.
    pub fn individual_ids(&self) -> impl Iterator<Item = &str> {
        self.individual_order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }
}

impl Family {
    /// Unordered three-member groupings, one per member whose recorded
    /// mother and father are both present in this family. Role resolution
    /// (who is the child) happens later, in unit building.
    pub fn trio_groups(&self, pedigree: &Pedigree) -> Vec<[String; 3]> {
        let mut groups = Vec::new();
        for id in &self.members {
            let Some(individual) = pedigree.get(id) else {
                continue;
            };
            if let (Some(mother), Some(father)) = (&individual.mother, &individual.father) {
                if self.members.contains(mother) && self.members.contains(father) {
                    groups.push([id.clone(), mother.clone(), father.clone()]);
                }
            }
        }
        groups
    }
}

/// Iterator over individuals in a PED text stream.
pub struct Reader<R> {
    inner: R,
    line: u64,
    buf: String,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R> Iterator for Reader<R>
where
    R: BufRead,
{
    type Item = Result<Individual, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let trimmed = self.buf.trim_end_matches(&['\n', '\r'][..]);
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }

                    return Some(parse_individual(trimmed).map_err(|kind| ParseError {
                        line: self.line,
                        raw: trimmed.to_string(),
                        kind,
                    }));
                }
                Err(e) => {
                    return Some(Err(ParseError {
                        line: self.line,
                        raw: String::new(),
                        kind: ParseErrorKind::Io(e),
                    }));
                }
            }
        }
    }
}

/// Errors that can arise while parsing a PED line.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    pub raw: String,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("I/O error")]
    Io(#[from] io::Error),
    #[error("expected at least five whitespace-delimited fields, found {0}")]
    FieldCount(usize),
}

fn parse_individual(line: &str) -> Result<Individual, ParseErrorKind> {
    // PED column order: family, individual, father, mother, sex, [phenotype].
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(ParseErrorKind::FieldCount(fields.len()));
    }

    Ok(Individual {
        family: fields[0].to_string(),
        id: fields[1].to_string(),
        father: parent_reference(fields[2]),
        mother: parent_reference(fields[3]),
        sex: Sex::from_ped_code(fields[4]),
    })
}

fn parent_reference(field: &str) -> Option<String> {
    if field == "0" || field == "." || field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIO_PED: &str = "\
#family\tid\tfather\tmother\tsex\tphenotype
fam1\tproband\tdad\tmom\t2\t2
fam1\tmom\t0\t0\t2\t1
fam1\tdad\t0\t0\t1\t1
";

    #[test]
    fn parse_basic_individual() {
        let individual = parse_individual("fam1\tproband\tdad\tmom\t2\t2").expect("parse");
        assert_eq!(individual.family, "fam1");
        assert_eq!(individual.id, "proband");
        assert_eq!(individual.father.as_deref(), Some("dad"));
        assert_eq!(individual.mother.as_deref(), Some("mom"));
        assert_eq!(individual.sex, Sex::Female);
    }

    #[test]
    fn founder_sentinel_is_none() {
        let individual = parse_individual("fam1 mom 0 0 2 1").expect("parse");
        assert!(individual.is_founder());
    }

    #[test]
    fn reader_skips_comments_and_blanks() {
        let pedigree = Pedigree::from_reader(TRIO_PED.as_bytes()).expect("parse pedigree");
        assert_eq!(pedigree.len(), 3);
        assert_eq!(pedigree.families().len(), 1);
        assert!(!pedigree.get("proband").unwrap().is_founder());
    }

    #[test]
    fn short_line_is_rejected() {
        let err = Pedigree::from_reader("fam1 child dad\n".as_bytes()).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ParseErrorKind::FieldCount(3)));
    }

    #[test]
    fn trio_groups_require_both_parents_in_family() {
        let pedigree = Pedigree::from_reader(TRIO_PED.as_bytes()).expect("parse pedigree");
        let groups = pedigree.families()[0].trio_groups(&pedigree);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0][0], "proband");

        // A duo-only family yields no trio grouping.
        let duo = "fam2 kid dad2 0 1 1\nfam2 dad2 0 0 1 1\n";
        let pedigree = Pedigree::from_reader(duo.as_bytes()).expect("parse pedigree");
        assert!(pedigree.families()[0].trio_groups(&pedigree).is_empty());
    }
}
