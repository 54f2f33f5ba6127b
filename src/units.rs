use tracing::{info, warn};

use crate::ped::{Pedigree, Sex};

/// A child with both biological parents, for Mendelian checking.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trio {
    pub child: String,
    pub mother: String,
    pub father: String,
}

/// A child with a recorded father, for variant-sharing checking.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Duo {
    pub child: String,
    pub father: String,
}

/// The unit a single evaluation pass iterates over. Trio and duo passes
/// never mix; a run carries one kind only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AnalysisUnit {
    Trio(Trio),
    Duo(Duo),
}

impl AnalysisUnit {
    pub fn child(&self) -> &str {
        match self {
            Self::Trio(trio) => &trio.child,
            Self::Duo(duo) => &duo.child,
        }
    }

    /// All ids whose genotypes the unit needs per variant.
    pub fn members(&self) -> Vec<&str> {
        match self {
            Self::Trio(trio) => vec![&trio.child, &trio.mother, &trio.father],
            Self::Duo(duo) => vec![&duo.child, &duo.father],
        }
    }
}

/// Derive one trio per family grouping that resolves cleanly.
///
/// A grouping resolves when exactly one member is pointed at by another
/// member's parent reference (the child) and, of the remaining two, exactly
/// one is male (the father). Groupings that do not resolve are skipped with
/// a warning, never an error.
pub fn build_trios(pedigree: &Pedigree) -> Vec<Trio> {
    let mut trios = Vec::new();
    for family in pedigree.families() {
        for group in family.trio_groups(pedigree) {
            match resolve_trio(pedigree, &group) {
                Some(trio) => {
                    info!("Trio found: {}, {}, {}", trio.child, trio.mother, trio.father);
                    trios.push(trio);
                }
                None => {
                    warn!(
                        "family {}: members {:?} do not resolve into a trio, skipping",
                        family.id, group
                    );
                }
            }
        }
    }
    trios
}

fn resolve_trio(pedigree: &Pedigree, group: &[String; 3]) -> Option<Trio> {
    let mut child = None;
    let mut mother = None;
    let mut father = None;

    for id in group {
        let individual = pedigree.get(id)?;
        let is_parent_of_member = group.iter().any(|other| {
            pedigree.get(other).is_some_and(|o| {
                o.mother.as_deref() == Some(id) || o.father.as_deref() == Some(id)
            })
        });
        let slot = if !is_parent_of_member {
            &mut child
        } else if individual.sex == Sex::Male {
            &mut father
        } else {
            &mut mother
        };
        if slot.replace(id.clone()).is_some() {
            return None;
        }
    }

    let (child, mother, father) = (child?, mother?, father?);
    if child == mother || child == father || mother == father {
        return None;
    }
    Some(Trio {
        child,
        mother,
        father,
    })
}

/// Derive one duo per individual whose father reference is not a founder
/// sentinel, in pedigree file order.
pub fn build_duos(pedigree: &Pedigree) -> Vec<Duo> {
    let mut duos = Vec::new();
    for id in pedigree.individual_ids() {
        let Some(individual) = pedigree.get(id) else {
            continue;
        };
        if let Some(father) = &individual.father {
            info!("Duo found: {}, {}", id, father);
            duos.push(Duo {
                child: id.to_string(),
                father: father.clone(),
            });
        }
    }
    duos
}
