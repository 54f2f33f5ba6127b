#![doc = include_str!("../README.md")]

pub mod cli;
pub mod evaluate;
pub mod genotype;
pub mod ped;
pub mod report;
pub mod smart_reader;
pub mod units;
pub mod vcf;

pub use evaluate::{EvalError, IndividualResult, Mode, StreamEvaluator, analyze};
pub use genotype::Genotype;
pub use ped::Pedigree;
