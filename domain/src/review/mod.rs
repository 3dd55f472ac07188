//! Doer-Critic review domain: checklists, grades and cycle records

pub mod checklist;
pub mod cycle;
pub mod grade;

pub use checklist::{Checklist, Criterion};
pub use cycle::ReviewCycle;
pub use grade::{Grade, GradeSource, ParsedGrade, parse_grade, parse_grade_detailed};
