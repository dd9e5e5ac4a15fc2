//! Grade aggregation: full names, per-record class averages, per-student
//! GPA and a student-by-class pivot, plus a synthetic grade generator.

pub mod aggregate;
pub mod error;
pub mod generate;
pub mod load;
pub mod models;
pub mod report;

pub use aggregate::{
    compute_class_average, compute_gpa, derive_full_name, pivot, run, student_summaries,
};
pub use error::{GradeError, Result};
pub use load::{load_csv, load_path, load_records, read_records};
pub use models::{Aggregation, GradeRecord, PivotTable, StudentGpa, Table, Value};
