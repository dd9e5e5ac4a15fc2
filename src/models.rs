use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};

pub const FIRST: &str = "FIRST";
pub const LAST: &str = "LAST";
pub const CLASS: &str = "CLASS";
pub const EXAM_COLUMNS: [&str; 4] = [
    "EXAM_1_GRADE",
    "EXAM_2_GRADE",
    "EXAM_3_GRADE",
    "EXAM_4_GRADE",
];
pub const FULL_NAME: &str = "FULL_NAME";
pub const CLASS_AVERAGE: &str = "CLASS_AVERAGE";
pub const GPA: &str = "GPA";

/// Headers every grade source must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    FIRST,
    LAST,
    CLASS,
    EXAM_COLUMNS[0],
    EXAM_COLUMNS[1],
    EXAM_COLUMNS[2],
    EXAM_COLUMNS[3],
];

/// One input row: a student's four exam scores in one class.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradeRecord {
    #[serde(rename = "FIRST")]
    pub first_name: String,
    #[serde(rename = "LAST")]
    pub last_name: String,
    #[serde(rename = "CLASS")]
    pub class_name: String,
    #[serde(rename = "EXAM_1_GRADE")]
    pub exam_1: f64,
    #[serde(rename = "EXAM_2_GRADE")]
    pub exam_2: f64,
    #[serde(rename = "EXAM_3_GRADE")]
    pub exam_3: f64,
    #[serde(rename = "EXAM_4_GRADE")]
    pub exam_4: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl Value {
    /// Numeric reading of the cell. Text is parsed; blanks and non-finite
    /// values yield `None`.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
            Value::Empty => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn from_cell(raw: &str) -> Self {
        if raw.is_empty() {
            Value::Empty
        } else {
            Value::Text(raw.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Empty => Ok(()),
        }
    }
}

/// An ordered set of named columns with row-major cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from typed records, columns in header order.
    pub fn from_records(records: &[GradeRecord]) -> Self {
        let mut table = Table::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect());
        for record in records {
            table.push_row(vec![
                Value::Text(record.first_name.clone()),
                Value::Text(record.last_name.clone()),
                Value::Text(record.class_name.clone()),
                Value::Number(record.exam_1),
                Value::Number(record.exam_2),
                Value::Number(record.exam_3),
                Value::Number(record.exam_4),
            ]);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of `name`, or a schema error when the column is absent.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| GradeError::schema(name))
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Copy of the table with `name` set to `values`.
    ///
    /// An existing column of that name is overwritten in place; otherwise
    /// the column is appended last.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Table {
        debug_assert_eq!(values.len(), self.rows.len());
        let existing = self.column_index(name);
        let mut columns = self.columns.clone();
        if existing.is_none() {
            columns.push(name.to_string());
        }
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                match existing {
                    Some(idx) => row[idx] = value,
                    None => row.push(value),
                }
                row
            })
            .collect();
        Table { columns, rows }
    }
}

/// Student-by-class matrix of mean values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    pub index_name: String,
    pub columns_name: String,
    pub index: Vec<String>,
    pub columns: Vec<String>,
    /// `None` marks a pair with no source rows.
    pub data: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.index.iter().position(|i| i == row)?;
        let c = self.columns.iter().position(|i| i == column)?;
        self.data.get(r)?.get(c).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentGpa {
    pub full_name: String,
    pub gpa: f64,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub records: Table,
    pub pivot: PivotTable,
}
