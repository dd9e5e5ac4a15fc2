use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::error::{GradeError, Result};
use crate::models::{
    Aggregation, PivotTable, StudentGpa, Table, Value, CLASS, CLASS_AVERAGE, EXAM_COLUMNS,
    FIRST, FULL_NAME, GPA, LAST,
};

/// Replaces `FIRST`/`LAST` with a leading `FULL_NAME` column.
///
/// Names are joined with a single space, untrimmed. The remaining columns
/// keep their order.
pub fn derive_full_name(table: &Table) -> Result<Table> {
    let first = table.require(FIRST)?;
    let last = table.require(LAST)?;
    let keep: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != first && *i != last && name.as_str() != FULL_NAME)
        .map(|(i, _)| i)
        .collect();

    let mut columns = vec![FULL_NAME.to_string()];
    columns.extend(keep.iter().map(|&i| table.columns()[i].clone()));

    let mut derived = Table::new(columns);
    for row in table.rows() {
        let mut cells = Vec::with_capacity(keep.len() + 1);
        cells.push(Value::Text(format!("{} {}", row[first], row[last])));
        cells.extend(keep.iter().map(|&i| row[i].clone()));
        derived.push_row(cells);
    }

    Ok(derived)
}

/// Sets `CLASS_AVERAGE`, the mean of exactly four exam scores per row.
///
/// A `CLASS_AVERAGE` column already in the source is overwritten.
pub fn compute_class_average(table: &Table) -> Result<Table> {
    let mut exam_indices = [0usize; 4];
    for (slot, column) in exam_indices.iter_mut().zip(EXAM_COLUMNS) {
        *slot = table.require(column)?;
    }

    let mut averages = Vec::with_capacity(table.len());
    for (row_no, row) in table.rows().iter().enumerate() {
        let mut total = 0.0;
        for (&idx, column) in exam_indices.iter().zip(EXAM_COLUMNS) {
            total += numeric_cell(&row[idx], row_no + 1, column)?;
        }
        let average = total / EXAM_COLUMNS.len() as f64;
        if !average.is_finite() {
            return Err(GradeError::computation(
                row_no + 1,
                CLASS_AVERAGE,
                "overflows for these exam scores",
            ));
        }
        averages.push(Value::Number(average));
    }

    Ok(table.with_column(CLASS_AVERAGE, averages))
}

/// Sets `GPA`: each student's mean `CLASS_AVERAGE` over all of their
/// rows, broadcast back to every one of those rows.
///
/// Rows are weighted individually, so a class with more rows counts for
/// more of the GPA.
pub fn compute_gpa(table: &Table) -> Result<Table> {
    let name_idx = table.require(FULL_NAME)?;
    let avg_idx = table.require(CLASS_AVERAGE)?;

    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    let mut keyed = Vec::with_capacity(table.len());
    for (row_no, row) in table.rows().iter().enumerate() {
        let name = row[name_idx].to_string();
        let average = numeric_cell(&row[avg_idx], row_no + 1, CLASS_AVERAGE)?;
        let entry = groups.entry(name.clone()).or_insert((0.0, 0));
        entry.0 += average;
        entry.1 += 1;
        keyed.push(name);
    }
    debug!(students = groups.len(), "Grouped class averages by student");

    let gpas = keyed
        .iter()
        .map(|name| {
            let (total, count) = groups[name];
            Value::Number(total / count as f64)
        })
        .collect();

    Ok(table.with_column(GPA, gpas))
}

/// Pivots `value` into a `row_key` by `col_key` matrix.
///
/// Labels are sorted lexicographically. Duplicate pairs are averaged and
/// pairs with no rows stay `None`. An empty table yields an empty pivot.
pub fn pivot(table: &Table, row_key: &str, col_key: &str, value: &str) -> Result<PivotTable> {
    let row_idx = table.require(row_key)?;
    let col_idx = table.require(col_key)?;
    let value_idx = table.require(value)?;

    let mut result = PivotTable {
        index_name: row_key.to_string(),
        columns_name: col_key.to_string(),
        ..PivotTable::default()
    };

    if table.is_empty() {
        warn!(row_key, col_key, "No rows available to pivot");
        return Ok(result);
    }

    let mut cells: BTreeMap<String, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    let mut columns = BTreeSet::new();
    for (row_no, row) in table.rows().iter().enumerate() {
        let amount = numeric_cell(&row[value_idx], row_no + 1, value)?;
        let column = row[col_idx].to_string();
        let entry = cells
            .entry(row[row_idx].to_string())
            .or_default()
            .entry(column.clone())
            .or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
        columns.insert(column);
    }

    result.columns = columns.into_iter().collect();
    for (label, by_column) in cells {
        let data = result
            .columns
            .iter()
            .map(|c| by_column.get(c).map(|(total, count)| total / *count as f64))
            .collect();
        result.index.push(label);
        result.data.push(data);
    }

    Ok(result)
}

/// Runs the full pipeline: full name, class average, GPA, then the
/// student-by-class pivot of class averages.
pub fn run(table: &Table) -> Result<Aggregation> {
    let named = derive_full_name(table)?;
    let averaged = compute_class_average(&named)?;
    let records = compute_gpa(&averaged)?;
    let pivot = pivot(&records, FULL_NAME, CLASS, CLASS_AVERAGE)?;

    info!(
        records = records.len(),
        students = pivot.index.len(),
        classes = pivot.columns.len(),
        "Grades aggregated"
    );

    Ok(Aggregation { records, pivot })
}

/// One entry per student, sorted by name, read from an augmented table.
pub fn student_summaries(records: &Table) -> Result<Vec<StudentGpa>> {
    let name_idx = records.require(FULL_NAME)?;
    let gpa_idx = records.require(GPA)?;

    let mut students: BTreeMap<String, StudentGpa> = BTreeMap::new();
    for (row_no, row) in records.rows().iter().enumerate() {
        let gpa = numeric_cell(&row[gpa_idx], row_no + 1, GPA)?;
        let full_name = row[name_idx].to_string();
        students
            .entry(full_name.clone())
            .or_insert_with(|| StudentGpa {
                full_name,
                gpa,
                record_count: 0,
            })
            .record_count += 1;
    }

    Ok(students.into_values().collect())
}

fn numeric_cell(cell: &Value, row: usize, column: &str) -> Result<f64> {
    if cell.is_empty() {
        return Err(GradeError::computation(row, column, "is missing"));
    }
    cell.to_f64().ok_or_else(|| {
        GradeError::computation(row, column, format!("is not numeric: \"{cell}\""))
    })
}
