use std::fmt::Write;

use serde_json::{json, Map};

use crate::aggregate::student_summaries;
use crate::error::Result;
use crate::models::{Aggregation, PivotTable, Table, Value};

fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{n:.2}"),
        other => other.to_string(),
    }
}

fn format_cell(cell: Option<f64>) -> String {
    cell.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let mut push_line = |cells: &[String]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(output, "{}", line.join("  ").trim_end());
    };

    push_line(header);
    for row in rows {
        push_line(row);
    }
    output
}

/// Plain-text rendering of an augmented record table.
pub fn render_records(table: &Table) -> String {
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(format_value).collect())
        .collect();
    render_grid(table.columns(), &rows)
}

/// Plain-text rendering of a pivot. Unobserved cells are left blank.
pub fn render_pivot(pivot: &PivotTable) -> String {
    if pivot.is_empty() {
        return "No grades to summarize.\n".to_string();
    }

    let mut header = vec![pivot.index_name.clone()];
    header.extend(pivot.columns.iter().cloned());
    let rows: Vec<Vec<String>> = pivot
        .index
        .iter()
        .zip(&pivot.data)
        .map(|(label, cells)| {
            let mut row = vec![label.clone()];
            row.extend(cells.iter().copied().map(format_cell));
            row
        })
        .collect();
    render_grid(&header, &rows)
}

pub fn build_report(source: &str, aggregation: &Aggregation) -> Result<String> {
    let students = student_summaries(&aggregation.records)?;
    let pivot = &aggregation.pivot;

    let mut output = String::new();
    let _ = writeln!(output, "# Student Grade Report");
    let _ = writeln!(
        output,
        "Generated from {} ({} records, {} students, {} classes)",
        source,
        aggregation.records.len(),
        students.len(),
        pivot.columns.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Student GPA");

    if students.is_empty() {
        let _ = writeln!(output, "No students found in this source.");
    } else {
        for student in &students {
            let _ = writeln!(
                output,
                "- {}: GPA {:.2} across {} records",
                student.full_name, student.gpa, student.record_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Averages");

    if pivot.is_empty() {
        let _ = writeln!(output, "No class averages for this source.");
    } else {
        let _ = writeln!(
            output,
            "| {} | {} |",
            pivot.index_name,
            pivot.columns.join(" | ")
        );
        let _ = writeln!(output, "|{}", "---|".repeat(pivot.columns.len() + 1));
        for (label, cells) in pivot.index.iter().zip(&pivot.data) {
            let cells: Vec<String> = cells.iter().copied().map(format_cell).collect();
            let _ = writeln!(output, "| {} | {} |", label, cells.join(" | "));
        }
    }

    Ok(output)
}

pub fn write_records_csv<W: std::io::Write>(writer: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::to_string))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_pivot_csv<W: std::io::Write>(writer: W, pivot: &PivotTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header = vec![pivot.index_name.clone()];
    header.extend(pivot.columns.iter().cloned());
    writer.write_record(&header)?;
    for (label, cells) in pivot.index.iter().zip(&pivot.data) {
        let mut row = vec![label.clone()];
        row.extend(cells.iter().map(|c| c.map(|v| v.to_string()).unwrap_or_default()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Text(s) => json!(s),
        Value::Number(n) => json!(n),
        Value::Empty => serde_json::Value::Null,
    }
}

/// Records as an array of objects keyed by column name.
pub fn records_json(table: &Table) -> serde_json::Value {
    let records: Vec<serde_json::Value> = table
        .rows()
        .iter()
        .map(|row| {
            let object: Map<String, serde_json::Value> = table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().map(value_json))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(records)
}

/// Pivot as `{ index, columns, data }` with `null` for unobserved cells.
pub fn pivot_json(pivot: &PivotTable) -> serde_json::Value {
    json!({
        "index_name": pivot.index_name,
        "columns_name": pivot.columns_name,
        "index": pivot.index,
        "columns": pivot.columns,
        "data": pivot.data,
    })
}

pub fn aggregation_json(aggregation: &Aggregation) -> Result<String> {
    let document = json!({
        "records": records_json(&aggregation.records),
        "pivot": pivot_json(&aggregation.pivot),
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::run;
    use crate::load::load_csv;

    const SOURCE: &str = "\
FIRST,LAST,CLASS,EXAM_1_GRADE,EXAM_2_GRADE,EXAM_3_GRADE,EXAM_4_GRADE
Bill,Edwards,math,90,80,70,60
Bill,Edwards,spanish,100,90,80,90
David,Chen,chemistry,50,60,70,80
";

    fn sample() -> Aggregation {
        run(&load_csv(SOURCE.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn pivot_rendering_leaves_gaps_blank() {
        let text = render_pivot(&sample().pivot);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("FULL_NAME"));
        assert!(lines[0].contains("chemistry"));
        assert!(lines[1].starts_with("Bill Edwards"));
        assert!(lines[1].contains("75.00"));
        assert!(lines[1].contains("90.00"));
        assert!(lines[2].ends_with("65.00"));
    }

    #[test]
    fn empty_pivot_renders_notice() {
        assert_eq!(render_pivot(&PivotTable::default()), "No grades to summarize.\n");
    }

    #[test]
    fn record_rendering_has_header_and_rows() {
        let text = render_records(&sample().records);
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().next().unwrap().ends_with("GPA"));
    }

    #[test]
    fn report_lists_students_and_class_table() {
        let report = build_report("student_grades.csv", &sample()).unwrap();

        assert!(report.starts_with("# Student Grade Report"));
        assert!(report.contains("3 records, 2 students, 3 classes"));
        assert!(report.contains("- Bill Edwards: GPA 82.50 across 2 records"));
        assert!(report.contains("- David Chen: GPA 65.00 across 1 records"));
        assert!(report.contains("| FULL_NAME | chemistry | math | spanish |"));
        assert!(report.contains("| David Chen | 65.00 |  |  |"));
    }

    #[test]
    fn pivot_csv_leaves_missing_cells_empty() {
        let mut buffer = Vec::new();
        write_pivot_csv(&mut buffer, &sample().pivot).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "FULL_NAME,chemistry,math,spanish\nBill Edwards,,75,90\nDavid Chen,65,,\n"
        );
    }

    #[test]
    fn records_csv_round_trips_through_loader_columns() {
        let mut buffer = Vec::new();
        write_records_csv(&mut buffer, &sample().records).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with(
            "FULL_NAME,CLASS,EXAM_1_GRADE,EXAM_2_GRADE,EXAM_3_GRADE,EXAM_4_GRADE,CLASS_AVERAGE,GPA\n"
        ));
        assert!(text.contains("Bill Edwards,math,90,80,70,60,75,82.5\n"));
    }

    #[test]
    fn pivot_json_lays_out_index_columns_and_data() {
        let document = pivot_json(&sample().pivot);

        assert_eq!(document["index_name"], "FULL_NAME");
        assert_eq!(document["columns_name"], "CLASS");
        assert_eq!(document["index"], json!(["Bill Edwards", "David Chen"]));
        assert_eq!(document["columns"], json!(["chemistry", "math", "spanish"]));
        assert_eq!(document["data"][0], json!([null, 75.0, 90.0]));
        assert_eq!(document["data"][1], json!([65.0, null, null]));
    }

    #[test]
    fn json_uses_null_for_unobserved_cells() {
        let text = aggregation_json(&sample()).unwrap();
        let document: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(document["records"][0]["FULL_NAME"], "Bill Edwards");
        assert_eq!(document["records"][0]["CLASS_AVERAGE"], 75.0);
        assert_eq!(document["pivot"]["index"][1], "David Chen");
        assert!(document["pivot"]["data"][1][1].is_null());
        assert_eq!(document["pivot"]["data"][1][0], 65.0);
    }
}
