use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{GradeError, Result};

pub const SUBJECTS: [&str; 3] = ["math", "chemistry", "spanish"];

const STUDENTS: [&str; 7] = [
    "Bill Edwards",
    "David Chen",
    "William Chen",
    "Rafferty Russell",
    "Jason Ramirez",
    "Fred Fernando",
    "杨作亮 AlexYang",
];

const GRADE_FLOORS: [u32; 5] = [90, 80, 70, 60, 0];

fn assignments(subject: &str) -> Option<&'static [&'static str]> {
    match subject {
        "math" => Some(&[
            "Plot your address on a coordinate plane",
            "Normalize a data set of your choosing",
            "Calculate the area under a bell curve",
        ]),
        "chemistry" => Some(&["ATMC NMBRS", "PLYMER & ALDEHYDE", "ELECTRON CONFIG"]),
        "spanish" => Some(&[
            "¡Hola! ¿Cómo se llama?",
            "¿A dónde vamos hoy?",
            "Describe a tu familia",
            "Verbos importantes: ser, estar, haber",
        ]),
        _ => None,
    }
}

/// One synthetic grade row, in the column layout the aggregator reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedRow {
    #[serde(rename = "FIRST")]
    pub first_name: String,
    #[serde(rename = "LAST")]
    pub last_name: String,
    #[serde(rename = "CLASS")]
    pub class_name: String,
    #[serde(rename = "ASSIGNMENT_NO")]
    pub assignment_no: usize,
    #[serde(rename = "ASSIGNMENT_DESC")]
    pub assignment_desc: String,
    #[serde(rename = "EXAM_1_GRADE")]
    pub exam_1: u32,
    #[serde(rename = "EXAM_2_GRADE")]
    pub exam_2: u32,
    #[serde(rename = "EXAM_3_GRADE")]
    pub exam_3: u32,
    #[serde(rename = "EXAM_4_GRADE")]
    pub exam_4: u32,
    #[serde(rename = "MAKEUP")]
    pub makeup: bool,
    #[serde(rename = "DATE_DUE")]
    pub date_due: NaiveDate,
    #[serde(rename = "DATE_SUBMIT")]
    pub date_submit: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub makeups: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            makeups: 0,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn draw_grade<R: Rng>(rng: &mut R, floor: u32) -> u32 {
    if floor == 0 {
        rng.gen_range(0..60)
    } else {
        rng.gen_range(floor..floor + 10)
    }
}

fn pick<R: Rng, T: Copy>(rng: &mut R, options: &[T]) -> T {
    *options.choose(rng).unwrap_or(&options[0])
}

fn split_name(student: &str) -> (String, String) {
    match student.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (student.to_string(), String::new()),
    }
}

/// Builds up to `config.rows` rows for `subject`, cycling through the
/// roster and moving to the next assignment after each full pass.
///
/// The first `config.makeups` rows each gain a makeup row with fresh grades.
pub fn build_rows<R: Rng>(
    subject: &str,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Vec<GeneratedRow>> {
    let descriptions =
        assignments(subject).ok_or_else(|| GradeError::UnknownSubject(subject.to_string()))?;

    let floors: Vec<u32> = STUDENTS
        .iter()
        .map(|_| pick(rng, &GRADE_FLOORS))
        .collect();
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).expect("2022-01-01 is a valid date");
    let mut makeups_left = config.makeups;
    let mut rows = Vec::with_capacity(config.rows + config.makeups);

    for n in 0..config.rows {
        let student_idx = n % STUDENTS.len();
        let assignment_no = n / STUDENTS.len() + 1;
        let Some(description) = descriptions.get(assignment_no - 1) else {
            warn!(
                subject,
                requested = config.rows,
                generated = n,
                "More rows requested than student and assignment combinations"
            );
            break;
        };

        let (first_name, last_name) = split_name(STUDENTS[student_idx]);
        let floor = floors[student_idx];
        let date_due = start + Duration::days(pick(rng, &[0, 365]));
        let date_submit = date_due + Duration::days(pick(rng, &[0, 14]));

        let mut row = GeneratedRow {
            first_name,
            last_name,
            class_name: subject.to_string(),
            assignment_no,
            assignment_desc: description.to_string(),
            exam_1: draw_grade(rng, floor),
            exam_2: draw_grade(rng, floor),
            exam_3: draw_grade(rng, floor),
            exam_4: draw_grade(rng, floor),
            makeup: false,
            date_due,
            date_submit,
        };
        rows.push(row.clone());

        if makeups_left > 0 {
            row.exam_1 = draw_grade(rng, floor);
            row.exam_2 = draw_grade(rng, floor);
            row.exam_3 = draw_grade(rng, floor);
            row.exam_4 = draw_grade(rng, floor);
            row.makeup = true;
            row.date_submit = date_submit + Duration::days(pick(rng, &[1, 14]));
            rows.push(row);
            makeups_left -= 1;
        }
    }

    Ok(rows)
}

/// Writes `<dir>/<subject>.csv` and returns its path.
pub fn write_subject<R: Rng>(
    dir: &Path,
    subject: &str,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<PathBuf> {
    let rows = build_rows(subject, config, rng)?;
    let path = dir.join(format!("{subject}.csv"));

    let mut writer = csv::Writer::from_path(&path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Synthetic grades written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::run;
    use crate::load::load_path;

    fn config(rows: usize, makeups: usize) -> GeneratorConfig {
        GeneratorConfig {
            rows,
            makeups,
            seed: Some(7),
        }
    }

    #[test]
    fn unknown_subject_is_rejected() {
        let cfg = config(5, 0);
        let err = build_rows("history", &cfg, &mut cfg.rng()).unwrap_err();
        assert!(matches!(err, GradeError::UnknownSubject(s) if s == "history"));
    }

    #[test]
    fn rows_cycle_students_then_assignments() {
        let cfg = config(9, 0);
        let rows = build_rows("math", &cfg, &mut cfg.rng()).unwrap();

        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].first_name, "Bill");
        assert_eq!(rows[0].last_name, "Edwards");
        assert_eq!(rows[6].first_name, "杨作亮");
        assert_eq!(rows[6].last_name, "AlexYang");
        assert_eq!(rows[6].assignment_no, 1);
        assert_eq!(rows[7].first_name, "Bill");
        assert_eq!(rows[7].assignment_no, 2);
        assert_eq!(rows[7].assignment_desc, "Normalize a data set of your choosing");
        assert!(rows.iter().all(|r| r.class_name == "math" && !r.makeup));
    }

    #[test]
    fn generation_stops_when_combinations_run_out() {
        let cfg = config(100, 0);
        let rows = build_rows("chemistry", &cfg, &mut cfg.rng()).unwrap();
        assert_eq!(rows.len(), STUDENTS.len() * 3);
    }

    #[test]
    fn makeups_follow_their_original_row() {
        let cfg = config(4, 2);
        let rows = build_rows("spanish", &cfg, &mut cfg.rng()).unwrap();

        assert_eq!(rows.len(), 6);
        assert!(!rows[0].makeup);
        assert!(rows[1].makeup);
        assert_eq!(rows[1].first_name, rows[0].first_name);
        assert_eq!(rows[1].date_due, rows[0].date_due);
        assert!(rows[1].date_submit > rows[0].date_submit);
        assert!(rows[3].makeup);
        assert!(rows[4..].iter().all(|r| !r.makeup));
    }

    #[test]
    fn grades_and_dates_stay_in_range() {
        let cfg = config(21, 5);
        let rows = build_rows("math", &cfg, &mut cfg.rng()).unwrap();
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();

        for row in &rows {
            for grade in [row.exam_1, row.exam_2, row.exam_3, row.exam_4] {
                assert!(grade < 100);
            }
            let offset = (row.date_due - start).num_days();
            assert!(offset == 0 || offset == 365);
            assert!(row.date_submit >= row.date_due);
        }
    }

    #[test]
    fn same_seed_same_rows() {
        let cfg = config(10, 3);
        let first = build_rows("math", &cfg, &mut cfg.rng()).unwrap();
        let second = build_rows("math", &cfg, &mut cfg.rng()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn written_file_feeds_the_aggregator() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = config(14, 1);
        let path = write_subject(dir.path(), "spanish", &cfg, &mut cfg.rng()).unwrap();
        assert_eq!(path, dir.path().join("spanish.csv"));

        let table = load_path(&path).unwrap();
        assert_eq!(table.len(), 15);
        let aggregation = run(&table).unwrap();
        assert_eq!(aggregation.pivot.columns, vec!["spanish"]);
        assert_eq!(aggregation.pivot.index.len(), STUDENTS.len());
    }
}
