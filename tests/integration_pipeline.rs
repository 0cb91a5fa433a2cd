//! End-to-end test of both workflows over a local folder store
//!
//! Builds the folder layout of a real deployment in a temporary directory:
//! a raw planning export, a macro workbook holding the directory sheet below
//! a banner row, then runs the first run and the category extraction and
//! reads the produced workbooks back.

use chrono::NaiveDate;
use cpw_reconciler::store::DocumentStore;
use cpw_reconciler::workbook;
use cpw_reconciler::{CpwError, LocalFolderStore, PipelineConfig, PipelineRunner};
use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PLANNING: &str = "Project Financial Plan (PFP)";
const ARCHIVE: &str = "Project Financial Plan (PFP)/OLD PFP";
const DIRECTORY: &str = "Workbook Structure";
const OUTPUT: &str = "02 GBA Workbooks";

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn write_planning_export(root: &Path) {
    let raw = df!(
        "Project Number" => &[100i64, 100, 200, 300, 400, 500],
        "Project Name" => &["Bridge", "Bridge", "Tunnel", "Depot", "Yard", "Port"],
        "Employee Name" => &[
            Some("Lee, Sam"),
            Some("Lee, Sam"),
            None,
            Some("Labor Cost, Conversion Employee"),
            Some("Diaz, Ana"),
            Some("Okafor, Tim"),
        ],
        "Resource" => &["Lee, Sam", "Lee, Sam", "Vacant", "Conversion", "Diaz, Ana", "Okafor, Tim"],
        "Expenditure Organization Name" => &[
            "North Mobility: Highways",
            "North Mobility: Highways",
            "South PLA: Towns",
            "Central EF",
            "West Places: Parks",
            "Finance: Treasury",
        ]
    )
    .unwrap();

    let folder = root.join(PLANNING);
    fs::create_dir_all(&folder).unwrap();
    let bytes = workbook::encode("export.xlsx", &raw).unwrap();
    fs::write(folder.join("export.xlsx"), bytes).unwrap();
}

/// Directory sheet as maintained by hand: banner row, multi-line headers,
/// and a vacant position without a person number
fn write_directory_workbook(root: &Path) {
    let mut book = Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Checker").unwrap();

    sheet.write_string(0, 0, "Workbook structure - do not edit").unwrap();
    let headers = [
        "Name",
        "Person Number\n(from Department Tab)",
        "File Name",
        "Department Name",
        "Department Manager",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(1, col as u16, *header).unwrap();
    }

    let rows: [(&str, Option<f64>, &str, &str, &str); 4] = [
        ("Lee, Sam", Some(501.0), "Lee.xlsx", "Roads", "Kim"),
        ("Diaz, Ana", Some(502.0), "Diaz.xlsx", "Parks", "Ode"),
        ("Okafor, Tim", Some(503.0), "Okafor.xlsx", "Finance", "Ray"),
        ("Vacant Post", None, "none", "Roads", "Kim"),
    ];
    for (offset, (name, number, file, department, manager)) in rows.iter().enumerate() {
        let row = 2 + offset as u32;
        sheet.write_string(row, 0, *name).unwrap();
        if let Some(number) = number {
            sheet.write_number(row, 1, *number).unwrap();
        }
        sheet.write_string(row, 2, *file).unwrap();
        sheet.write_string(row, 3, *department).unwrap();
        sheet.write_string(row, 4, *manager).unwrap();
    }

    let folder = root.join(DIRECTORY);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("Structure.xlsm"), book.save_to_buffer().unwrap()).unwrap();
}

fn text_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    cpw_reconciler::schema::text_values(df, name).unwrap()
}

fn runner(root: &Path) -> PipelineRunner<LocalFolderStore> {
    let config = PipelineConfig::default().with_root(root.to_path_buf());
    PipelineRunner::new(LocalFolderStore::new(root), config).unwrap()
}

#[tokio::test]
async fn test_first_run_then_extract_categories() {
    let temp_dir = TempDir::new().unwrap();
    write_planning_export(temp_dir.path());
    write_directory_workbook(temp_dir.path());
    let runner = runner(temp_dir.path());

    let first = runner.first_run(run_date()).await.unwrap();
    assert_eq!(first.stats.input_rows, 6);
    assert_eq!(first.stats.output_rows, 3);
    assert!(
        temp_dir
            .path()
            .join(ARCHIVE)
            .join("Project Plan Analysis-continuous-2024-03-15.xlsx")
            .exists()
    );

    let report = runner.extract_categories(run_date()).await.unwrap();
    assert_eq!(report.directory_name, "Structure.xlsm");
    assert_eq!(report.joined_rows, 3);
    assert_eq!(report.unclassified_rows, 1);
    assert!(report.ambiguous.is_empty());

    let store = runner.store();
    let names = store.list_available_names(OUTPUT).await.unwrap();
    assert_eq!(
        names,
        vec![
            "CPW_Tool_EF_Main.xlsx",
            "CPW_Tool_MOB_Main.xlsx",
            "CPW_Tool_PLA_Main.xlsx",
            "CPW_Tool_RES_Main.xlsx",
            "CPW_Tool_SSC_Main.xlsx",
        ]
    );

    let mob = store
        .fetch_table(OUTPUT, "CPW_Tool_MOB_Main.xlsx")
        .await
        .unwrap();
    let headers: Vec<&str> = mob.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(
        headers,
        vec![
            "Oracle Date",
            "Index",
            "Unique Code",
            "Project Number",
            "Project Name",
            "Resource",
            "Expenditure Organization Name",
            "Person Number",
            "File Name",
            "Department Manager",
        ]
    );
    assert_eq!(text_column(&mob, "Oracle Date"), vec![Some("2024-03-15".to_string())]);
    assert_eq!(text_column(&mob, "Unique Code"), vec![Some("100 - Lee, Sam".to_string())]);
    assert_eq!(text_column(&mob, "Person Number"), vec![Some("501".to_string())]);

    let pla = store
        .fetch_table(OUTPUT, "CPW_Tool_PLA_Main.xlsx")
        .await
        .unwrap();
    assert_eq!(text_column(&pla, "Department Manager"), vec![Some("Ode".to_string())]);
}

#[tokio::test]
async fn test_extract_categories_without_archive_reports_no_data() {
    let temp_dir = TempDir::new().unwrap();
    write_directory_workbook(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join(ARCHIVE)).unwrap();
    let runner = runner(temp_dir.path());

    let error = runner.extract_categories(run_date()).await.unwrap_err();
    assert!(matches!(error, CpwError::NotFound { .. }));
}

#[tokio::test]
async fn test_first_run_on_corrupt_export_is_format_error() {
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path().join(PLANNING);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("export.xlsx"), b"not a zip archive").unwrap();
    let runner = runner(temp_dir.path());

    let error = runner.first_run(run_date()).await.unwrap_err();
    assert!(matches!(error, CpwError::Format { .. }));
}
