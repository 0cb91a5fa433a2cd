//! Application constants for the CPW reconciler
//!
//! This module contains the fixed column names of the planning and directory
//! tables, the business sentinel values used while cleaning, and the default
//! naming conventions for datasets exchanged with the document store.

// =============================================================================
// Planning Table Columns
// =============================================================================

/// Column names read from the planning (PFP) export
pub mod planning {
    pub const PROJECT_NUMBER: &str = "Project Number";
    pub const PROJECT_NAME: &str = "Project Name";
    pub const EMPLOYEE_NAME: &str = "Employee Name";
    pub const RESOURCE: &str = "Resource";
    pub const EXPENDITURE_ORGANIZATION: &str = "Expenditure Organization Name";

    /// Derived composite key: "{Project Number} - {Employee Name}"
    pub const UNIQUE_CODE: &str = "Unique Code";

    /// Separator placed between the two halves of the unique code
    pub const UNIQUE_CODE_SEPARATOR: &str = " - ";
}

// =============================================================================
// Directory Table Columns
// =============================================================================

/// Column names read from the workbook structure (directory) sheet
pub mod directory {
    pub const NAME: &str = "Name";
    pub const PERSON_NUMBER: &str = "Person Number";
    pub const FILE_NAME: &str = "File Name";
    pub const DEPARTMENT_MANAGER: &str = "Department Manager";
}

// =============================================================================
// Output Columns
// =============================================================================

/// Columns added to each category partition before it is stored
pub mod output {
    pub const ORACLE_DATE: &str = "Oracle Date";
    pub const INDEX: &str = "Index";

    /// Textual format of the run date in file names and the `Oracle Date` column
    pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";
}

/// Fixed projection of a joined planning/directory row
pub const JOINED_COLUMNS: &[&str] = &[
    planning::UNIQUE_CODE,
    planning::PROJECT_NUMBER,
    planning::PROJECT_NAME,
    planning::RESOURCE,
    planning::EXPENDITURE_ORGANIZATION,
    directory::PERSON_NUMBER,
    directory::FILE_NAME,
    directory::DEPARTMENT_MANAGER,
];

// =============================================================================
// Cleaning Rules
// =============================================================================

/// Placeholder rendered into the unique code when a key field is missing
pub const MISSING_TEXT: &str = "nan";

/// Employee name of the conversion cost line, never a real person
pub const EXCLUDED_EMPLOYEE: &str = "Labor Cost, Conversion Employee";

/// Separator between the organisation label and its trailing detail
pub const ORGANIZATION_SEPARATOR: char = ':';

// =============================================================================
// Dataset Naming Defaults
// =============================================================================

pub const DEFAULT_PLANNING_PREFIX: &str = "Project Plan Analysis-continuous-";
pub const DEFAULT_OUTPUT_PREFIX: &str = "CPW_Tool_";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_Main";
pub const DEFAULT_EXTENSION: &str = "xlsx";
pub const DEFAULT_UNCLASSIFIED_LABEL: &str = "Unclassified";

/// Extensions accepted as spreadsheets when picking a raw export
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Extension of macro-enabled workbooks (the workbook structure file)
pub const MACRO_WORKBOOK_EXTENSION: &str = "xlsm";

// =============================================================================
// Store Layout Defaults
// =============================================================================

pub const DEFAULT_PLANNING_FOLDER: &str = "Project Financial Plan (PFP)";
pub const DEFAULT_ARCHIVE_FOLDER: &str = "Project Financial Plan (PFP)/OLD PFP";
pub const DEFAULT_DIRECTORY_FOLDER: &str = "Workbook Structure";
pub const DEFAULT_OUTPUT_FOLDER: &str = "02 GBA Workbooks";
pub const DEFAULT_DIRECTORY_SHEET: &str = "Checker";

/// The directory sheet carries a banner row above its header
pub const DEFAULT_DIRECTORY_HEADER_ROW: usize = 1;

pub const DEFAULT_MAX_CONCURRENT_STORES: usize = 4;

/// Default category priority order with accepted synonyms
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("MOB", &["MOB", "MOBILITY", "Mobility"]),
    ("PLA", &["PLA", "PLACES", "Places"]),
    ("RES", &["RES", "RESILIENCE"]),
    ("EF", &["EF", "Enabling Function", "ENABLING FUNCTION"]),
    ("SSC", &["SSC", "SHARED SERVICES", "Shared Services"]),
];
