use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::{EvToolError, TestCase, TESTCASE_FILE, TESTCASE_SCHEMA_V1};

/// Every `*.json` document under `project_dir`, keyed by its `/`-separated
/// path relative to the directory. Test case files are not documents.
pub fn read_documents_json_from_dir(
    project_dir: &Path,
) -> Result<BTreeMap<String, String>, EvToolError> {
    let documents = WalkDir::new(project_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_document(entry.path()))
        .map(|entry| -> Result<(String, String), EvToolError> {
            let path = entry.path();
            let content = fs::read_to_string(path).map_err(|source| EvToolError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((document_key(project_dir, path), content))
        })
        .collect::<Result<BTreeMap<_, _>, EvToolError>>()?;

    if documents.is_empty() {
        return Err(EvToolError::NoDocuments {
            path: project_dir.to_path_buf(),
        });
    }
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "json")
        && path
            .file_name()
            .is_some_and(|name| name != TESTCASE_FILE)
}

fn document_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, EvToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| EvToolError::Io {
        path: case_path.to_path_buf(),
        source,
    })?;
    let case: TestCase = serde_json::from_str(&raw).map_err(|source| EvToolError::CaseJson {
        path: case_path.to_path_buf(),
        source,
    })?;
    if case.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(EvToolError::UnsupportedSchema {
            found: case.schema_version,
        });
    }
    Ok(case)
}
