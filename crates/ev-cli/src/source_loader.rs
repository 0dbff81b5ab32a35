use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ev_core::EngineError;
use walkdir::WalkDir;

use crate::{CliStage, LoadedProjectSource};

const PROJECT_REF_PREFIX: &str = "project-dir:";

pub(crate) fn load_source_by_project_dir(
    project_dir: &str,
    entry_scene: Option<&str>,
) -> Result<LoadedProjectSource, EngineError> {
    let project_root = resolve_project_dir(project_dir)?;
    let documents_json = read_documents_json_from_dir(&project_root)?;
    let title = format!(
        "Project {}",
        project_root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
    );

    Ok(LoadedProjectSource {
        id: make_project_dir_id(&project_root),
        title,
        documents_json,
        entry_scene: entry_scene.map(str::to_string),
    })
}

pub(crate) fn load_source_by_ref(project_ref: &str) -> Result<LoadedProjectSource, EngineError> {
    let Some(raw) = project_ref.strip_prefix(PROJECT_REF_PREFIX) else {
        return Err(EngineError::new(
            "CLI_SOURCE_REF_INVALID",
            format!("Unsupported project ref: {}", project_ref),
        ));
    };
    load_source_by_project_dir(raw, None)
}

pub(crate) fn resolve_project_dir(project_dir: &str) -> Result<PathBuf, EngineError> {
    let path = PathBuf::from(project_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(CliStage::SourcePath.mapper())?
            .join(path)
    };

    if !absolute.exists() {
        return Err(EngineError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("project-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(EngineError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("project-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Every `.json` file below `project_dir` except test cases, keyed by its
/// slash-separated relative path.
pub(crate) fn read_documents_json_from_dir(
    project_dir: &Path,
) -> Result<BTreeMap<String, String>, EngineError> {
    let mut documents = BTreeMap::new();

    for entry in WalkDir::new(project_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if !file_name.ends_with(".json") || file_name == "testcase.json" {
            continue;
        }

        let relative = path
            .strip_prefix(project_dir)
            .map_err(CliStage::SourceScan.mapper())?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).map_err(CliStage::SourceRead.mapper())?;
        documents.insert(relative, content);
    }

    if documents.is_empty() {
        return Err(EngineError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .json documents under {}", project_dir.display()),
        ));
    }

    log::debug!(
        "read {} documents from {}",
        documents.len(),
        project_dir.display()
    );
    Ok(documents)
}

pub(crate) fn make_project_dir_id(project_dir: &Path) -> String {
    format!("{}{}", PROJECT_REF_PREFIX, project_dir.display())
}

#[cfg(test)]
mod source_loader_tests {
    use super::*;
    use crate::cli_test_support::*;

    #[test]
    fn load_source_by_ref_validates_ref_prefix() {
        let error = load_source_by_ref("unknown:main").expect_err("invalid ref should fail");
        assert_eq!(error.code, "CLI_SOURCE_REF_INVALID");

        let error = load_source_by_ref("").expect_err("empty ref should fail");
        assert_eq!(error.code, "CLI_SOURCE_REF_INVALID");
    }

    #[test]
    fn resolve_project_dir_validates_existence_and_directory() {
        let missing = temp_path("missing-dir");
        let missing_err = resolve_project_dir(missing.to_string_lossy().as_ref())
            .expect_err("missing path should fail");
        assert_eq!(missing_err.code, "CLI_SOURCE_NOT_FOUND");

        let file_path = temp_path("plain-file");
        write_file(&file_path, "x");
        let file_err = resolve_project_dir(file_path.to_string_lossy().as_ref())
            .expect_err("file path should fail");
        assert_eq!(file_err.code, "CLI_SOURCE_NOT_DIR");
    }

    #[test]
    fn read_documents_filters_json_and_skips_test_cases() {
        let root = temp_path("project-dir");
        write_file(&root.join("scenes/main.json"), MAIN_SCENE);
        write_file(&root.join("events/bye.json"), r#"{"kind":"commonEvent","id":"ce"}"#);
        write_file(&root.join("testcase.json"), "{}");
        write_file(&root.join("notes.txt"), "ignored");

        let documents = read_documents_json_from_dir(&root).expect("scan should pass");
        assert_eq!(documents.len(), 2);
        assert!(documents.contains_key("scenes/main.json"));
        assert!(documents.contains_key("events/bye.json"));
    }

    #[test]
    fn read_documents_errors_when_no_json_files() {
        let root = temp_path("empty-project-dir");
        write_file(&root.join("readme.txt"), "not a document");

        let error =
            read_documents_json_from_dir(&root).expect_err("empty project should return error");
        assert_eq!(error.code, "CLI_SOURCE_EMPTY");
    }

    #[test]
    fn project_ids_round_trip_through_refs() {
        let root = temp_path("project-ref");
        write_file(&root.join("main.json"), MAIN_SCENE);

        let loaded = load_source_by_project_dir(&root.to_string_lossy(), Some("main"))
            .expect("load should pass");
        assert!(loaded.id.starts_with("project-dir:"));
        assert_eq!(loaded.entry_scene.as_deref(), Some("main"));

        let by_ref = load_source_by_ref(&loaded.id).expect("load by ref should pass");
        assert_eq!(by_ref.documents_json, loaded.documents_json);
        assert_eq!(by_ref.entry_scene, None);
    }
}
