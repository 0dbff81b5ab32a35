use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ev_core::{
    CommonEventDocument, EngineError, InterpreterBundle, InterpreterContext, PreviewData,
    ProjectDocument, SceneDocument,
};
use ev_runtime::{
    CommandRegistry, CommonEvent, CommonEventRegistry, Environment, EnvironmentOptions, Host,
    Interpreter, MemoryDocumentStore, Scene, TempSettings, VariableStore,
};

mod headless;

pub use headless::{BoundaryStop, HeadlessSession, HeadlessSessionOptions, RunReport};

/// Authored documents of one project, keyed by scene uid and common event id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedProject {
    pub scenes: BTreeMap<String, SceneDocument>,
    pub common_events: BTreeMap<String, CommonEventDocument>,
    pub entry_scene: String,
}

#[derive(Clone, Default)]
pub struct CreateInterpreterOptions {
    pub documents_json: BTreeMap<String, String>,
    pub entry_scene: Option<String>,
    pub registry: Option<CommandRegistry>,
    pub variables: Option<Rc<RefCell<dyn VariableStore>>>,
    pub host: Option<Rc<RefCell<dyn Host>>>,
    pub frame_rate: Option<u32>,
    pub temp_settings: Option<TempSettings>,
    pub random_seed: Option<u32>,
    pub preview: Option<PreviewData>,
}

#[derive(Clone)]
pub struct ResumeInterpreterOptions {
    pub documents_json: BTreeMap<String, String>,
    pub bundle: InterpreterBundle,
    pub registry: Option<CommandRegistry>,
    pub variables: Option<Rc<RefCell<dyn VariableStore>>>,
    pub host: Option<Rc<RefCell<dyn Host>>>,
    pub frame_rate: Option<u32>,
    pub temp_settings: Option<TempSettings>,
    pub random_seed: Option<u32>,
}

pub fn load_project_from_json_map(
    json_by_path: &BTreeMap<String, String>,
    entry_scene: Option<String>,
) -> Result<LoadedProject, EngineError> {
    let (scenes, common_events) = parse_documents(json_by_path)?;
    let entry_scene = resolve_entry_scene(&scenes, entry_scene)?;
    Ok(LoadedProject {
        scenes,
        common_events,
        entry_scene,
    })
}

/// Builds an environment for the project and starts an interpreter on its
/// entry scene. When only a preview is given, its scene is the entry.
///
/// Common events keep their interpreters inside the environment; call
/// `Environment::dispose` once the interpreter is no longer needed.
pub fn create_interpreter(options: CreateInterpreterOptions) -> Result<Interpreter, EngineError> {
    let entry_scene = options.entry_scene.or_else(|| {
        options
            .preview
            .as_ref()
            .map(|preview| preview.scene.clone())
    });
    let project = load_project_from_json_map(&options.documents_json, entry_scene)?;
    let env = environment_for(
        &project,
        EnvironmentOptions {
            registry: options.registry,
            variables: options.variables,
            host: options.host,
            frame_rate: options.frame_rate,
            temp_settings: options.temp_settings,
            random_seed: options.random_seed,
            ..EnvironmentOptions::default()
        },
    )?;

    let mut interpreter = scene_interpreter(&env, &project.entry_scene)?;
    interpreter.set_preview(options.preview);
    interpreter.start();
    log::info!("started scene `{}`", project.entry_scene);
    Ok(interpreter)
}

/// Rebuilds an interpreter for the scene a bundle was saved in and applies
/// the bundle, including its sub-interpreter chain.
pub fn resume_interpreter(options: ResumeInterpreterOptions) -> Result<Interpreter, EngineError> {
    let (scenes, common_events) = parse_documents(&options.documents_json)?;
    let entry_scene = options.bundle.context.id.clone();
    if !scenes.contains_key(&entry_scene) {
        return Err(EngineError::new(
            "API_RESUME_SCENE_NOT_FOUND",
            format!("Saved scene \"{}\" is not in the project.", entry_scene),
        ));
    }
    let project = LoadedProject {
        scenes,
        common_events,
        entry_scene,
    };
    let env = environment_for(
        &project,
        EnvironmentOptions {
            registry: options.registry,
            variables: options.variables,
            host: options.host,
            frame_rate: options.frame_rate,
            temp_settings: options.temp_settings,
            random_seed: options.random_seed,
            ..EnvironmentOptions::default()
        },
    )?;

    let mut interpreter = scene_interpreter(&env, &project.entry_scene)?;
    interpreter.restore(options.bundle)?;
    log::info!(
        "resumed scene `{}` at command {}",
        project.entry_scene,
        interpreter.pointer()
    );
    Ok(interpreter)
}

type ParsedDocuments = (
    BTreeMap<String, SceneDocument>,
    BTreeMap<String, CommonEventDocument>,
);

fn parse_documents(json_by_path: &BTreeMap<String, String>) -> Result<ParsedDocuments, EngineError> {
    let mut scenes = BTreeMap::new();
    let mut common_events = BTreeMap::new();

    for (path, raw) in json_by_path {
        let document: ProjectDocument = serde_json::from_str(raw).map_err(|error| {
            EngineError::new(
                "API_DOCUMENT_PARSE",
                format!("Failed to parse \"{}\": {}", path, error),
            )
        })?;
        match document {
            ProjectDocument::Scene(scene) => {
                if scenes.contains_key(&scene.uid) {
                    return Err(EngineError::new(
                        "API_DUPLICATE_SCENE",
                        format!("Scene uid \"{}\" is declared more than once ({}).", scene.uid, path),
                    ));
                }
                scenes.insert(scene.uid.clone(), scene);
            }
            ProjectDocument::CommonEvent(event) => {
                if common_events.contains_key(&event.id) {
                    return Err(EngineError::new(
                        "API_DUPLICATE_COMMON_EVENT",
                        format!(
                            "Common event id \"{}\" is declared more than once ({}).",
                            event.id, path
                        ),
                    ));
                }
                common_events.insert(event.id.clone(), event);
            }
        }
    }

    log::debug!(
        "parsed {} scenes and {} common events",
        scenes.len(),
        common_events.len()
    );
    Ok((scenes, common_events))
}

fn resolve_entry_scene(
    scenes: &BTreeMap<String, SceneDocument>,
    explicit: Option<String>,
) -> Result<String, EngineError> {
    if let Some(entry) = explicit {
        if !scenes.contains_key(&entry) {
            return Err(EngineError::new(
                "API_ENTRY_SCENE_NOT_FOUND",
                format!("Entry scene \"{}\" is not registered.", entry),
            ));
        }
        return Ok(entry);
    }

    if scenes.contains_key("main") {
        return Ok("main".to_string());
    }

    Err(EngineError::new(
        "API_ENTRY_MAIN_NOT_FOUND",
        "Expected scene with uid=\"main\" as default entry.",
    ))
}

fn environment_for(
    project: &LoadedProject,
    mut options: EnvironmentOptions,
) -> Result<Rc<Environment>, EngineError> {
    let documents = project
        .scenes
        .values()
        .cloned()
        .map(Scene::from)
        .collect::<MemoryDocumentStore>();
    options.documents = Some(Rc::new(documents));
    options.common_events = Some(CommonEventRegistry::new(
        project
            .common_events
            .values()
            .cloned()
            .map(CommonEvent::from),
    ));
    Environment::new(options)
}

fn scene_interpreter(env: &Rc<Environment>, uid: &str) -> Result<Interpreter, EngineError> {
    let scene = env.documents().scene(uid).ok_or_else(|| {
        EngineError::new(
            "API_ENTRY_SCENE_NOT_FOUND",
            format!("Entry scene \"{}\" is not registered.", uid),
        )
    })?;
    let mut interpreter = Interpreter::new(Rc::clone(env), InterpreterContext::new(uid, None));
    interpreter.set_commands(Some(Rc::clone(&scene.commands)));
    Ok(interpreter)
}
