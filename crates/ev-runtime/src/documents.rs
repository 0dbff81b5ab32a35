use std::collections::BTreeMap;
use std::rc::Rc;

use ev_core::{Command, SceneDocument};

/// A loaded scene: the command list interpreters step through.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub uid: String,
    pub name: String,
    pub commands: Rc<[Command]>,
}

impl From<SceneDocument> for Scene {
    fn from(document: SceneDocument) -> Self {
        Self {
            uid: document.uid,
            name: document.name,
            commands: document.commands.into(),
        }
    }
}

pub trait DocumentStore {
    fn scene(&self, uid: &str) -> Option<Rc<Scene>>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    scenes: BTreeMap<String, Rc<Scene>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scene: Scene) {
        self.scenes.insert(scene.uid.clone(), Rc::new(scene));
    }

    pub fn scene_uids(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }
}

impl FromIterator<Scene> for MemoryDocumentStore {
    fn from_iter<T: IntoIterator<Item = Scene>>(iter: T) -> Self {
        let mut store = Self::new();
        for scene in iter {
            store.insert(scene);
        }
        store
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn scene(&self, uid: &str) -> Option<Rc<Scene>> {
        self.scenes.get(uid).cloned()
    }
}
