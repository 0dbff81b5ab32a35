use serde::{Deserialize, Serialize};

use crate::command::Command;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonEventDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// One authored JSON file: either a scene or a common event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProjectDocument {
    Scene(SceneDocument),
    CommonEvent(CommonEventDocument),
}
