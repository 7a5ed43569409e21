//! Catalog loading for the demo harness. A provider supplies raw entities
//! plus the time grid; this crate synthesizes time slots itself.

pub mod parser;

use serde::{Deserialize, Serialize};

use crate::catalog::TimeConfig;
use crate::error::Result;
use crate::external::{CatalogPayload, CatalogProvider};
use crate::model::{Course, Faculty, Room, Student};

/// On-disk shape of one organization's catalog file: the same entity
/// structs the rest of the crate uses, since they are already
/// `Serialize`/`Deserialize` — no separate DTO layer is needed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub courses: Vec<Course>,
    pub faculty: Vec<Faculty>,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub students: Vec<Student>,
    pub time_config: TimeConfig,
}

impl From<CatalogDocument> for CatalogPayload {
    fn from(doc: CatalogDocument) -> Self {
        CatalogPayload { courses: doc.courses, faculty: doc.faculty, rooms: doc.rooms, students: doc.students, time_config: doc.time_config }
    }
}

/// Reads `{base_dir}/{org_id}.json` and deserializes it into a
/// [`CatalogPayload`].
pub struct JsonFileCatalogProvider {
    pub base_dir: String,
}

impl JsonFileCatalogProvider {
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

impl CatalogProvider for JsonFileCatalogProvider {
    fn load(&self, org_id: &str) -> Result<CatalogPayload> {
        let path = format!("{}/{org_id}.json", self.base_dir);
        let doc: CatalogDocument = parser::parse_json_file(&path)?;
        Ok(doc.into())
    }
}
