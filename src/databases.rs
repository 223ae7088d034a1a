use crate::database::{Database, DbError};
use crate::modules::shifts::database::ShiftHandler;
use std::path::Path;

#[derive(Debug)]
pub struct Databases {
    pub shifts: ShiftHandler,
}

impl Databases {
    pub async fn open(data_dir: &Path) -> Result<Self, DbError> {
        Ok(Self {
            shifts: Database::new(data_dir.join("shifts.json")).await?,
        })
    }
}
