use crate::domain::journey::{
    AccommodationRow, ActivityRow, ExtraRow, FlightRow, JourneyId, NewJourney,
};
use crate::domain::ports::JourneyStore;
use crate::utils::error::{OfferError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One journey and everything seeded under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyDocument {
    pub id: JourneyId,
    pub journey: Option<NewJourney>,
    pub flights: Vec<FlightRow>,
    pub accommodations: Vec<AccommodationRow>,
    pub activities: Vec<ActivityRow>,
    pub extras: Vec<ExtraRow>,
}

/// Keeps each journey as `journey_<id>.json` under a base directory.
#[derive(Debug)]
pub struct LocalJourneyStore {
    base_path: PathBuf,
    lock: Mutex<()>,
}

impl LocalJourneyStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, id: JourneyId) -> PathBuf {
        self.base_path.join(format!("journey_{}.json", id))
    }

    pub fn load(&self, id: JourneyId) -> Result<JourneyDocument> {
        let path = self.path_for(id);
        let data = fs::read(&path).map_err(|e| OfferError::StoreError {
            message: format!("journey {} not readable at {}: {}", id, path.display(), e),
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, doc: &JourneyDocument) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        let data = serde_json::to_vec_pretty(doc)?;
        fs::write(self.path_for(doc.id), data)?;
        Ok(())
    }

    fn next_id(&self) -> Result<JourneyId> {
        if !self.base_path.exists() {
            return Ok(1);
        }
        let mut max_id = 0;
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("journey_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<JourneyId>().ok());
            if let Some(id) = id {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id + 1)
    }

    fn update(&self, id: JourneyId, apply: impl FnOnce(&mut JourneyDocument)) -> Result<()> {
        let _guard = self.lock.lock();
        let mut doc = self.load(id)?;
        apply(&mut doc);
        self.save(&doc)
    }
}

#[async_trait]
impl JourneyStore for LocalJourneyStore {
    async fn insert_journey(&self, journey: &NewJourney) -> Result<JourneyId> {
        let _guard = self.lock.lock();
        let id = self.next_id()?;
        self.save(&JourneyDocument {
            id,
            journey: Some(journey.clone()),
            ..JourneyDocument::default()
        })?;
        tracing::debug!("created journey {} in {}", id, self.base_path.display());
        Ok(id)
    }

    async fn insert_flights(&self, journey_id: JourneyId, rows: &[FlightRow]) -> Result<()> {
        self.update(journey_id, |doc| doc.flights.extend_from_slice(rows))
    }

    async fn insert_accommodations(
        &self,
        journey_id: JourneyId,
        rows: &[AccommodationRow],
    ) -> Result<()> {
        self.update(journey_id, |doc| doc.accommodations.extend_from_slice(rows))
    }

    async fn insert_activities(&self, journey_id: JourneyId, rows: &[ActivityRow]) -> Result<()> {
        self.update(journey_id, |doc| doc.activities.extend_from_slice(rows))
    }

    async fn insert_extras(&self, journey_id: JourneyId, rows: &[ExtraRow]) -> Result<()> {
        self.update(journey_id, |doc| doc.extras.extend_from_slice(rows))
    }
}
