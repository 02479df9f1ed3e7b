use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use sprintspace_core::{
    DocumentId, Event, EventFilter, EventPatch, PageRequest, Registration, RegistrationFilter, RegistrationPatch,
    SortOrder,
};

use super::{CatalogStore, StoreError, StoreResult, UpdateOutcome};

#[derive(Debug, Default)]
struct Collections {
    events: Vec<Event>,
    registrations: Vec<Registration>,
}

impl Collections {
    fn event_mut(&mut self, id: DocumentId) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == id)
    }
}

/// In-memory catalog for tests/dev.
///
/// Both collections sit behind one lock, so multi-document steps (insert +
/// counter increment) are atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Collections>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

fn sorted_matches(events: &[Event], filter: &EventFilter) -> Vec<Event> {
    let mut matches: Vec<Event> = events.iter().filter(|e| filter.matches(e)).cloned().collect();
    matches.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    if filter.sort == SortOrder::Desc {
        matches.reverse();
    }
    matches
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_event(&self, event: Event) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.events.iter().any(|e| e.id == event.id) {
            return Err(StoreError::Duplicate(event.id));
        }
        inner.events.push(event);
        Ok(())
    }

    async fn find_event(&self, id: DocumentId) -> StoreResult<Option<Event>> {
        Ok(self.read()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter, window: Option<PageRequest>) -> StoreResult<Vec<Event>> {
        let matches = sorted_matches(&self.read()?.events, filter);
        Ok(match window {
            Some(page) => matches
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit() as usize)
                .collect(),
            None => matches,
        })
    }

    async fn count_events(&self, filter: &EventFilter) -> StoreResult<u64> {
        Ok(self.read()?.events.iter().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn upcoming_events(&self, after: NaiveDate, limit: u32) -> StoreResult<Vec<Event>> {
        let mut upcoming: Vec<Event> = self
            .read()?
            .events
            .iter()
            .filter(|e| e.is_upcoming(after))
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| (a.start_date, a.id).cmp(&(b.start_date, b.id)));
        upcoming.truncate(limit as usize);
        Ok(upcoming)
    }

    async fn update_event(&self, id: DocumentId, patch: &EventPatch) -> StoreResult<UpdateOutcome> {
        let mut inner = self.write()?;
        Ok(match inner.event_mut(id) {
            Some(event) => UpdateOutcome {
                matched: true,
                modified: patch.apply(event),
            },
            None => UpdateOutcome::not_found(),
        })
    }

    async fn delete_event(&self, id: DocumentId) -> StoreResult<bool> {
        let mut inner = self.write()?;
        let before = inner.events.len();
        inner.events.retain(|e| e.id != id);
        Ok(inner.events.len() != before)
    }

    async fn insert_registration(&self, registration: Registration) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.registrations.iter().any(|r| r.id == registration.id) {
            return Err(StoreError::Duplicate(registration.id));
        }

        let parent = inner
            .event_mut(registration.event_id)
            .ok_or(StoreError::EventNotFound(registration.event_id))?;
        parent.total_registration_count += 1;

        inner.registrations.push(registration);
        Ok(())
    }

    async fn find_registration(&self, id: DocumentId) -> StoreResult<Option<Registration>> {
        Ok(self.read()?.registrations.iter().find(|r| r.id == id).cloned())
    }

    async fn list_registrations(&self, filter: &RegistrationFilter) -> StoreResult<Vec<Registration>> {
        let mut matches: Vec<Registration> = self
            .read()?
            .registrations
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matches.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(matches)
    }

    async fn update_registration(&self, id: DocumentId, patch: &RegistrationPatch) -> StoreResult<UpdateOutcome> {
        let mut inner = self.write()?;
        Ok(match inner.registrations.iter_mut().find(|r| r.id == id) {
            Some(registration) => UpdateOutcome {
                matched: true,
                modified: patch.apply(registration),
            },
            None => UpdateOutcome::not_found(),
        })
    }

    async fn delete_registration(&self, id: DocumentId) -> StoreResult<Registration> {
        let mut inner = self.write()?;
        let idx = inner
            .registrations
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::RegistrationNotFound(id))?;

        let event_id = inner.registrations[idx].event_id;
        let parent = inner.event_mut(event_id).ok_or(StoreError::EventNotFound(event_id))?;
        parent.total_registration_count = parent.total_registration_count.saturating_sub(1);

        Ok(inner.registrations.remove(idx))
    }
}
