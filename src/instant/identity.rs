//! Annotation identity
//!
//! An annotation starts out [`IdentityState::Unidentified`], gets a client
//! uuid when it is created locally, and may later receive a public `id`.
//! Once an `id` is assigned it is never cleared or replaced.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use super::annotation::Annotation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("annotation id must not be empty")]
    EmptyId,

    #[error("annotation already has id `{current}`, refusing `{attempted}`")]
    AlreadyAssigned { current: String, attempted: String },

    #[error("annotation {uuid} lost its id `{id}`")]
    IdCleared { uuid: String, id: String },

    #[error("annotation {uuid} changed id from `{previous}` to `{current}`")]
    IdChanged {
        uuid: String,
        previous: String,
        current: String,
    },
}

/// Where an annotation is in its identity lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    Unidentified,
    Created { uuid: String },
    /// Records loaded from a document may carry an id without a uuid
    Persisted { uuid: Option<String>, id: String },
}

impl IdentityState {
    pub fn id(&self) -> Option<&str> {
        match self {
            IdentityState::Persisted { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn uuid(&self) -> Option<&str> {
        match self {
            IdentityState::Created { uuid } => Some(uuid),
            IdentityState::Persisted { uuid, .. } => uuid.as_deref(),
            IdentityState::Unidentified => None,
        }
    }

    /// Check that moving to `next` keeps an assigned id
    pub fn check_transition(&self, next: &IdentityState) -> Result<(), IdentityError> {
        let Some(previous) = self.id() else {
            return Ok(());
        };
        let uuid = self.uuid().unwrap_or_default().to_string();
        match next.id() {
            None => Err(IdentityError::IdCleared {
                uuid,
                id: previous.to_string(),
            }),
            Some(current) if current != previous => Err(IdentityError::IdChanged {
                uuid,
                previous: previous.to_string(),
                current: current.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

impl Annotation {
    pub fn identity(&self) -> IdentityState {
        let base = self.base();
        match (&base.uuid, &base.id) {
            (_, Some(id)) => IdentityState::Persisted {
                uuid: base.uuid.clone(),
                id: id.clone(),
            },
            (Some(uuid), None) => IdentityState::Created { uuid: uuid.clone() },
            (None, None) => IdentityState::Unidentified,
        }
    }

    /// Copy of this annotation with a client uuid, generating one if needed
    pub fn with_uuid(&self) -> Annotation {
        let mut next = self.clone();
        if next.base().uuid.is_none() {
            next.base_mut().uuid = Some(Uuid::new_v4().to_string());
        }
        next
    }

    /// Copy of this annotation carrying `id`
    ///
    /// Assigning the id it already has is a no-op; any other id is refused.
    pub fn assign_id(&self, id: &str) -> Result<Annotation, IdentityError> {
        if id.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        match self.id() {
            Some(current) if current == id => Ok(self.clone()),
            Some(current) => Err(IdentityError::AlreadyAssigned {
                current: current.to_string(),
                attempted: id.to_string(),
            }),
            None => {
                let mut next = self.clone();
                next.base_mut().id = Some(id.to_string());
                Ok(next)
            }
        }
    }
}

/// Remembers the first id seen for each uuid on one view
#[derive(Debug, Default)]
pub struct IdentityLedger {
    assigned: HashMap<String, String>,
}

impl IdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `annotation`, reporting an id that was cleared or replaced
    ///
    /// The ledger keeps the first id it saw either way.
    pub fn observe(&mut self, annotation: &Annotation) -> Result<(), IdentityError> {
        let Some(uuid) = annotation.uuid() else {
            return Ok(());
        };
        match self.assigned.get(uuid) {
            Some(previous) => {
                let recorded = IdentityState::Persisted {
                    uuid: Some(uuid.to_string()),
                    id: previous.clone(),
                };
                recorded.check_transition(&annotation.identity())
            }
            None => {
                if let Some(id) = annotation.id() {
                    self.assigned.insert(uuid.to_string(), id.to_string());
                }
                Ok(())
            }
        }
    }

    /// Drop what is known about a removed annotation
    pub fn forget(&mut self, uuid: &str) {
        self.assigned.remove(uuid);
    }

    pub fn id_for(&self, uuid: &str) -> Option<&str> {
        self.assigned.get(uuid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
