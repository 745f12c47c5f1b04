//! Permissions and their caveat sequence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::caveat::{Caveat, Discriminator};
use crate::sort::{SerializedCaveat, sort_caveats};

/// A grant to call `method`, restricted by its caveats.
///
/// The caveat sequence is never modified in place: adding or removing a
/// caveat swaps in a new sequence, so a handle obtained from
/// [`Permission::caveats_handle`] keeps its contents.
#[derive(Debug, Clone, Serialize)]
pub struct Permission {
    /// The restricted method this permission grants.
    pub method: String,
    pub id: Uuid,
    /// When the permission was created.
    pub date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_caveats")]
    caveats: Arc<Vec<Caveat>>,
}

impl Permission {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            id: Uuid::new_v4(),
            date: Utc::now(),
            caveats: Arc::default(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn caveats(&self) -> &[Caveat] {
        &self.caveats
    }

    /// A shared handle to the current caveat sequence.
    pub fn caveats_handle(&self) -> Arc<Vec<Caveat>> {
        Arc::clone(&self.caveats)
    }

    pub fn has_caveat(&self, discriminator: &Discriminator) -> bool {
        self.caveats.iter().any(|c| c.matches(discriminator))
    }

    pub fn get_caveat(&self, discriminator: &Discriminator) -> Option<&Caveat> {
        self.caveats.iter().find(|c| c.matches(discriminator))
    }

    pub(crate) fn attach(&mut self, caveat: Caveat) {
        let mut next = Vec::with_capacity(self.caveats.len() + 1);
        next.extend(self.caveats.iter().cloned());
        next.push(caveat);
        self.caveats = Arc::new(next);
    }

    /// Remove the first caveat matching `discriminator` and return it.
    ///
    /// Returns `None`, leaving the sequence untouched, if nothing matches.
    pub fn remove_caveat(&mut self, discriminator: &Discriminator) -> Option<Caveat> {
        let index = self.caveats.iter().position(|c| c.matches(discriminator))?;

        let mut remaining = Vec::with_capacity(self.caveats.len() - 1);
        remaining.extend(self.caveats[..index].iter().cloned());
        remaining.extend(self.caveats[index + 1..].iter().cloned());
        let removed = self.caveats[index].clone();
        self.caveats = Arc::new(remaining);

        debug!(method = %self.method, %discriminator, "removed caveat");
        Some(removed)
    }

    /// The caveats in serialized form, sorted into canonical order.
    pub fn canonical_caveats(&self) -> Vec<SerializedCaveat> {
        let mut caveats: Vec<_> = self.caveats.iter().map(Caveat::to_serialized).collect();
        sort_caveats(&mut caveats);
        caveats
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.id == other.id
            && self.date == other.date
            && self.caveats == other.caveats
    }
}

fn serialize_caveats<S: Serializer>(caveats: &Arc<Vec<Caveat>>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(caveats.iter())
}

/// Remove the caveat identified by `discriminator` from `permission`.
pub fn remove_caveat(permission: &mut Permission, discriminator: &Discriminator) -> Option<Caveat> {
    permission.remove_caveat(discriminator)
}
