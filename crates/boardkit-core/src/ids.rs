//! Element id generation.

use crate::shapes::ShapeId;
use std::fmt;
use uuid::Uuid;

/// Source of fresh element ids. Ids are never reused within a scene.
pub trait IdGenerator: fmt::Debug {
    fn next_id(&mut self) -> ShapeId;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> ShapeId {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` ids, for tests and replayable sessions.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("el")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ShapeId {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
