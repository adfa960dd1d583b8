//! Anchors: fixed world locations where providers trade.
//!
//! Each anchor has a position, an ordered list of queue-slot positions and
//! a `trade_anywhere` flag. The queue capacity of an anchor is the number of
//! authored slots; anchors without authored slots fall back to a capacity
//! supplied by the caller and lay their slots out in a line behind the
//! anchor.

use serde::{Deserialize, Serialize};

use hearth_types::AnchorId;

use crate::error::WorldError;

/// Spacing between generated queue slots.
const GENERATED_SLOT_SPACING: f32 = 1.0;

/// A point in the 2D world plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are finite.
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Move up to `max_step` toward `target`, stopping on it.
    pub fn step_toward(self, target: Self, max_step: f32) -> Self {
        let distance = self.distance(target);
        if distance <= max_step || distance <= f32::EPSILON {
            return target;
        }
        let ratio = max_step / distance;
        Self {
            x: self.x + (target.x - self.x) * ratio,
            y: self.y + (target.y - self.y) * ratio,
        }
    }
}

/// A fixed trade location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Registry handle.
    pub id: AnchorId,
    /// Unique name.
    pub name: String,
    /// Where the anchor sits.
    pub position: Position,
    /// Authored queue-slot positions, slot 0 first.
    pub queue_slots: Vec<Position>,
    /// Whether providers may trade here even outside their trade windows.
    pub trade_anywhere: bool,
}

/// All anchors of the world, addressed by handle.
#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    /// Anchors indexed by handle.
    anchors: Vec<Anchor>,
}

impl AnchorRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            anchors: Vec::new(),
        }
    }

    /// Register an anchor and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateAnchor`] for a reused name and
    /// [`WorldError::InvalidPosition`] for non-finite coordinates.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        position: Position,
        queue_slots: Vec<Position>,
        trade_anywhere: bool,
    ) -> Result<AnchorId, WorldError> {
        let name = name.into();
        if self.anchors.iter().any(|a| a.name == name) {
            return Err(WorldError::DuplicateAnchor(name));
        }
        if let Some(bad) = std::iter::once(position)
            .chain(queue_slots.iter().copied())
            .find(|p| !p.is_finite())
        {
            return Err(WorldError::InvalidPosition { x: bad.x, y: bad.y });
        }
        let raw = u32::try_from(self.anchors.len()).map_err(|_err| WorldError::HandlesExhausted)?;
        let id = AnchorId::new(raw);
        self.anchors.push(Anchor {
            id,
            name,
            position,
            queue_slots,
            trade_anywhere,
        });
        Ok(id)
    }

    /// Look up an anchor.
    pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(id.index())
    }

    /// Look up an anchor, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AnchorNotFound`] if the handle is stale.
    pub fn require(&self, id: AnchorId) -> Result<&Anchor, WorldError> {
        self.get(id).ok_or(WorldError::AnchorNotFound(id))
    }

    /// Look up an anchor by name.
    pub fn find(&self, name: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.name == name)
    }

    /// Queue capacity of an anchor: its authored slot count, or
    /// `default_capacity` when none are authored. Unknown anchors have none.
    pub fn queue_capacity(&self, id: AnchorId, default_capacity: usize) -> usize {
        match self.get(id) {
            Some(anchor) if anchor.queue_slots.is_empty() => default_capacity,
            Some(anchor) => anchor.queue_slots.len(),
            None => 0,
        }
    }

    /// Position of queue slot `slot` at an anchor.
    ///
    /// Generated slots line up behind the anchor along the x axis.
    pub fn slot_position(&self, id: AnchorId, slot: usize) -> Option<Position> {
        let anchor = self.get(id)?;
        if anchor.queue_slots.is_empty() {
            let offset = u16::try_from(slot).map_or(f32::from(u16::MAX), f32::from) + 1.0;
            return Some(Position::new(
                anchor.position.x - offset * GENERATED_SLOT_SPACING,
                anchor.position.y,
            ));
        }
        anchor.queue_slots.get(slot).copied()
    }

    /// Whether the anchor allows trading outside trade windows.
    pub fn trade_anywhere(&self, id: AnchorId) -> bool {
        self.get(id).is_some_and(|a| a.trade_anywhere)
    }

    /// Iterate over anchors in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter()
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether no anchors are registered.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
