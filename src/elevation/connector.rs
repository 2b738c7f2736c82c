use std::collections::HashMap;

use glam::DVec2;
use serde::Serialize;

use crate::map_data::NodeIdx;

/// Position of a connector relative to the terrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroundState {
    On,
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(pub usize);

/// Point whose elevation has to be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct EleConnector {
    pub id: ConnectorId,
    pub pos: DVec2,
    pub ground_state: GroundState,
    /// Map node this connector was created for, if any
    pub reference: Option<NodeIdx>,
}

/// Connectors owned by one world object, addressable by exact position
#[derive(Debug, Clone, Default)]
pub struct EleConnectorGroup {
    ids: Vec<ConnectorId>,
    by_pos: HashMap<(u64, u64), ConnectorId>,
}

impl EleConnectorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector. The first connector at a position wins lookups.
    pub fn add(&mut self, id: ConnectorId, pos: DVec2) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self.by_pos.entry(pos_key(pos)).or_insert(id);
    }

    pub fn get(&self, pos: DVec2) -> Option<ConnectorId> {
        self.by_pos.get(&pos_key(pos)).copied()
    }

    pub fn ids(&self) -> &[ConnectorId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Exact bit pattern of a position, with -0.0 folded into 0.0
fn pos_key(pos: DVec2) -> (u64, u64) {
    ((pos.x + 0.0).to_bits(), (pos.y + 0.0).to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_lookup_by_position() {
        let mut group = EleConnectorGroup::new();
        group.add(ConnectorId(3), DVec2::new(1.0, 2.0));
        group.add(ConnectorId(4), DVec2::new(1.0, 2.0));
        group.add(ConnectorId(3), DVec2::new(1.0, 2.0));
        assert_eq!(group.len(), 2);
        assert_eq!(group.get(DVec2::new(1.0, 2.0)), Some(ConnectorId(3)));
        assert_eq!(group.get(DVec2::new(-0.0, 0.0)), None);
        group.add(ConnectorId(5), DVec2::new(0.0, 0.0));
        assert_eq!(group.get(DVec2::new(-0.0, 0.0)), Some(ConnectorId(5)));
    }
}
