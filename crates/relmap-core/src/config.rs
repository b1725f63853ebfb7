//! Engine configuration.

/// Default number of relation levels a query resolves.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 3;

/// Default limit on owned-relation cascade depth during delete.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 100;

/// Default snowflake node id.
pub const DEFAULT_NODE_ID: u16 = 1;

/// Configuration for an [`crate::Orm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrmConfig {
    /// Relation levels resolved by a query. Relations past this depth come
    /// back as nil (singular) or empty (collection).
    pub max_relation_depth: usize,

    /// Owned cascades deeper than this fail the delete.
    pub max_cascade_depth: usize,

    /// Node id embedded in snowflake ids, 10 bits.
    pub node_id: u16,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            node_id: DEFAULT_NODE_ID,
        }
    }
}

impl OrmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relation resolution depth.
    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    /// Set the cascade depth limit.
    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    /// Set the snowflake node id. Only the low 10 bits are used.
    pub fn with_node_id(mut self, node_id: u16) -> Self {
        self.node_id = node_id;
        self
    }
}
