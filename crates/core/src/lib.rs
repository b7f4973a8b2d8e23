//! # Orgtree Core
//!
//! Team hierarchies from flat parent-linked records: tree construction,
//! bottom-up metric rollups, safe re-parenting and expand/collapse-aware
//! flattening for row rendering.
//!
//! ## Features
//!
//! - **Tolerant construction** - dangling parents, cycles and over-deep chains
//!   are repaired (re-rooted) and reported, never fatal
//! - **Rollups without double counting** - additive metrics summed once per
//!   leaf; super-team entries supersede their members
//! - **Ratio correctness** - ratios recomputed from rolled operands at every level
//! - **Copy-on-write mutations** - typed, all-or-nothing re-parenting
//! - **Ancestor-chain visibility** - a row shows only when its whole ancestor
//!   chain is expanded
//!
//! ## Architecture
//!
//! ```text
//! FlatRecord[]
//!     │
//!     ├──> NodeStore (id index)
//!     │
//!     ├──> TreeBuilder
//!     │      ├─ Link children to parents (petgraph)
//!     │      ├─ Re-root dangling / cyclic / too-deep records
//!     │      └─ Assign depth once, breadth-first
//!     │
//!     ├──> RollupCalculator (MetricSpec)
//!     │      ├─ Post-order, explicit stack
//!     │      ├─ Sum additive metrics
//!     │      └─ Recompute ratios from rolled operands
//!     │
//!     └──> VisibilityFlattener (expanded ids)
//!            └─ FlatRow[] for rendering
//!
//! MutationService: Forest + move ──> new Forest + ParentChange to persist
//! ```
//!
//! ## Example
//!
//! ```rust
//! use orgtree_core::{
//!     FlatRecord, MetricSpec, RatioMetric, RollupCalculator, TreeBuilder, VisibilityFlattener,
//! };
//! use std::collections::HashSet;
//!
//! let records = vec![
//!     FlatRecord::team("west"),
//!     FlatRecord::member("ana").parent("west").metric("sales", 100.0).metric("gp", 10.0),
//!     FlatRecord::member("bo").parent("west").metric("sales", 300.0).metric("gp", 60.0),
//! ];
//! let forest = TreeBuilder::default().build(&records);
//!
//! let spec = MetricSpec::new()
//!     .additive("sales")
//!     .additive("gp")
//!     .ratio(RatioMetric::percentage("marginPct", "gp", "sales"));
//! let rolled = RollupCalculator::new(spec).unwrap().rollup(&forest);
//! assert_eq!(rolled.rolled_by_id("west").unwrap().ratio("marginPct"), Some(17.5));
//!
//! let expanded: HashSet<String> = ["west".to_string()].into();
//! let rows = VisibilityFlattener::flatten(&rolled, &expanded);
//! assert_eq!(rows.len(), 3);
//! ```

mod builder;
mod config;
mod error;
mod forest;
mod metrics;
mod mutation;
mod rollup;
mod store;
mod types;
mod visibility;

pub use builder::TreeBuilder;
pub use config::{EngineConfig, SiblingOrder, TreeConfig, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
pub use error::{MutationError, MutationErrorKind, MutationErrorReport, Result, SpecError};
pub use forest::{BuildReport, Forest, ForestStats, Link};
pub use metrics::{MetricSpec, RatioMetric, ZeroDenominator};
pub use mutation::{MutationService, Reparented};
pub use rollup::{RolledForest, RolledMetrics, RollupCalculator};
pub use store::NodeStore;
pub use types::{FlatRecord, Metrics, Node, NodeKind, ParentChange};
pub use visibility::{FlatRow, RowKind, VisibilityFlattener};

pub use petgraph::graph::NodeIndex;
