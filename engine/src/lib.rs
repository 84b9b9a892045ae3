//! Device Manager Engine
//!
//! A library for supervising a node's devices and services:
//! - Deployment: descriptor parsing, implementation matching, ordered launch
//!   of standalone and composite placements
//! - Federation: registration with the domain manager, resilient to an
//!   unreachable or restarting peer
//! - Lifecycle: a concurrent registry of pending and registered children,
//!   child-exit reaping, and an escalating shutdown
//!
//! ## Architecture
//!
//! The engine follows hexagonal (ports and adapters) architecture:
//!
//! - **Domain**: entities, value objects, services, and the ports to the
//!   external collaborators (object bus, file system, process executor)
//! - **Application**: the `DeviceManager` composition root and its public
//!   remote surface
//! - **Infrastructure**: concrete adapters (local file system, tokio process
//!   executor, descriptor schema, in-memory bus)
//!
//! The daemon binary (`devmgrd`) wires these modules directly:
//!
//! ```rust,ignore
//! use dm_engine::{
//!     application::{DeviceManager, DeviceManagerConfig},
//!     infrastructure::{InMemoryNaming, LocalFileSystem, TokioProcessExecutor},
//! };
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
