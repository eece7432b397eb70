//! # AArch64 Stage-1 Translation Table Walker
//!
//! Emulates the VMSAv8-64 stage-1 walk (4 KiB granule, 48-bit input
//! addresses) over memory and registers obtained from a [`MemoryReader`],
//! e.g. a debugger connection or a physical memory image.
//!
//! ## Translation Walk
//!
//! ```text
//!  TTBRn_EL1 ─► L0 table ─► L1 table ─► L2 table ─► L3 table ─► 4 KiB page
//!    (bit 55)     │            │            │
//!                 │            │            └──► 2 MiB block (type bit 0)
//!                 │            └───────────────► 1 GiB block (type bit 0)
//!                 └────────────────────────────► tables only
//! ```
//!
//! Each level consumes nine bits of the virtual address (bits `47:39`,
//! `38:30`, `29:21`, `20:12`); the descriptor for that index lives at
//! `table + index * 8`. Bits below the mapping size pass through unchanged.
//!
//! ## What you get
//!
//! - [`Descriptor::decode`] classifies a raw entry for its level, with
//!   [`TableDescriptor`] / [`LeafDescriptor`] bitfield views of the layout.
//! - [`TableWalker::walk`] resolves one address into a [`WalkResult`] holding
//!   the physical address or a [`TranslationFault`], plus the visited path.
//! - [`TableWalker::enumerate`] and [`TableWalker::dump_address_spaces`]
//!   list mapped regions with a per-table entry limit ([`EnumerationLimits`]).
//! - [`describe`] interprets permission bits; [`RegisterSnapshot`] decodes the
//!   translation control registers.
//! - [`WalkSink`] observes every visited entry in order.
//!
//! ## Errors
//!
//! Unreadable memory ends a single-target walk with
//! [`FaultReason::UnreadableMemory`]; an invalid descriptor with
//! [`FaultReason::InvalidEntry`]. A missing base register is reported as
//! [`RegisterUnavailable`] before any memory is read. During enumeration
//! invalid entries are skipped and unreadable ones are recorded in place.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod descriptor;
mod enumerate;
mod error;
mod permissions;
mod reader;
mod root;
mod sink;
mod snapshot;
mod walker;

pub use crate::descriptor::{
    Descriptor, DescriptorAnomaly, DescriptorKind, LeafDescriptor, MappingSize, Permissions,
    RawDescriptor, TableDescriptor,
};
pub use crate::enumerate::{
    AddressSpaceDump, EntryContent, EnumeratedEntry, EnumerationLimits, EnumerationNode,
    Truncation,
};
pub use crate::error::{
    FaultReason, MemoryReadError, RegisterUnavailable, TranslationFault, WalkError,
};
pub use crate::permissions::{
    AccessClass, Executability, PermissionSummary, Shareability, describe,
};
pub use crate::reader::{MemoryImage, MemoryReader};
pub use crate::root::{Root, select_root};
pub use crate::sink::{NoopSink, VisitedEntry, WalkSink};
pub use crate::snapshot::RegisterSnapshot;
pub use crate::walker::{TableWalker, WalkResult};
