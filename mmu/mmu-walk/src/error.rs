use mmu_addresses::{Level, PhysicalAddress};
use mmu_registers::SystemRegister;

/// Failure of the memory collaborator to supply bytes at a physical address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryReadError {
    #[error("{length} bytes at {address} are outside the readable memory")]
    OutOfBounds {
        address: PhysicalAddress,
        length: usize,
    },
    #[error("the transport failed to read {length} bytes at {address}")]
    Transport {
        address: PhysicalAddress,
        length: usize,
    },
}

impl MemoryReadError {
    /// The physical address the failed read started at.
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        match self {
            Self::OutOfBounds { address, .. } | Self::Transport { address, .. } => *address,
        }
    }
}

/// A system register could not be read, so no translation root is known.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("register {register} is unavailable")]
pub struct RegisterUnavailable {
    pub register: SystemRegister,
}

impl RegisterUnavailable {
    #[must_use]
    pub const fn new(register: SystemRegister) -> Self {
        Self { register }
    }
}

/// Why a single-target walk stopped without producing an address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultReason {
    /// The descriptor at this level has its valid bit clear.
    #[error("invalid entry")]
    InvalidEntry,
    /// The descriptor itself could not be read.
    #[error("unreadable memory: {0}")]
    UnreadableMemory(#[source] MemoryReadError),
}

/// A translation fault, located by level and the physical entry address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("translation fault at level {} (entry at {entry_address}): {reason}", .level.as_u8())]
pub struct TranslationFault {
    pub level: Level,
    pub entry_address: PhysicalAddress,
    pub reason: FaultReason,
}

/// Error returned by [`TableWalker::translate`](crate::TableWalker::translate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error(transparent)]
    RegisterUnavailable(#[from] RegisterUnavailable),
    #[error(transparent)]
    Fault(#[from] TranslationFault),
}
