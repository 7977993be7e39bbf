use thiserror::Error;
use wh_core::{AgentId, PalletId, StackId};

#[derive(Debug, Error)]
pub enum OrderError {
    /// A task's preconditions no longer hold (pallet moved or vanished).
    /// Recoverable: the order is requeued or dropped and the agent idles.
    #[error("task infeasible: pallet {pallet}: {reason}")]
    TaskInfeasible { pallet: PalletId, reason: String },

    #[error("stack {0} is empty")]
    EmptyStack(StackId),

    #[error("pallet {pallet} is not on top of stack {stack}")]
    NotOnTop { pallet: PalletId, stack: StackId },

    #[error("stack {0} is full")]
    StackFull(StackId),

    #[error("agent {0} is not carrying a pallet")]
    NotCarrying(AgentId),

    #[error("agent {agent} already has an assigned order")]
    AlreadyAssigned { agent: AgentId },
}

pub type OrderResult<T> = Result<T, OrderError>;
