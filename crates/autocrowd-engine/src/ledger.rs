//! # Fund Ledger
//!
//! The engine decides *that* money moves; a [`FundLedger`] moves it. On a
//! chain that is the escrow contract's transfer call; in tests and
//! simulations it is [`InMemoryLedger`].
//!
//! `execute` is called while the campaign lock is held and before the new
//! campaign state is committed. An `Err` aborts the operation.

use std::collections::HashMap;

use autocrowd_core::{Address, Amount};
use autocrowd_state::TransferInstruction;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors reported by a fund ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger refused or failed the transfer.
    #[error("transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        /// Intended recipient.
        recipient: Address,
        /// Intended amount.
        amount: Amount,
        /// Ledger-specific cause.
        reason: String,
    },

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Executes outbound escrow transfers.
pub trait FundLedger: Send + Sync {
    /// Move funds as instructed.
    fn execute(&self, instruction: &TransferInstruction) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerBook {
    balances: HashMap<Address, Amount>,
    history: Vec<TransferInstruction>,
}

/// A ledger that credits recipients in memory and keeps every instruction.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    book: Mutex<LedgerBook>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total credited to `address`.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.book
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Executed instructions, oldest first.
    pub fn history(&self) -> Vec<TransferInstruction> {
        self.book.lock().history.clone()
    }
}

impl FundLedger for InMemoryLedger {
    fn execute(&self, instruction: &TransferInstruction) -> Result<(), LedgerError> {
        let mut book = self.book.lock();
        let current = book
            .balances
            .get(&instruction.recipient)
            .copied()
            .unwrap_or(Amount::ZERO);
        let credited = current
            .checked_add(instruction.amount)
            .ok_or_else(|| LedgerError::TransferFailed {
                recipient: instruction.recipient.clone(),
                amount: instruction.amount,
                reason: "recipient balance overflow".into(),
            })?;
        book.balances.insert(instruction.recipient.clone(), credited);
        book.history.push(instruction.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocrowd_core::CampaignId;
    use autocrowd_state::TransferKind;

    fn refund(to: &Address, amount: u128) -> TransferInstruction {
        TransferInstruction {
            campaign: CampaignId::new(),
            recipient: to.clone(),
            amount: Amount::new(amount),
            kind: TransferKind::Refund,
        }
    }

    #[test]
    fn credits_and_records() {
        let ledger = InMemoryLedger::new();
        let to = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        ledger.execute(&refund(&to, 300)).unwrap();
        ledger.execute(&refund(&to, 200)).unwrap();
        assert_eq!(ledger.balance_of(&to), Amount::new(500));
        assert_eq!(ledger.history().len(), 2);
    }

    #[test]
    fn overflow_is_rejected_without_recording() {
        let ledger = InMemoryLedger::new();
        let to = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        ledger.execute(&refund(&to, u128::MAX)).unwrap();
        assert!(matches!(
            ledger.execute(&refund(&to, 1)),
            Err(LedgerError::TransferFailed { .. })
        ));
        assert_eq!(ledger.history().len(), 1);
    }
}
