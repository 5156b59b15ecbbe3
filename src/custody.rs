// 9.2 custody.rs: the ledger decides amounts, custody moves them.
// CollateralCustody is the seam. InMemoryCustody is the mock: balances only, no tokens.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{AccountId, Quote};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Account {account:?} has {available}, needs {requested}")]
    InsufficientBalance {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Vault holds {available}, cannot pay out {requested}")]
    VaultInsufficient { available: Decimal, requested: Decimal },

    #[error("Invalid transfer amount {0}")]
    InvalidAmount(Decimal),

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Moves collateral between traders and the venue's vault on the ledger's instruction.
///
/// Implementations must be all-or-nothing per call. The ledger commits its own state only
/// after every instruction of an operation has succeeded.
pub trait CollateralCustody {
    fn transfer_in(&mut self, from: AccountId, amount: Quote) -> Result<(), CustodyError>;
    fn transfer_out(&mut self, to: AccountId, amount: Quote) -> Result<(), CustodyError>;

    /// Pays several accounts for one ledger operation, in order.
    ///
    /// The default stops at the first failure, so transfers before it stand. Override
    /// when the backend can check or apply the whole batch at once.
    fn transfer_out_all(&mut self, transfers: &[(AccountId, Quote)]) -> Result<(), CustodyError> {
        for &(to, amount) in transfers {
            self.transfer_out(to, amount)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub kind: TransferKind,
    pub account: AccountId,
    pub amount: Quote,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    wallets: HashMap<AccountId, Decimal>,
    vault: Decimal,
    history: Vec<TransferRecord>,
    reject_all: bool,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    // credit a trader's external wallet
    pub fn fund(&mut self, account: AccountId, amount: Decimal) {
        *self.wallets.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    // liquidity backing profitable closes
    pub fn seed_vault(&mut self, amount: Decimal) {
        self.vault += amount;
    }

    pub fn wallet(&self, account: AccountId) -> Decimal {
        self.wallets.get(&account).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn vault_balance(&self) -> Decimal {
        self.vault
    }

    pub fn history(&self) -> &[TransferRecord] {
        &self.history
    }

    // failure injection for atomicity tests
    pub fn set_reject_all(&mut self, reject: bool) {
        self.reject_all = reject;
    }

    fn check(&self, amount: Quote) -> Result<(), CustodyError> {
        if self.reject_all {
            return Err(CustodyError::Rejected("custody offline".to_string()));
        }
        if amount.is_negative() {
            return Err(CustodyError::InvalidAmount(amount.value()));
        }
        Ok(())
    }
}

impl CollateralCustody for InMemoryCustody {
    fn transfer_in(&mut self, from: AccountId, amount: Quote) -> Result<(), CustodyError> {
        self.check(amount)?;

        let available = self.wallet(from);
        if available < amount.value() {
            return Err(CustodyError::InsufficientBalance {
                account: from,
                available,
                requested: amount.value(),
            });
        }

        self.vault = self
            .vault
            .checked_add(amount.value())
            .ok_or_else(|| CustodyError::Rejected("vault balance out of range".to_string()))?;
        *self.wallets.entry(from).or_insert(Decimal::ZERO) -= amount.value();
        self.history.push(TransferRecord {
            kind: TransferKind::In,
            account: from,
            amount,
        });
        Ok(())
    }

    fn transfer_out(&mut self, to: AccountId, amount: Quote) -> Result<(), CustodyError> {
        self.check(amount)?;

        if self.vault < amount.value() {
            return Err(CustodyError::VaultInsufficient {
                available: self.vault,
                requested: amount.value(),
            });
        }

        let wallet = self.wallet(to);
        let credited = wallet
            .checked_add(amount.value())
            .ok_or_else(|| CustodyError::Rejected(format!("wallet {} out of range", to.0)))?;
        self.vault -= amount.value();
        self.wallets.insert(to, credited);
        self.history.push(TransferRecord {
            kind: TransferKind::Out,
            account: to,
            amount,
        });
        Ok(())
    }

    // checks the whole batch against the vault before moving anything
    fn transfer_out_all(&mut self, transfers: &[(AccountId, Quote)]) -> Result<(), CustodyError> {
        let mut total = Decimal::ZERO;
        for &(_, amount) in transfers {
            self.check(amount)?;
            total = total.saturating_add(amount.value());
        }
        if self.vault < total {
            return Err(CustodyError::VaultInsufficient {
                available: self.vault,
                requested: total,
            });
        }

        for &(to, amount) in transfers {
            self.transfer_out(to, amount)?;
        }
        Ok(())
    }
}
