#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Cash ledger of the broker.
///
/// Arithmetic is unchecked: cash may go negative since orders are accepted
/// without an affordability check.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Wallet {
    // Snapshot used for reset
    starting_cash: f64,
    cash: f64,
    // Cumulative commission paid
    commission: f64,
    // Cumulative mark-to-market settled
    settled: f64,
}

impl Wallet {
    /// Creates a new wallet with the given starting cash.
    /// Non-positive amounts are rejected.
    pub fn new(cash: f64) -> Result<Self> {
        if !(cash > 0.0 && cash.is_finite()) {
            return Err(Error::NegZeroBalance(cash));
        }

        Ok(Self {
            cash,
            starting_cash: cash,
            commission: 0.0,
            settled: 0.0,
        })
    }

    /// Returns the current cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the starting cash.
    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    /// Returns the commission paid so far.
    pub fn commission_paid(&self) -> f64 {
        self.commission
    }

    /// Returns the mark-to-market profit and loss settled so far.
    pub fn settled_pnl(&self) -> f64 {
        self.settled
    }

    /// Overwrites both the cash and the starting cash.
    pub(crate) fn set_cash(&mut self, cash: f64) {
        self.cash = cash;
        self.starting_cash = cash;
    }

    /// Applies a signed cash movement.
    pub(crate) fn add(&mut self, amount: f64) {
        self.cash += amount;
    }

    /// Charges a commission.
    pub(crate) fn sub_commission(&mut self, amount: f64) {
        self.cash -= amount;
        self.commission += amount;
    }

    /// Settles a mark-to-market profit (positive) or loss (negative).
    pub(crate) fn settle(&mut self, amount: f64) {
        self.cash += amount;
        self.settled += amount;
    }

    /// Resets the wallet to its starting cash.
    pub(crate) fn reset(&mut self) {
        self.commission = 0.0;
        self.settled = 0.0;
        self.cash = self.starting_cash;
    }
}

#[cfg(test)]
#[test]
fn new_wallet_valid_cash() {
    let wallet = Wallet::new(100.0).unwrap();
    assert_eq!(wallet.cash(), 100.0);
    assert_eq!(wallet.starting_cash(), 100.0);
    assert_eq!(wallet.commission_paid(), 0.0);
}

#[cfg(test)]
#[test]
fn new_wallet_invalid_cash() {
    let result = Wallet::new(0.0);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let result = Wallet::new(-10.0);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let result = Wallet::new(f64::INFINITY);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));
}

#[cfg(test)]
#[test]
fn movements() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.add(-40.0);
    wallet.sub_commission(1.5);
    wallet.settle(-3.5);
    assert_eq!(wallet.cash(), 55.0);
    assert_eq!(wallet.commission_paid(), 1.5);
    assert_eq!(wallet.settled_pnl(), -3.5);
}

#[cfg(test)]
#[test]
fn cash_may_go_negative() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.add(-250.0);
    assert_eq!(wallet.cash(), -150.0);
}

#[cfg(test)]
#[test]
fn set_cash_moves_starting_point() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.set_cash(500.0);
    wallet.add(-100.0);
    assert_eq!(wallet.cash(), 400.0);

    wallet.reset();
    assert_eq!(wallet.cash(), 500.0);
    assert_eq!(wallet.starting_cash(), 500.0);
}

#[cfg(test)]
#[test]
fn reset_wallet() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.add(-20.0);
    wallet.sub_commission(0.2);
    wallet.settle(4.0);

    wallet.reset();
    assert_eq!(wallet.cash(), 100.0);
    assert_eq!(wallet.commission_paid(), 0.0);
    assert_eq!(wallet.settled_pnl(), 0.0);
}
