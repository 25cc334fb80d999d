//! Transfer decision rule.
//!
//! The sign of `amount` picks the direction:
//!
//! - `amount >= 0`: debit `sender`, credit `receiver` by `amount`, allowed
//!   only if `sender.balance >= amount`.
//! - `amount < 0` (a charge): debit `receiver`, credit `sender` by `|amount|`,
//!   allowed only if `receiver.balance >= |amount|`.

use serde::{Deserialize, Serialize};

use bankledger_core::{LedgerError, LedgerResult};

/// Inbound transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
    pub memo: String,
}

impl TransferRequest {
    /// Strip surrounding whitespace from the account names, matching how
    /// account names are stored.
    pub fn normalize(&mut self) {
        for name in [&mut self.sender, &mut self.receiver] {
            let trimmed = name.trim();
            if trimmed.len() != name.len() {
                *name = trimmed.to_string();
            }
        }
    }

    /// Argument validation (step 1). Nothing is logged for these failures.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.memo.trim().is_empty() {
            return Err(LedgerError::invalid_argument("memo must not be empty"));
        }
        if self.sender.trim().is_empty() {
            return Err(LedgerError::invalid_argument("sender must not be empty"));
        }
        if self.receiver.trim().is_empty() {
            return Err(LedgerError::invalid_argument("receiver must not be empty"));
        }
        if self.amount == i64::MIN {
            return Err(LedgerError::invalid_argument("amount is out of range"));
        }
        Ok(())
    }

    /// The balance movement this request asks for, before any checks.
    pub fn posting(&self) -> Posting {
        if self.amount < 0 {
            Posting {
                debit: self.receiver.clone(),
                credit: self.sender.clone(),
                magnitude: self.amount.unsigned_abs() as i64,
            }
        } else {
            Posting {
                debit: self.sender.clone(),
                credit: self.receiver.clone(),
                magnitude: self.amount,
            }
        }
    }

    pub fn is_self_transfer(&self) -> bool {
        self.sender == self.receiver
    }
}

/// A directed, non-negative balance movement between two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub debit: String,
    pub credit: String,
    pub magnitude: i64,
}

impl Posting {
    /// `(account, delta)` pairs, debit first.
    pub fn deltas(&self) -> [(&str, i64); 2] {
        [
            (self.debit.as_str(), -self.magnitude),
            (self.credit.as_str(), self.magnitude),
        ]
    }
}

/// Why a transfer attempt was rejected after argument validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rejection {
    ReceiverNotFound,
    SenderNotFound,
    InsufficientFunds,
    BalanceOverflow,
}

impl Rejection {
    /// Reason text stored on the `Failed` log record.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::ReceiverNotFound => "receiver account not found",
            Rejection::SenderNotFound => "sender account not found",
            Rejection::InsufficientFunds => "insufficient funds",
            Rejection::BalanceOverflow => "credited balance would overflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Apply(Posting),
    Reject(Rejection),
}

/// Decide a validated request against the current balances.
///
/// `None` means the account does not exist. Checks run receiver first, then
/// sender, then sufficiency.
pub fn decide(
    request: &TransferRequest,
    sender_balance: Option<i64>,
    receiver_balance: Option<i64>,
) -> Decision {
    let Some(receiver_balance) = receiver_balance else {
        return Decision::Reject(Rejection::ReceiverNotFound);
    };
    let Some(sender_balance) = sender_balance else {
        return Decision::Reject(Rejection::SenderNotFound);
    };

    let posting = request.posting();
    let (debit_balance, credit_balance) = if request.amount < 0 {
        (receiver_balance, sender_balance)
    } else {
        (sender_balance, receiver_balance)
    };

    if debit_balance < posting.magnitude {
        return Decision::Reject(Rejection::InsufficientFunds);
    }
    if !request.is_self_transfer() && credit_balance.checked_add(posting.magnitude).is_none() {
        return Decision::Reject(Rejection::BalanceOverflow);
    }

    Decision::Apply(posting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn req(sender: &str, receiver: &str, amount: i64) -> TransferRequest {
        TransferRequest {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            memo: "memo".to_string(),
        }
    }

    #[test]
    fn empty_fields_are_invalid_arguments() {
        let mut r = req("a", "b", 1);
        r.memo = " ".to_string();
        assert!(matches!(r.validate(), Err(LedgerError::InvalidArgument(_))));

        assert!(matches!(req("", "b", 1).validate(), Err(LedgerError::InvalidArgument(_))));
        assert!(matches!(req("a", "", 1).validate(), Err(LedgerError::InvalidArgument(_))));
        assert!(matches!(req("a", "b", i64::MIN).validate(), Err(LedgerError::InvalidArgument(_))));
        assert!(req("a", "b", 0).validate().is_ok());
    }

    #[test]
    fn normalize_trims_account_names_only() {
        let mut r = req(" alice ", "\tbob", 5);
        r.memo = " lunch ".to_string();
        r.normalize();

        assert_eq!((r.sender.as_str(), r.receiver.as_str()), ("alice", "bob"));
        assert_eq!(r.memo, " lunch ");
        assert!(!r.is_self_transfer());
    }

    #[test]
    fn receiver_is_checked_before_sender() {
        let d = decide(&req("a", "b", 1), None, None);
        assert_eq!(d, Decision::Reject(Rejection::ReceiverNotFound));

        let d = decide(&req("a", "b", 1), None, Some(0));
        assert_eq!(d, Decision::Reject(Rejection::SenderNotFound));
    }

    #[test]
    fn positive_amount_debits_sender() {
        let d = decide(&req("a", "b", 30), Some(100), Some(0));
        let Decision::Apply(p) = d else { panic!("expected apply") };
        assert_eq!(p.deltas(), [("a", -30), ("b", 30)]);
    }

    #[test]
    fn negative_amount_charges_receiver() {
        // "from A to B" with -10: B pays A.
        let d = decide(&req("a", "b", -10), Some(70), Some(30));
        let Decision::Apply(p) = d else { panic!("expected apply") };
        assert_eq!(p.deltas(), [("b", -10), ("a", 10)]);
    }

    #[test]
    fn negative_amount_checks_receiver_balance() {
        let d = decide(&req("a", "b", -31), Some(1_000), Some(30));
        assert_eq!(d, Decision::Reject(Rejection::InsufficientFunds));
    }

    #[test]
    fn sender_cannot_overdraw() {
        let d = decide(&req("a", "b", 101), Some(100), Some(0));
        assert_eq!(d, Decision::Reject(Rejection::InsufficientFunds));

        let d = decide(&req("a", "b", 100), Some(100), Some(0));
        assert!(matches!(d, Decision::Apply(_)));
    }

    #[test]
    fn zero_amount_is_a_valid_no_op() {
        let d = decide(&req("a", "b", 0), Some(0), Some(0));
        let Decision::Apply(p) = d else { panic!("expected apply") };
        assert_eq!(p.magnitude, 0);
    }

    #[test]
    fn self_transfer_is_allowed_but_still_checked() {
        let d = decide(&req("a", "a", 5), Some(5), Some(5));
        assert!(matches!(d, Decision::Apply(_)));

        let d = decide(&req("a", "a", 6), Some(5), Some(5));
        assert_eq!(d, Decision::Reject(Rejection::InsufficientFunds));
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let d = decide(&req("a", "b", 1), Some(1), Some(i64::MAX));
        assert_eq!(d, Decision::Reject(Rejection::BalanceOverflow));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any sequence of decided transfers never creates
        /// or destroys money and never drives a balance below zero.
        #[test]
        fn transfers_conserve_total_and_stay_non_negative(
            opening in prop::collection::vec(0i64..10_000, 3),
            transfers in prop::collection::vec((0usize..3, 0usize..3, -5_000i64..5_000), 1..40),
        ) {
            let names = ["a", "b", "c"];
            let mut balances: HashMap<&str, i64> =
                names.iter().copied().zip(opening.iter().copied()).collect();
            let total: i64 = opening.iter().sum();

            for (s, r, amount) in transfers {
                let request = req(names[s], names[r], amount);
                let decision = decide(
                    &request,
                    balances.get(names[s]).copied(),
                    balances.get(names[r]).copied(),
                );
                if let Decision::Apply(posting) = decision {
                    for (account, delta) in posting.deltas() {
                        *balances.get_mut(account).unwrap() += delta;
                    }
                }
            }

            prop_assert_eq!(balances.values().sum::<i64>(), total);
            prop_assert!(balances.values().all(|b| *b >= 0));
        }
    }
}
