//! Transition rules for asset status, maintenance records and stationery stock.
//!
//! Services call these before touching storage so every status change goes
//! through one place.

use crate::entities::{AssetStatus, MaintenanceStatus};
use crate::errors::ServiceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Asset is not available (Status: {0})")]
    AssetUnavailable(AssetStatus),

    #[error("This asset has already been checked in.")]
    AlreadyCheckedIn,

    #[error("Asset is checked out; check it in before scheduling maintenance.")]
    CheckedOut,

    #[error("Asset is out of service; reinstate it before scheduling maintenance.")]
    Retired,

    #[error("Maintenance record is already completed.")]
    MaintenanceCompleted,

    #[error("Only available assets can be taken out of service (Status: {0})")]
    CannotRetire(AssetStatus),

    #[error("Asset is not out of service (Status: {0})")]
    NotRetired(AssetStatus),

    #[error("Cannot subtract {requested}; only {available} in stock.")]
    InsufficientStock { requested: i32, available: i32 },
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InsufficientStock { .. } => {
                ServiceError::InsufficientStock(err.to_string())
            }
            other => ServiceError::InvalidOperation(other.to_string()),
        }
    }
}

impl AssetStatus {
    /// Available -> In-use
    pub fn check_out(self) -> Result<AssetStatus, TransitionError> {
        match self {
            AssetStatus::Available => Ok(AssetStatus::InUse),
            other => Err(TransitionError::AssetUnavailable(other)),
        }
    }

    /// Closing a checkout always frees the asset; the open checkout row is the guard.
    pub fn check_in(self) -> AssetStatus {
        AssetStatus::Available
    }

    /// Opening a maintenance record; refused while the asset is on loan
    pub fn begin_maintenance(self) -> Result<AssetStatus, TransitionError> {
        match self {
            AssetStatus::InUse => Err(TransitionError::CheckedOut),
            AssetStatus::OutOfService => Err(TransitionError::Retired),
            AssetStatus::Available | AssetStatus::Maintenance => Ok(AssetStatus::Maintenance),
        }
    }

    pub fn retire(self) -> Result<AssetStatus, TransitionError> {
        match self {
            AssetStatus::Available => Ok(AssetStatus::OutOfService),
            other => Err(TransitionError::CannotRetire(other)),
        }
    }

    pub fn reinstate(self) -> Result<AssetStatus, TransitionError> {
        match self {
            AssetStatus::OutOfService => Ok(AssetStatus::Available),
            other => Err(TransitionError::NotRetired(other)),
        }
    }
}

/// Effects of moving a maintenance record into a new status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceStep {
    pub status: MaintenanceStatus,
    pub asset_status: AssetStatus,
    pub sets_end_date: bool,
}

impl MaintenanceStatus {
    /// Asset status implied by a record in this state
    pub fn asset_status(self) -> AssetStatus {
        match self {
            MaintenanceStatus::Completed => AssetStatus::Available,
            MaintenanceStatus::Pending | MaintenanceStatus::InProgress => AssetStatus::Maintenance,
        }
    }

    /// Completed is terminal.
    pub fn transition_to(self, next: MaintenanceStatus) -> Result<MaintenanceStep, TransitionError> {
        if self == MaintenanceStatus::Completed {
            return Err(TransitionError::MaintenanceCompleted);
        }
        Ok(MaintenanceStep {
            status: next,
            asset_status: next.asset_status(),
            sets_end_date: next == MaintenanceStatus::Completed,
        })
    }
}

/// Signed change to a stationery quantity; amounts are at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Add(i32),
    Subtract(i32),
}

impl StockAdjustment {
    /// Builds an adjustment from the form's `action` and amount
    pub fn parse(action: &str, amount: i32) -> Option<Self> {
        if amount < 1 {
            return None;
        }
        match action.trim().to_ascii_lowercase().as_str() {
            "add" => Some(StockAdjustment::Add(amount)),
            "subtract" | "remove" => Some(StockAdjustment::Subtract(amount)),
            _ => None,
        }
    }

    pub fn amount(self) -> i32 {
        match self {
            StockAdjustment::Add(n) | StockAdjustment::Subtract(n) => n,
        }
    }

    /// New quantity, or an error when a subtraction would go below zero
    pub fn apply(self, current: i32) -> Result<i32, TransitionError> {
        match self {
            StockAdjustment::Add(n) => Ok(current.saturating_add(n)),
            StockAdjustment::Subtract(n) if n > current => Err(TransitionError::InsufficientStock {
                requested: n,
                available: current,
            }),
            StockAdjustment::Subtract(n) => Ok(current - n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(AssetStatus::InUse)]
    #[case(AssetStatus::Maintenance)]
    #[case(AssetStatus::OutOfService)]
    fn checkout_requires_available(#[case] status: AssetStatus) {
        assert_eq!(
            status.check_out(),
            Err(TransitionError::AssetUnavailable(status))
        );
    }

    #[test]
    fn checkout_then_checkin_round_trips() {
        let out = AssetStatus::Available.check_out().unwrap();
        assert_eq!(out, AssetStatus::InUse);
        assert_eq!(out.check_in(), AssetStatus::Available);
    }

    #[test]
    fn unavailable_message_names_status() {
        let err = AssetStatus::Maintenance.check_out().unwrap_err();
        assert_eq!(err.to_string(), "Asset is not available (Status: Maintenance)");
    }

    #[test]
    fn maintenance_needs_an_asset_in_service() {
        assert_eq!(
            AssetStatus::InUse.begin_maintenance(),
            Err(TransitionError::CheckedOut)
        );
        assert_eq!(
            AssetStatus::OutOfService.begin_maintenance(),
            Err(TransitionError::Retired)
        );
        assert_eq!(
            AssetStatus::Available.begin_maintenance(),
            Ok(AssetStatus::Maintenance)
        );
    }

    #[rstest]
    #[case(MaintenanceStatus::Pending, MaintenanceStatus::InProgress, AssetStatus::Maintenance, false)]
    #[case(MaintenanceStatus::InProgress, MaintenanceStatus::Completed, AssetStatus::Available, true)]
    #[case(MaintenanceStatus::Pending, MaintenanceStatus::Completed, AssetStatus::Available, true)]
    #[case(MaintenanceStatus::InProgress, MaintenanceStatus::Pending, AssetStatus::Maintenance, false)]
    fn maintenance_steps(
        #[case] from: MaintenanceStatus,
        #[case] to: MaintenanceStatus,
        #[case] asset: AssetStatus,
        #[case] end_date: bool,
    ) {
        let step = from.transition_to(to).unwrap();
        assert_eq!(step.status, to);
        assert_eq!(step.asset_status, asset);
        assert_eq!(step.sets_end_date, end_date);
    }

    #[test]
    fn completed_maintenance_is_terminal() {
        for next in MaintenanceStatus::ALL {
            assert_eq!(
                MaintenanceStatus::Completed.transition_to(next),
                Err(TransitionError::MaintenanceCompleted)
            );
        }
    }

    #[test]
    fn retire_and_reinstate() {
        let retired = AssetStatus::Available.retire().unwrap();
        assert_eq!(retired, AssetStatus::OutOfService);
        assert_eq!(retired.reinstate(), Ok(AssetStatus::Available));
        assert_matches!(
            AssetStatus::InUse.retire(),
            Err(TransitionError::CannotRetire(AssetStatus::InUse))
        );
        assert_matches!(
            AssetStatus::Available.reinstate(),
            Err(TransitionError::NotRetired(_))
        );
    }

    #[test]
    fn stock_parse_rejects_bad_input() {
        assert_eq!(StockAdjustment::parse("add", 5), Some(StockAdjustment::Add(5)));
        assert_eq!(
            StockAdjustment::parse("Subtract", 2),
            Some(StockAdjustment::Subtract(2))
        );
        assert_eq!(StockAdjustment::parse("add", 0), None);
        assert_eq!(StockAdjustment::parse("multiply", 3), None);
    }

    #[test]
    fn over_subtraction_is_rejected() {
        assert_eq!(
            StockAdjustment::Subtract(11).apply(10),
            Err(TransitionError::InsufficientStock {
                requested: 11,
                available: 10
            })
        );
        assert_eq!(StockAdjustment::Subtract(10).apply(10), Ok(0));
    }

    #[test]
    fn insufficient_stock_maps_to_stock_error() {
        let err: ServiceError = StockAdjustment::Subtract(3).apply(1).unwrap_err().into();
        assert_matches!(err, ServiceError::InsufficientStock(_));
        let err: ServiceError = TransitionError::AlreadyCheckedIn.into();
        assert_matches!(err, ServiceError::InvalidOperation(msg) if msg == "This asset has already been checked in.");
    }

    fn adjustment() -> impl Strategy<Value = StockAdjustment> {
        prop_oneof![
            (1..500i32).prop_map(StockAdjustment::Add),
            (1..500i32).prop_map(StockAdjustment::Subtract),
        ]
    }

    proptest! {
        #[test]
        fn quantity_never_goes_negative(start in 0..1000i32, ops in prop::collection::vec(adjustment(), 0..64)) {
            let mut quantity = start;
            for op in ops {
                if let Ok(next) = op.apply(quantity) {
                    quantity = next;
                }
                prop_assert!(quantity >= 0);
            }
        }
    }
}
