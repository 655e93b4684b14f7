//! Points ledger: balance and status mutations on cached user records.
//!
//! Every operation is a read-modify-write of the user list with no lock
//! around it. The session view is derived from that list, so a balance change
//! shows up in both places after a single write.

use wagerwave_common::{Session, Status, UserRecord};

use crate::store::{RecordStore, StoreError};

/// Top-up amounts offered by the default menu.
pub const DEFAULT_TOP_UP_AMOUNTS: [u64; 6] = [50, 100, 200, 500, 1000, 2000];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("No active session")]
    NoActiveSession,
    #[error("Session belongs to a different user")]
    SessionMismatch,
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),
    #[error("Admin role required")]
    NotAdmin,
    #[error("Balance would overflow")]
    BalanceOverflow,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct PointsLedger {
    store: RecordStore,
    top_up_amounts: Vec<u64>,
}

impl PointsLedger {
    pub fn new(store: RecordStore, top_up_amounts: Vec<u64>) -> Self {
        Self {
            store,
            top_up_amounts,
        }
    }

    /// The amounts `top_up` accepts.
    pub fn top_up_amounts(&self) -> &[u64] {
        &self.top_up_amounts
    }

    /// Add a menu amount to the signed-in user's balance.
    pub fn top_up(&self, session_user_id: &str, amount: u64) -> Result<u64, LedgerError> {
        if !self.top_up_amounts.contains(&amount) {
            tracing::warn!("Rejected top-up of {} outside the menu", amount);
            return Err(LedgerError::InvalidAmount(amount));
        }

        let session = self.store.session().ok_or(LedgerError::NoActiveSession)?;
        if session.user_id() != session_user_id {
            tracing::warn!(
                "Rejected top-up for {} while {} is signed in",
                session_user_id,
                session.user_id()
            );
            return Err(LedgerError::SessionMismatch);
        }

        let user = self.update_user(session_user_id, |user| {
            user.points = user
                .points
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow)?;
            Ok(())
        })?;

        tracing::info!("User {} topped up {} points, balance {}", user.username, amount, user.points);
        Ok(user.points)
    }

    /// Add points to any user's balance on behalf of an admin.
    pub fn admin_grant(
        &self,
        caller: &Session,
        target_user_id: &str,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        require_admin(caller)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let user = self.update_user(target_user_id, |user| {
            user.points = user
                .points
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow)?;
            Ok(())
        })?;

        tracing::info!(
            "Admin {} granted {} points to {}, balance {}",
            caller.user.username,
            amount,
            user.username,
            user.points
        );
        Ok(user.points)
    }

    /// Activate or deactivate an account on behalf of an admin.
    pub fn set_status(
        &self,
        caller: &Session,
        target_user_id: &str,
        status: Status,
    ) -> Result<UserRecord, LedgerError> {
        require_admin(caller)?;

        let user = self.update_user(target_user_id, |user| {
            user.status = status;
            Ok(())
        })?;

        tracing::info!("Admin {} set {} to {}", caller.user.username, user.username, status);
        Ok(user)
    }

    /// Apply `change` to one entry and write the list back. Nothing is
    /// written if the entry is missing or `change` fails.
    fn update_user<F>(&self, user_id: &str, change: F) -> Result<UserRecord, LedgerError>
    where
        F: FnOnce(&mut UserRecord) -> Result<(), LedgerError>,
    {
        let mut users = self.store.all_users();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        change(user)?;
        let updated = user.clone();

        self.store.put_all_users(&users)?;
        Ok(updated)
    }
}

fn require_admin(caller: &Session) -> Result<(), LedgerError> {
    if caller.is_admin() {
        Ok(())
    } else {
        tracing::warn!("Non-admin {} attempted an admin operation", caller.user.username);
        Err(LedgerError::NotAdmin)
    }
}
