use std::cell::Cell;
use std::rc::Rc;

use tracing::{info, warn};

use crate::api::PresaleApi;
use crate::error::{PresaleError, Result};
use crate::model::{PurchaseRequest, PurchaseResult, SolAmount};

/// One-shot, blocking user notification.
pub trait Notifier {
    fn notify(&self, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNotifier;

impl Notifier for BrowserNotifier {
    fn notify(&self, message: &str) {
        match web_sys::window() {
            Some(w) => {
                if let Err(e) = w.alert_with_message(message) {
                    warn!(?e, "alert failed");
                }
            }
            None => log_unshown(message),
        }
    }
}

fn log_unshown(message: &str) {
    warn!(notification = message, "no window to notify");
}

/// Keeps purchases single-flight. Cheap to clone; clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct PurchaseGate {
    in_flight: Rc<Cell<bool>>,
}

/// Held while a purchase is outstanding; reopens the gate on drop.
#[derive(Debug)]
pub struct FlightGuard {
    in_flight: Rc<Cell<bool>>,
}

impl PurchaseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    pub fn try_begin(&self) -> Option<FlightGuard> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(FlightGuard { in_flight: Rc::clone(&self.in_flight) })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}

/// What a submitted purchase ended as, once the request resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum PurchaseOutcome {
    Confirmed { tx_signature: Option<String> },
    Declined,
}

pub fn success_message(tx_signature: Option<&str>) -> String {
    match tx_signature {
        Some(sig) => format!("Success! TX: {}", sig),
        None => "Success!".to_string(),
    }
}

pub fn failure_message(err: &PresaleError) -> String {
    format!("Transaction failed: {}", err)
}

/// Sends one purchase for `wallet` and reports the result through
/// `notifier`.
///
/// The amount is forwarded as typed, parsed or not. A declined purchase
/// (`success: false`) produces no notification. Calls
/// made while another purchase is outstanding, or without a wallet, fail
/// before any request is sent and notify nobody.
pub async fn submit_purchase<A, N>(
    api: &A,
    notifier: &N,
    gate: &PurchaseGate,
    wallet: Option<&str>,
    raw_amount: &str,
) -> Result<PurchaseOutcome>
where
    A: PresaleApi,
    N: Notifier,
{
    let wallet = wallet.ok_or(PresaleError::WalletNotConnected)?;
    let _guard = gate.try_begin().ok_or(PresaleError::PurchaseInFlight)?;

    let request = PurchaseRequest {
        user_wallet: wallet.to_string(),
        sol_amount: SolAmount::from_input(raw_amount),
    };
    let result = api.buy_tokens(&request).await;

    match result {
        Ok(PurchaseResult { success: true, tx_signature }) => {
            info!(tx = tx_signature.as_deref().unwrap_or("-"), "purchase confirmed");
            notifier.notify(&success_message(tx_signature.as_deref()));
            Ok(PurchaseOutcome::Confirmed { tx_signature })
        }
        Ok(PurchaseResult { success: false, .. }) => {
            warn!(wallet, "purchase declined by backend");
            Ok(PurchaseOutcome::Declined)
        }
        Err(e) => {
            warn!(error = %e, "purchase failed");
            notifier.notify(&failure_message(&e));
            Err(e)
        }
    }
}
