use std::future::Future;
use std::rc::Rc;

use leptos::*;
use tracing::{debug, error, info};

use crate::api::PresaleApi;
use crate::app::Services;
use crate::feed::{Subscription, TransactionFeed};
use crate::model::{
    buy_button_label, parse_sol_amount, PresaleSnapshot, StatsLines, TransactionRecord,
    TransactionRow, DEFAULT_SOL_AMOUNT, MIN_SOL_AMOUNT, SOL_AMOUNT_STEP,
};
use crate::transactions::{submit_purchase, Notifier};
use crate::wallet::{WalletButton, WalletState};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SnapshotState {
    #[default]
    Uninitialized,
    Loading,
    Loaded(PresaleSnapshot),
    Errored(String),
}

impl SnapshotState {
    pub fn snapshot(&self) -> Option<&PresaleSnapshot> {
        match self {
            SnapshotState::Loaded(s) => Some(s),
            _ => None,
        }
    }
}

/// Fetches the statistics once. No retry; a failure leaves the view in its
/// unknown form.
pub async fn load_snapshot<A: PresaleApi>(api: &A) -> SnapshotState {
    match api.presale_data().await {
        Ok(snapshot) => {
            info!(phase = snapshot.phase, sold = snapshot.sold, "presale snapshot loaded");
            SnapshotState::Loaded(snapshot)
        }
        Err(e) => {
            error!(error = %e, "presale snapshot failed to load");
            SnapshotState::Errored(e.to_string())
        }
    }
}

/// Client-observable state of the presale page.
#[derive(Clone, Copy)]
pub struct PresaleModel {
    pub sol_amount: RwSignal<String>,
    pub snapshot: RwSignal<SnapshotState>,
    pub transactions: RwSignal<Vec<TransactionRecord>>,
    pub purchasing: RwSignal<bool>,
}

impl PresaleModel {
    pub fn new() -> Self {
        Self {
            sol_amount: create_rw_signal(DEFAULT_SOL_AMOUNT.to_string()),
            snapshot: create_rw_signal(SnapshotState::Uninitialized),
            transactions: create_rw_signal(Vec::new()),
            purchasing: create_rw_signal(false),
        }
    }

    pub fn set_sol_amount(&self, value: String) {
        self.sol_amount.set(value);
    }

    /// Every batch replaces the list outright; order is the feed's.
    pub fn attach_feed<F: TransactionFeed + ?Sized>(&self, feed: &F) -> Subscription {
        let transactions = self.transactions;
        feed.subscribe(Box::new(move |batch| {
            transactions.try_set(batch);
        }))
    }

    /// Subscribes to `feed` for as long as the current reactive owner lives.
    pub fn activate<F: TransactionFeed + ?Sized>(&self, feed: &F) {
        let subscription = self.attach_feed(feed);
        on_cleanup(move || {
            subscription.dispose();
            debug!("transaction feed released");
        });
    }

    /// Marks the snapshot as loading now and fills it in once `api` answers.
    pub fn load<A>(&self, api: Rc<A>) -> impl Future<Output = ()> + 'static
    where
        A: PresaleApi + 'static,
    {
        let snapshot = self.snapshot;
        snapshot.set(SnapshotState::Loading);
        async move {
            let state = load_snapshot(api.as_ref()).await;
            snapshot.try_set(state);
        }
    }

    /// Starts a purchase of the current amount. `purchasing` is raised
    /// immediately and lowered once no purchase is outstanding.
    pub fn buy<A, F, N>(
        &self,
        services: Services<A, F, N>,
        wallet: Option<String>,
    ) -> impl Future<Output = ()> + 'static
    where
        A: PresaleApi + 'static,
        F: 'static,
        N: Notifier + 'static,
    {
        let purchasing = self.purchasing;
        let amount = self.sol_amount.get_untracked();
        purchasing.set(true);

        async move {
            let result = submit_purchase(
                services.api.as_ref(),
                services.notifier.as_ref(),
                &services.gate,
                wallet.as_deref(),
                &amount,
            )
            .await;
            if let Err(e) = result {
                debug!(error = %e, "purchase not completed");
            }
            purchasing.try_set(services.gate.is_in_flight());
        }
    }

    pub fn stats(&self) -> Option<StatsLines> {
        self.snapshot.with(|s| s.snapshot().map(StatsLines::from))
    }

    pub fn buy_label(&self) -> String {
        let amount = self.sol_amount.with(|raw| parse_sol_amount(raw));
        self.snapshot.with(|s| buy_button_label(amount, s.snapshot()))
    }

    pub fn rows(&self) -> Vec<TransactionRow> {
        self.transactions.with(|txs| txs.iter().map(TransactionRow::from).collect())
    }
}

impl Default for PresaleModel {
    fn default() -> Self {
        Self::new()
    }
}

#[component]
pub fn PresaleView() -> impl IntoView {
    let services = store_value(expect_context::<Services>());
    let wallet = expect_context::<WalletState>();
    let model = PresaleModel::new();

    // Load presale data
    spawn_local(model.load(services.with_value(|s| Rc::clone(&s.api))));

    // Real-time transactions, released with the view
    services.with_value(|s| model.activate(s.feed.as_ref()));

    let buy_tokens = move |_| {
        spawn_local(model.buy(services.get_value(), wallet.address()));
    };

    view! {
        <div class="presale">
            <WalletButton/>

            {move || model.stats().map(|lines| view! {
                <div class="stats">
                    <h2>{lines.phase}</h2>
                    <p>{lines.sold}</p>
                    <p>{lines.collected}</p>
                </div>
            })}

            {move || wallet.public_key.get().map(|_| view! {
                <div class="buy-section">
                    <input
                        type="number"
                        min=MIN_SOL_AMOUNT.to_string()
                        step=SOL_AMOUNT_STEP.to_string()
                        prop:value=move || model.sol_amount.get()
                        on:input=move |ev| model.set_sol_amount(event_target_value(&ev))
                    />
                    <button disabled=move || model.purchasing.get() on:click=buy_tokens>
                        {move || if model.purchasing.get() { "Buying…".to_string() } else { model.buy_label() }}
                    </button>
                </div>
            })}

            <div class="transactions">
                <h3>"Recent Purchases"</h3>
                {move || model.rows().into_iter().map(|row| view! {
                    <div class="tx">
                        <span>{row.user}</span>
                        <span>{format!("{} SOL", row.sol)}</span>
                        <span>{format!("{} tokens", row.tokens)}</span>
                    </div>
                }).collect_view()}
            </div>

            <div class="disclaimer">
                <p>"⚠️ Unsold tokens will be burned after presale"</p>
                <p>"10% airdrop to buyers • 33% liquidity pool"</p>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PresaleError, Result};
    use crate::feed::{FeedChannel, SharedFeed};
    use crate::model::{PurchaseRequest, PurchaseResult};
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::future::join;
    use std::cell::RefCell;

    struct SnapshotApi(Result<PresaleSnapshot>);

    impl PresaleApi for SnapshotApi {
        async fn presale_data(&self) -> Result<PresaleSnapshot> {
            self.0.clone()
        }

        async fn buy_tokens(&self, _request: &PurchaseRequest) -> Result<PurchaseResult> {
            Ok(PurchaseResult::default())
        }
    }

    fn record(user: &str, sol: f64, tokens: u64) -> TransactionRecord {
        TransactionRecord { user: user.to_string(), sol, tokens }
    }

    #[test]
    fn snapshot_load_success_and_failure() {
        let snap = PresaleSnapshot { phase: 2, sold: 10.0, collected: 1.0 };
        let loaded = block_on(load_snapshot(&SnapshotApi(Ok(snap.clone()))));
        assert_eq!(loaded, SnapshotState::Loaded(snap));

        let failed = block_on(load_snapshot(&SnapshotApi(Err(PresaleError::Decode(
            "expected value at line 1 column 1".into(),
        )))));
        assert!(matches!(failed, SnapshotState::Errored(ref m) if m.contains("expected value")));
        assert_eq!(failed.snapshot(), None);
    }

    #[test]
    fn stats_and_estimate_follow_snapshot() {
        let runtime = create_runtime();
        let model = PresaleModel::new();

        assert_eq!(model.stats(), None);
        model.set_sol_amount("2".into());
        assert_eq!(model.buy_label(), "Buy Tokens (0 tokens)");

        model.snapshot.set(SnapshotState::Loaded(PresaleSnapshot {
            phase: 0,
            sold: 500_000.0,
            collected: 120.5,
        }));
        let stats = model.stats().unwrap();
        assert_eq!(stats.phase, "Presale Phase 1");
        assert_eq!(stats.sold, "Tokens Sold: 500,000");
        assert_eq!(stats.collected, "SOL Collected: 120.5");
        assert_eq!(model.buy_label(), "Buy Tokens (2000000 tokens)");

        model.snapshot.set(SnapshotState::Errored("offline".into()));
        assert_eq!(model.stats(), None);

        runtime.dispose();
    }

    #[test]
    fn feed_pushes_replace_rows_until_released() {
        let runtime = create_runtime();
        let model = PresaleModel::new();
        let feed = FeedChannel::new();

        let subscription = model.attach_feed(&feed);

        feed.publish(&[record("Addr1111", 1.0, 1_000_000_000)]);
        let rows = model.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user, "Addr…1111");
        assert_eq!(rows[0].tokens, "1");

        feed.publish(&[record("Newr2222", 3.0, 3_000_000_000), record("Oldr3333", 0.5, 5)]);
        let users: Vec<String> = model.rows().into_iter().map(|r| r.user).collect();
        assert_eq!(users, vec!["Newr…2222".to_string(), "Oldr…3333".to_string()]);

        subscription.dispose();
        feed.publish(&[record("Late4444", 9.0, 9)]);
        assert_eq!(model.rows().len(), 2);
        assert!(feed.is_idle());

        runtime.dispose();
    }

    #[derive(Default)]
    struct Recorder {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    /// Backend double whose purchase reply arrives only when the test sends it.
    struct HeldApi {
        reply: RefCell<Option<oneshot::Receiver<PurchaseResult>>>,
    }

    impl PresaleApi for HeldApi {
        async fn presale_data(&self) -> Result<PresaleSnapshot> {
            Err(PresaleError::Http("unused".into()))
        }

        async fn buy_tokens(&self, _request: &PurchaseRequest) -> Result<PurchaseResult> {
            let rx = self.reply.borrow_mut().take().expect("one reply per test");
            rx.await.map_err(|e| PresaleError::Http(e.to_string()))
        }
    }

    #[test]
    fn load_moves_through_loading_to_loaded() {
        let runtime = create_runtime();
        let model = PresaleModel::new();
        let snap = PresaleSnapshot { phase: 1, sold: 42.0, collected: 3.0 };

        let load = model.load(Rc::new(SnapshotApi(Ok(snap.clone()))));
        assert_eq!(model.snapshot.get_untracked(), SnapshotState::Loading);
        block_on(load);
        assert_eq!(model.snapshot.get_untracked(), SnapshotState::Loaded(snap));

        runtime.dispose();
    }

    #[test]
    fn disposing_the_view_owner_releases_the_feed() {
        let runtime = create_runtime();
        let model = PresaleModel::new();
        let feed = FeedChannel::new();

        let activate = as_child_of_current_owner(move |feed: FeedChannel| model.activate(&feed));
        let ((), disposer) = activate(feed.clone());
        assert_eq!(feed.listener_count(), 1);

        feed.publish(&[record("Addr1111", 1.0, 1_000_000_000)]);
        assert_eq!(model.rows().len(), 1);

        drop(disposer);
        assert!(feed.is_idle());
        feed.publish(&[record("Late4444", 9.0, 9), record("Late5555", 2.0, 2)]);
        let users: Vec<String> = model.rows().into_iter().map(|r| r.user).collect();
        assert_eq!(users, vec!["Addr…1111".to_string()]);

        runtime.dispose();
    }

    #[test]
    fn last_view_closes_the_shared_upstream() {
        let runtime = create_runtime();
        let upstream = FeedChannel::new();
        let shared = SharedFeed::new(upstream.clone());
        let first = PresaleModel::new();
        let second = PresaleModel::new();

        let activate = as_child_of_current_owner(
            move |(model, feed): (PresaleModel, SharedFeed<FeedChannel>)| model.activate(&feed),
        );
        let ((), first_view) = activate((first, shared.clone()));
        upstream.publish(&[record("Addr1111", 1.0, 1)]);

        let ((), second_view) = activate((second, shared.clone()));
        assert_eq!(second.rows().len(), 1);
        assert_eq!(upstream.listener_count(), 1);

        drop(first_view);
        assert!(shared.is_open());
        drop(second_view);
        assert!(!shared.is_open());
        assert!(upstream.is_idle());

        runtime.dispose();
    }

    #[test]
    fn purchasing_flag_spans_the_request() {
        let runtime = create_runtime();
        let model = PresaleModel::new();
        let (tx, rx) = oneshot::channel();
        let services = Services::new(
            HeldApi { reply: RefCell::new(Some(rx)) },
            FeedChannel::new(),
            Recorder::default(),
        );
        let notifier = Rc::clone(&services.notifier);

        let purchase = model.buy(services.clone(), Some("Addr1111".into()));
        assert!(model.purchasing.get_untracked());

        let release = async {
            assert!(model.purchasing.get_untracked());
            assert!(services.gate.is_in_flight());
            tx.send(PurchaseResult { success: true, tx_signature: Some("sig".into()) })
                .expect("receiver alive");
        };
        block_on(join(purchase, release));

        assert!(!model.purchasing.get_untracked());
        assert_eq!(*notifier.messages.borrow(), vec!["Success! TX: sig".to_string()]);

        runtime.dispose();
    }

    #[test]
    fn purchasing_flag_drops_when_no_wallet() {
        let runtime = create_runtime();
        let model = PresaleModel::new();
        let services = Services::new(
            SnapshotApi(Err(PresaleError::Http("unused".into()))),
            FeedChannel::new(),
            Recorder::default(),
        );

        block_on(model.buy(services.clone(), None));

        assert!(!model.purchasing.get_untracked());
        assert!(services.notifier.messages.borrow().is_empty());

        runtime.dispose();
    }
}
