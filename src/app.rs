use std::rc::Rc;

use leptos::*;
use leptos_meta::*;
use leptos_router::*;
use tracing::{error, info};

use crate::api::HttpPresaleApi;
use crate::config::Config;
use crate::firestore::FirestoreFeed;
use crate::presale::PresaleView;
use crate::transactions::{BrowserNotifier, PurchaseGate};
use crate::wallet::WalletState;

/// Collaborators built once per page and handed to the view through context.
pub struct Services<A = HttpPresaleApi, F = FirestoreFeed, N = BrowserNotifier> {
    pub api: Rc<A>,
    pub feed: Rc<F>,
    pub notifier: Rc<N>,
    pub gate: PurchaseGate,
}

impl<A, F, N> Clone for Services<A, F, N> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            feed: Rc::clone(&self.feed),
            notifier: Rc::clone(&self.notifier),
            gate: self.gate.clone(),
        }
    }
}

impl<A, F, N> Services<A, F, N> {
    pub fn new(api: A, feed: F, notifier: N) -> Self {
        Self {
            api: Rc::new(api),
            feed: Rc::new(feed),
            notifier: Rc::new(notifier),
            gate: PurchaseGate::new(),
        }
    }
}

impl Services {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            HttpPresaleApi::new(config.api_url.clone()),
            FirestoreFeed::firestore(&config.firebase),
            BrowserNotifier,
        )
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    provide_context(WalletState::new());

    let content = match Config::from_build_env() {
        Ok(config) => {
            info!(api = %config.api_url, project = %config.firebase.project_id, "presale view starting");
            provide_context(Services::from_config(&config));
            view! {
                <Router>
                    <main class="container">
                        <Routes>
                            <Route path="" view=PresaleView/>
                        </Routes>
                    </main>
                </Router>
            }
            .into_view()
        }
        Err(e) => {
            error!(error = %e, "presale view not started");
            view! { <ConfigError message=e.to_string()/> }.into_view()
        }
    };

    view! {
        <Title text="Token Presale"/>
        {content}
    }
}

#[component]
fn ConfigError(message: String) -> impl IntoView {
    view! {
        <main class="container">
            <div class="warning-box">
                <h3>"Presale unavailable"</h3>
                <p>{message}</p>
            </div>
        </main>
    }
}
