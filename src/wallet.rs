use gloo_storage::{LocalStorage, Storage};
use js_sys::{Array, Function, Object, Promise, Reflect};
use leptos::*;
use tracing::{debug, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::{js_message, PresaleError, Result};
use crate::model::short_address;

pub const AUTOCONNECT_KEY: &str = "presale_wallet_autoconnect";
pub const INSTALL_URL: &str = "https://phantom.app/";

/// Connected wallet as seen by the rest of the page: an address or nothing.
#[derive(Clone, Copy)]
pub struct WalletState {
    pub public_key: RwSignal<Option<String>>,
    pub connecting: RwSignal<bool>,
}

impl WalletState {
    pub fn new() -> Self {
        Self {
            public_key: create_rw_signal(None),
            connecting: create_rw_signal(false),
        }
    }

    pub fn address(&self) -> Option<String> {
        self.public_key.get_untracked()
    }
}

impl Default for WalletState {
    fn default() -> Self {
        Self::new()
    }
}

fn js_err(value: JsValue) -> PresaleError {
    PresaleError::Wallet(js_message(&value))
}

/// The injected provider (`window.solana`), if the browser has one.
fn provider() -> Option<JsValue> {
    let window = web_sys::window()?;
    let solana = Reflect::get(&window, &JsValue::from_str("solana")).ok()?;
    if solana.is_undefined() || solana.is_null() {
        None
    } else {
        Some(solana)
    }
}

pub fn has_provider() -> bool {
    provider().is_some()
}

fn method(target: &JsValue, name: &str) -> Result<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(js_err)?
        .dyn_into::<Function>()
        .map_err(|_| PresaleError::Wallet(format!("provider has no {}()", name)))
}

async fn call(target: &JsValue, name: &str, args: &Array) -> Result<JsValue> {
    let ret = method(target, name)?.apply(target, args).map_err(js_err)?;
    match ret.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await.map_err(js_err),
        Err(value) => Ok(value),
    }
}

fn key_to_string(key: &JsValue) -> Result<String> {
    if key.is_undefined() || key.is_null() {
        return Err(PresaleError::WalletNotConnected);
    }
    if let Some(s) = key.as_string() {
        return Ok(s);
    }
    method(key, "toString")?
        .call0(key)
        .map_err(js_err)?
        .as_string()
        .ok_or_else(|| PresaleError::Wallet("public key is not printable".into()))
}

/// Asks the wallet to connect. With `only_if_trusted` the wallet answers
/// without a prompt, failing if the site was not approved before.
pub async fn connect(only_if_trusted: bool) -> Result<String> {
    let provider = provider().ok_or_else(|| PresaleError::Wallet("no Solana wallet found".into()))?;

    let opts = Object::new();
    if only_if_trusted {
        Reflect::set(&opts, &JsValue::from_str("onlyIfTrusted"), &JsValue::TRUE).map_err(js_err)?;
    }
    let resp = call(&provider, "connect", &Array::of1(&opts)).await?;

    // Some wallets resolve with `{ publicKey }`, others only update the provider.
    let key = Reflect::get(&resp, &JsValue::from_str("publicKey"))
        .ok()
        .filter(|k| !k.is_undefined() && !k.is_null())
        .or_else(|| Reflect::get(&provider, &JsValue::from_str("publicKey")).ok())
        .unwrap_or(JsValue::UNDEFINED);
    key_to_string(&key)
}

pub async fn disconnect() -> Result<()> {
    match provider() {
        Some(provider) => call(&provider, "disconnect", &Array::new()).await.map(|_| ()),
        None => Ok(()),
    }
}

/// Mirrors disconnects and account switches made inside the wallet.
fn watch_provider(wallet: WalletState) {
    let Some(provider) = provider() else { return };

    let on_disconnect = Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| {
        info!("wallet disconnected");
        wallet.public_key.try_set(None);
    });
    let on_account = Closure::<dyn FnMut(JsValue)>::new(move |key: JsValue| {
        let next = key_to_string(&key).ok();
        debug!(account = next.as_deref().unwrap_or("-"), "wallet account changed");
        wallet.public_key.try_set(next);
    });

    for (event, handler) in [("disconnect", on_disconnect), ("accountChanged", on_account)] {
        let args = Array::of2(&JsValue::from_str(event), handler.as_ref());
        match method(&provider, "on").and_then(|on| on.apply(&provider, &args).map_err(js_err)) {
            // The provider keeps the handler for the page's lifetime.
            Ok(_) => handler.forget(),
            Err(e) => debug!(event, error = %e, "wallet events unavailable"),
        }
    }
}

#[component]
pub fn WalletButton() -> impl IntoView {
    let wallet = expect_context::<WalletState>();

    // Reconnect silently on load if the user connected before
    create_effect(move |_| {
        watch_provider(wallet);

        let remembered = LocalStorage::get::<bool>(AUTOCONNECT_KEY).unwrap_or(false);
        if !remembered || !has_provider() {
            return;
        }
        spawn_local(async move {
            match connect(true).await {
                Ok(address) => {
                    info!(wallet = %address, "wallet reconnected");
                    wallet.public_key.try_set(Some(address));
                }
                Err(e) => {
                    debug!(error = %e, "trusted reconnect skipped");
                    LocalStorage::delete(AUTOCONNECT_KEY);
                }
            }
        });
    });

    let on_connect = move |_| {
        wallet.connecting.set(true);
        spawn_local(async move {
            match connect(false).await {
                Ok(address) => {
                    info!(wallet = %address, "wallet connected");
                    if let Err(e) = LocalStorage::set(AUTOCONNECT_KEY, true) {
                        warn!(error = %e, "could not remember wallet");
                    }
                    wallet.public_key.try_set(Some(address));
                }
                Err(e) => warn!(error = %e, "wallet connect failed"),
            }
            wallet.connecting.try_set(false);
        });
    };

    let on_disconnect = move |_| {
        LocalStorage::delete(AUTOCONNECT_KEY);
        wallet.public_key.set(None);
        spawn_local(async move {
            if let Err(e) = disconnect().await {
                warn!(error = %e, "wallet disconnect failed");
            }
        });
    };

    view! {
        <div class="wallet-bar">
            {move || match wallet.public_key.get() {
                Some(address) => view! {
                    <button class="wallet-btn connected" title=address.clone() on:click=on_disconnect>
                        {short_address(&address)}
                    </button>
                }.into_view(),
                None if !has_provider() => view! {
                    <a class="wallet-btn" href=INSTALL_URL target="_blank" rel="noopener">
                        "Install a Solana wallet"
                    </a>
                }.into_view(),
                None => view! {
                    <button class="wallet-btn" disabled=move || wallet.connecting.get() on:click=on_connect>
                        {move || if wallet.connecting.get() { "Connecting..." } else { "Select Wallet" }}
                    </button>
                }.into_view(),
            }}
        </div>
    }
}
