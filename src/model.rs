use serde::{Deserialize, Serialize};

/// Tokens per SOL for each presale phase.
pub const PHASE_RATES: [u64; 3] = [1_000_000, 600_000, 450_000];

/// Token amounts in the feed are base units with 9 decimals.
pub const TOKEN_BASE: f64 = 1e9;

pub const MIN_SOL_AMOUNT: f64 = 0.1;
pub const SOL_AMOUNT_STEP: f64 = 0.1;
pub const DEFAULT_SOL_AMOUNT: &str = "1";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PresaleSnapshot {
    pub phase: u32,
    pub sold: f64,
    pub collected: f64,
}

impl PresaleSnapshot {
    pub fn rate(&self) -> Option<u64> {
        rate_for_phase(self.phase)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub user: String,
    pub sol: f64,
    pub tokens: u64,
}

/// The amount as submitted: a number when the input parses, otherwise the
/// input text unchanged. Validation is left to the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SolAmount {
    Number(f64),
    Raw(String),
}

impl SolAmount {
    pub fn from_input(raw: &str) -> Self {
        match parse_sol_amount(raw) {
            Some(value) => SolAmount::Number(value),
            None => SolAmount::Raw(raw.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_wallet: String,
    pub sol_amount: SolAmount,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub tx_signature: Option<String>,
}

pub fn rate_for_phase(phase: u32) -> Option<u64> {
    PHASE_RATES.get(phase as usize).copied()
}

/// Tokens shown on the buy button. Zero before a snapshot has loaded,
/// `None` when the phase has no rate.
pub fn estimated_tokens(sol_amount: f64, snapshot: Option<&PresaleSnapshot>) -> Option<f64> {
    match snapshot {
        None => Some(0.0),
        Some(s) => s.rate().map(|rate| sol_amount * rate as f64),
    }
}

/// Parses the raw amount input. Range is left to the backend.
pub fn parse_sol_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `en-US` style grouping with at most three fraction digits.
pub fn format_grouped(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    // Scaling huge values would overflow; they have no fraction digits anyway.
    let scaled = value * 1000.0;
    let rounded = if scaled.is_finite() { scaled.round() / 1000.0 } else { value };
    let negative = rounded < 0.0;
    let plain = format!("{}", rounded.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

pub fn format_plain(value: f64) -> String {
    format!("{}", value)
}

/// First 4 and last 4 characters of an address. Short input overlaps.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    let edge = chars.len().min(4);
    let head: String = chars[..edge].iter().collect();
    let tail: String = chars[chars.len() - edge..].iter().collect();
    format!("{}…{}", head, tail)
}

pub fn tokens_from_base_units(base_units: u64) -> f64 {
    base_units as f64 / TOKEN_BASE
}

/// Text lines of the stats panel.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsLines {
    pub phase: String,
    pub sold: String,
    pub collected: String,
}

impl From<&PresaleSnapshot> for StatsLines {
    fn from(s: &PresaleSnapshot) -> Self {
        Self {
            phase: format!("Presale Phase {}", s.phase as u64 + 1),
            sold: format!("Tokens Sold: {}", format_grouped(s.sold)),
            collected: format!("SOL Collected: {}", format_plain(s.collected)),
        }
    }
}

/// One rendered row of the recent purchases list.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRow {
    pub user: String,
    pub sol: String,
    pub tokens: String,
}

impl From<&TransactionRecord> for TransactionRow {
    fn from(tx: &TransactionRecord) -> Self {
        Self {
            user: short_address(&tx.user),
            sol: format_plain(tx.sol),
            tokens: format_grouped(tokens_from_base_units(tx.tokens)),
        }
    }
}

pub fn buy_button_label(sol_amount: Option<f64>, snapshot: Option<&PresaleSnapshot>) -> String {
    let estimate = match sol_amount {
        Some(amount) => estimated_tokens(amount, snapshot),
        None => snapshot.map_or(Some(0.0), |_| None),
    };
    match estimate {
        Some(tokens) => format!("Buy Tokens ({} tokens)", format_plain(tokens)),
        None => "Buy Tokens (? tokens)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(phase: u32) -> PresaleSnapshot {
        PresaleSnapshot { phase, sold: 0.0, collected: 0.0 }
    }

    #[test]
    fn stats_panel_lines() {
        let s = PresaleSnapshot { phase: 0, sold: 500_000.0, collected: 120.5 };
        let lines = StatsLines::from(&s);
        assert_eq!(lines.phase, "Presale Phase 1");
        assert_eq!(lines.sold, "Tokens Sold: 500,000");
        assert_eq!(lines.collected, "SOL Collected: 120.5");
    }

    #[test]
    fn estimate_per_phase() {
        assert_eq!(estimated_tokens(2.0, Some(&snapshot(0))), Some(2_000_000.0));
        assert_eq!(estimated_tokens(2.0, Some(&snapshot(1))), Some(1_200_000.0));
        assert_eq!(estimated_tokens(2.0, Some(&snapshot(2))), Some(900_000.0));
    }

    #[test]
    fn estimate_is_zero_before_snapshot() {
        assert_eq!(estimated_tokens(2.0, None), Some(0.0));
        assert_eq!(estimated_tokens(1234.5, None), Some(0.0));
    }

    #[test]
    fn estimate_undefined_past_last_phase() {
        assert_eq!(estimated_tokens(2.0, Some(&snapshot(3))), None);
        assert_eq!(buy_button_label(Some(2.0), Some(&snapshot(7))), "Buy Tokens (? tokens)");
    }

    #[test]
    fn button_label() {
        assert_eq!(buy_button_label(Some(1.5), Some(&snapshot(1))), "Buy Tokens (900000 tokens)");
        assert_eq!(buy_button_label(Some(3.0), None), "Buy Tokens (0 tokens)");
    }

    #[test]
    fn transaction_row_scales_and_truncates() {
        let tx = TransactionRecord { user: "Addr1111".into(), sol: 1.0, tokens: 1_000_000_000 };
        let row = TransactionRow::from(&tx);
        assert_eq!(row.user, "Addr…1111");
        assert_eq!(row.tokens, "1");
        assert_eq!(row.sol, "1");

        let tx = TransactionRecord {
            user: "Addr9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb1111".into(),
            sol: 0.25,
            tokens: 250_000_000_000_000,
        };
        let row = TransactionRow::from(&tx);
        assert_eq!(row.user, "Addr…1111");
        assert_eq!(row.tokens, "250,000");
        assert_eq!(row.sol, "0.25");
    }

    #[test]
    fn short_address_overlaps_on_short_input() {
        assert_eq!(short_address("abc"), "abc…abc");
        assert_eq!(short_address(""), "…");
        assert_eq!(short_address("Addr01111"), "Addr…1111");
    }

    #[test]
    fn grouping_matches_locale_output() {
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1000.0), "1,000");
        assert_eq!(format_grouped(1_234_567.891_2), "1,234,567.891");
        assert_eq!(format_grouped(-45_000.5), "-45,000.5");
        assert_eq!(format_grouped(0.000_1), "0");
    }

    #[test]
    fn grouping_survives_values_near_f64_max() {
        let out = format_grouped(1e306);
        assert!(out.starts_with("1,000,000"));
        assert!(!out.contains('∞'));
        assert!(!out.contains('.'));
        assert_eq!(out.matches(',').count(), 102);

        assert!(format_grouped(-f64::MAX).starts_with("-179,769,313"));
    }

    #[test]
    fn parses_amount_input() {
        assert_eq!(parse_sol_amount(" 0.1 "), Some(0.1));
        assert_eq!(parse_sol_amount("0.05"), Some(0.05));
        assert_eq!(parse_sol_amount(""), None);
        assert_eq!(parse_sol_amount("abc"), None);
        assert_eq!(parse_sol_amount("inf"), None);
    }

    #[test]
    fn purchase_payloads_use_camel_case() {
        let req = PurchaseRequest { user_wallet: "W".into(), sol_amount: SolAmount::from_input("1.5") };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({ "userWallet": "W", "solAmount": 1.5 })
        );

        let req = PurchaseRequest { user_wallet: "W".into(), sol_amount: SolAmount::from_input("1..2") };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({ "userWallet": "W", "solAmount": "1..2" })
        );

        let res: PurchaseResult =
            serde_json::from_str(r#"{"success":true,"txSignature":"abc"}"#).unwrap();
        assert_eq!(res.tx_signature.as_deref(), Some("abc"));

        let res: PurchaseResult = serde_json::from_str("{}").unwrap();
        assert!(!res.success);
    }
}
