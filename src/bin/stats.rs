#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::anyhow;
    use presale_view::api::parse_body;
    use presale_view::model::{buy_button_label, PresaleSnapshot, StatsLines};
    use tracing::{info, Level};

    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let base = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PRESALE_API_URL").ok())
        .ok_or_else(|| anyhow!("Usage: presale-stats <API_URL>"))?;
    let url = format!("{}/presale-data", base.trim_end_matches('/'));

    info!(%url, "fetching presale stats");
    let resp = reqwest::get(&url).await?;
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let snapshot: PresaleSnapshot = parse_body(status, &text)?;

    let lines = StatsLines::from(&snapshot);
    println!("{}", lines.phase);
    println!("{}", lines.sold);
    println!("{}", lines.collected);
    println!("1 SOL -> {}", buy_button_label(Some(1.0), Some(&snapshot)));

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
