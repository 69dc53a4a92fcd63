const KEYS: &[&str] = &[
    "PRESALE_API_URL",
    "FIREBASE_API_KEY",
    "FIREBASE_AUTH_DOMAIN",
    "FIREBASE_PROJECT_ID",
    "FIREBASE_STORAGE_BUCKET",
    "FIREBASE_SENDER_ID",
    "FIREBASE_APP_ID",
];

fn main() {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    println!("cargo:rerun-if-changed=.env");

    for key in KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
        if let Ok(val) = std::env::var(key) {
            println!("cargo:rustc-env={}={}", key, val);
        }
    }

    if std::env::var("PRESALE_API_URL").is_err() {
        println!("cargo:warning=PRESALE_API_URL not found in .env or environment");
    }
}
