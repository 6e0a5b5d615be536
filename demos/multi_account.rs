use congestion_scraper::{Credentials, PortalConfig, SessionManager};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 環境変数から認証情報を取得（JSON形式）
    // 例: FITEASY_ACCOUNTS='[{"email":"a@example.com","password":"pass1","store":"イオンタウン弥富店"}]'
    let accounts_json = std::env::var("FITEASY_ACCOUNTS")
        .expect("FITEASY_ACCOUNTS environment variable not set");

    let accounts: Vec<serde_json::Value> = serde_json::from_str(&accounts_json)
        .expect("Failed to parse FITEASY_ACCOUNTS JSON");

    println!("=== Congestion Scraper Multi-Account Test ===\n");

    // アカウントごとに独立した SessionManager を使う
    let mut handles = Vec::new();
    for (i, account) in accounts.into_iter().enumerate() {
        let email = account["email"].as_str().expect("email not found").to_string();
        let password = account["password"].as_str().expect("password not found").to_string();
        let store = account["store"].as_str().map(str::to_string);

        handles.push(tokio::spawn(async move {
            let credentials = match Credentials::new(&email, password) {
                Ok(c) => c,
                Err(e) => return format!("--- Account {}: {} ---\n✗ {}", i + 1, email, e),
            };
            let config = PortalConfig::default();
            let target = store.unwrap_or_else(|| config.default_target.clone());
            let mut manager = match SessionManager::new(credentials, config) {
                Ok(m) => m,
                Err(e) => return format!("--- Account {}: {} ---\n✗ {}", i + 1, email, e),
            };
            match manager.fetch_one(&target).await {
                Ok(result) => match result.outcome() {
                    Ok(level) => format!("--- Account {}: {} ---\n✓ {} = {}", i + 1, email, target, level),
                    Err(e) => format!("--- Account {}: {} ---\n✗ {}", i + 1, email, e),
                },
                Err(e) => format!("--- Account {}: {} ---\n✗ {}", i + 1, email, e),
            }
        }));
    }

    for handle in handles {
        match handle.await {
            Ok(line) => println!("{}\n", line),
            Err(e) => eprintln!("task failed: {}", e),
        }
    }

    println!("=== テスト完了 ===");
}
