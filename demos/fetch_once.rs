use congestion_scraper::SessionManager;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter("info,congestion_scraper=debug")
        .init();

    // 環境変数（または .env）から認証情報を取得
    let mut manager = match SessionManager::from_env() {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| manager.config().default_target.clone());

    let result = match manager.fetch_one(&target).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    match result.outcome() {
        Ok(level) => println!("{}: 混雑レベル {}", result.target_name(), level),
        Err(e) => eprintln!("{}: エラー {}", result.target_name(), e),
    }
    println!("{}", serde_json::to_string(&result).expect("serialize result"));
}
