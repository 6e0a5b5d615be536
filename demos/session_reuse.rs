use std::time::Duration;

use congestion_scraper::{CongestionRequest, CongestionService, SessionManager};
use tower::ServiceExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info,congestion_scraper=debug")
        .init();

    let mut manager = SessionManager::from_env()
        .expect("FITEASY_EMAIL と FITEASY_PASSWORD を設定してください");
    let target = manager.config().default_target.clone();

    println!("=== セッション継続機能のデモ ===");

    println!("\n1. 初回データ取得（ログインが実行される）:");
    println!("結果: {:?}", manager.fetch_one(&target).await.expect("設定エラー"));

    println!("\n2. 2回目のデータ取得（セッション再利用）:");
    println!("結果: {:?}", manager.fetch_one(&target).await.expect("設定エラー"));

    println!("\n3. セッション状態:");
    println!("セッション有効: {}", manager.is_session_valid());
    println!("ログイン時刻: {:?}", manager.login_time());

    println!("\n4. 複数店舗の情報取得:");
    // 実際の店舗名に合わせて追加
    let stores = [target.as_str()];
    for result in manager.fetch_many(&stores).await.expect("設定エラー") {
        println!("  {:?}", result);
    }

    println!("\n=== tower::Service 経由での複数リクエスト ===");
    let service = CongestionService::new(manager);
    for i in 0..3 {
        println!("\n--- リクエスト {} ---", i + 1);
        let results = service
            .clone()
            .oneshot(CongestionRequest::single(target.clone()))
            .await
            .expect("service call");
        for result in &results {
            match result.outcome() {
                Ok(level) => println!("成功: {} = {}", result.target_name(), level),
                Err(e) => println!("エラー: {}", e),
            }
        }
        if service.is_session_valid().await {
            println!("✓ 既存セッションを再利用");
        }

        if i < 2 {
            println!("3秒待機...");
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
    }
}
