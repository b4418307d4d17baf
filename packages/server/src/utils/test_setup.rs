use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // テスト出力にログを混ぜる。二重初期化は無視
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
