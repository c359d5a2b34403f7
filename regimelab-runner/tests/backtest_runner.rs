//! End-to-end runner tests: determinism, trade ledger invariants, and the
//! walk-forward protocol over synthetic data.

use regimelab_runner::{
    run_backtest, run_walk_forward, synthetic, BacktestConfig, WalkForwardConfig,
};

fn wf_config() -> WalkForwardConfig {
    WalkForwardConfig {
        train_bars: 1000,
        test_bars: 500,
    }
}

#[test]
fn backtest_is_deterministic_end_to_end() {
    let bars = synthetic::random_walk(3000, 1234);
    let config = BacktestConfig::default();

    let first = run_backtest(&bars, &config).unwrap();
    let second = run_backtest(&bars, &config).unwrap();

    assert_eq!(first.trades, second.trades);
    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.final_capital, second.final_capital);
}

#[test]
fn trade_ledger_invariants_hold() {
    // Whatever trades the pipeline takes on random data, each must be
    // well-formed: positive size, stop away from entry, finite PnL, and a
    // holding period within the time-exit bound.
    let config = BacktestConfig::default();
    for seed in [7, 21, 99] {
        let bars = synthetic::random_walk(4000, seed);
        let result = run_backtest(&bars, &config).unwrap();

        for trade in &result.trades {
            assert!(trade.size_lots > 0.0, "zero-size trade emitted");
            assert!(
                (trade.entry_price - trade.exit_price).is_finite(),
                "non-finite prices"
            );
            assert!(trade.pnl.is_finite());
            assert!(trade.entry_time < trade.exit_time);
            assert!(trade.bars_held <= config.max_holding_bars + 1);
        }
        for equity in &result.equity_curve {
            assert!(equity.is_finite());
        }
    }
}

#[test]
fn trending_and_ranging_data_both_complete() {
    let config = BacktestConfig::default();
    let trending = synthetic::trending(3000, 5, 0.0003);
    let ranging = synthetic::random_walk(3000, 5);

    let trend_result = run_backtest(&trending, &config).unwrap();
    let range_result = run_backtest(&ranging, &config).unwrap();

    assert_eq!(trend_result.bar_count, 3000);
    assert_eq!(range_result.bar_count, 3000);
    assert!(trend_result.metrics.max_drawdown >= 0.0);
    assert!(range_result.metrics.max_drawdown >= 0.0);
}

#[test]
fn walk_forward_is_deterministic_despite_parallelism() {
    let bars = synthetic::random_walk(4000, 77);
    let backtest = BacktestConfig::default();
    let config = wf_config();

    let first = run_walk_forward(&bars, &backtest, &config).unwrap();
    let second = run_walk_forward(&bars, &backtest, &config).unwrap();

    assert_eq!(first.windows.len(), second.windows.len());
    assert_eq!(first.aggregate, second.aggregate);
    for (a, b) in first.windows.iter().zip(&second.windows) {
        assert_eq!(a.metrics, b.metrics);
    }
}

#[test]
fn walk_forward_windows_match_direct_backtests() {
    // Each test window must produce exactly what a standalone backtest on
    // that slice produces: windows share nothing.
    let bars = synthetic::random_walk(3000, 31);
    let backtest = BacktestConfig::default();
    let config = wf_config();

    let result = run_walk_forward(&bars, &backtest, &config).unwrap();
    assert_eq!(result.windows.len(), 4);

    for window in &result.windows {
        let slice = &bars[window.window.test_start..window.window.test_end];
        let direct = run_backtest(slice, &backtest).unwrap();
        assert_eq!(window.metrics, direct.metrics);
    }
}

#[test]
fn walk_forward_aggregate_is_mean_of_windows() {
    let bars = synthetic::random_walk(4000, 13);
    let backtest = BacktestConfig::default();
    let result = run_walk_forward(&bars, &backtest, &wf_config()).unwrap();

    let n = result.windows.len() as f64;
    let mean_win_rate: f64 = result.windows.iter().map(|w| w.metrics.win_rate).sum::<f64>() / n;
    let mean_return: f64 = result
        .windows
        .iter()
        .map(|w| w.metrics.total_return)
        .sum::<f64>()
        / n;

    assert!((result.aggregate.win_rate - mean_win_rate).abs() < 1e-12);
    assert!((result.aggregate.total_return - mean_return).abs() < 1e-12);
}

#[test]
fn export_artifacts_from_a_real_run() {
    let bars = synthetic::random_walk(2000, 3);
    let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("ledger.csv");
    let json_path = dir.path().join("result.json");
    regimelab_runner::export_trades_csv(&csv_path, &result.trades).unwrap();
    regimelab_runner::export_result_json(&json_path, &result).unwrap();

    assert!(csv_path.exists());
    assert!(json_path.exists());
}
