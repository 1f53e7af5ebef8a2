//! End-to-end backtest scenarios.

use std::collections::BTreeMap;

use anyhow::Result;
use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use replay_backtest::{BacktestSimulator, Ledger};
use replay_core::{
    Action, BacktestConfig, Bar, CombinedBar, CrossoverConfig, Error, OrderIntent,
    OrderRejection, Ticker, Timestamp,
};
use replay_feed::InMemorySource;
use replay_strategy::{MovingAverageCrossover, SignalDirection, Strategy};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ts(i: usize) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

fn tickers(names: &[&str]) -> Vec<Ticker> {
    names.iter().map(|s| s.to_string()).collect()
}

fn config(capital: f64, names: &[&str]) -> BacktestConfig {
    BacktestConfig {
        initial_capital: capital,
        tickers: tickers(names),
        ..Default::default()
    }
}

fn series(closes: &[f64]) -> Vec<(Timestamp, Bar)> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| (ts(i), Bar::from_close(close)))
        .collect()
}

fn timeline(ticker: &str, closes: &[f64]) -> Vec<CombinedBar> {
    series(closes)
        .into_iter()
        .map(|(t, bar)| CombinedBar::new(t).with_bar(ticker, bar))
        .collect()
}

/// Emits a fixed list of intents per step.
struct Scripted {
    step: usize,
    script: BTreeMap<usize, Vec<OrderIntent>>,
}

impl Scripted {
    fn new(script: Vec<(usize, Vec<OrderIntent>)>) -> Self {
        Self {
            step: 0,
            script: script.into_iter().collect(),
        }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_bar(&mut self, _bar: &CombinedBar) -> Vec<OrderIntent> {
        let intents = self.script.get(&self.step).cloned().unwrap_or_default();
        self.step += 1;
        intents
    }
}

const RISE_THEN_DECLINE: [f64; 14] = [
    10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 13.0, 14.0, 15.0, 16.0, 14.0, 12.0, 10.0, 8.0,
];

#[test]
fn ledger_buy_then_sell() -> Result<()> {
    let mut ledger = Ledger::new(10_000.0)?;

    ledger.buy("X", 5, 100.0)?;
    assert_abs_diff_eq!(ledger.cash(), 9_500.0);
    assert_eq!(ledger.position("X"), 5);

    ledger.sell("X", 3, 110.0)?;
    assert_abs_diff_eq!(ledger.cash(), 9_830.0);
    assert_eq!(ledger.position("X"), 2);

    let closes = BTreeMap::from([("X".to_string(), 110.0)]);
    assert_abs_diff_eq!(ledger.total_value(&closes), 10_050.0);
    Ok(())
}

#[test]
fn ledger_rejects_unaffordable_buy() -> Result<()> {
    let mut ledger = Ledger::new(100.0)?;

    let rejection = ledger.buy("X", 5, 30.0).unwrap_err();
    assert!(matches!(rejection, OrderRejection::InsufficientCash { .. }));
    assert_abs_diff_eq!(ledger.cash(), 100.0);
    assert_eq!(ledger.position("X"), 0);
    Ok(())
}

#[test]
fn crossover_backtest_from_source() -> Result<()> {
    init_tracing();

    let source = InMemorySource::new().with_series("X", series(&RISE_THEN_DECLINE));
    let sim = BacktestSimulator::new(config(10_000.0, &["X"]))?;
    let strategy_config = CrossoverConfig {
        short_window: 3,
        long_window: 5,
        quantity: 5,
    };
    let mut strategy = MovingAverageCrossover::new(strategy_config, &tickers(&["X"]))?;

    let run = sim.run_from_source(&mut strategy, &source)?;

    assert_eq!(run.snapshots().len(), RISE_THEN_DECLINE.len());
    let trades: Vec<(Timestamp, Action, f64)> = run
        .executions()
        .iter()
        .map(|e| (e.timestamp, e.action, e.price))
        .collect();
    assert_eq!(
        trades,
        vec![(ts(5), Action::Buy, 12.0), (ts(11), Action::Sell, 12.0)]
    );
    assert_eq!(strategy.last_signal("X"), SignalDirection::Bearish);

    // Held 5 shares from step 5 through step 10.
    let held = run.history().position_series("X");
    assert_eq!(held[4], 0);
    assert!(held[5..11].iter().all(|&q| q == 5));
    assert_eq!(held[11], 0);

    // Round trip at the same price.
    let summary = run.summary();
    assert_abs_diff_eq!(summary.cash, 10_000.0);
    assert_abs_diff_eq!(summary.delta, 0.0);

    let peak = run.snapshots()[9].total_value;
    assert_abs_diff_eq!(peak, 9_940.0 + 5.0 * 16.0);
    Ok(())
}

#[test]
fn crossover_respects_date_range() -> Result<()> {
    let source = InMemorySource::new().with_series("X", series(&RISE_THEN_DECLINE));
    let sim = BacktestSimulator::new(BacktestConfig {
        start: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
        ..config(10_000.0, &["X"])
    })?;
    let mut strategy = MovingAverageCrossover::new(
        CrossoverConfig {
            short_window: 3,
            long_window: 5,
            quantity: 5,
        },
        &tickers(&["X"]),
    )?;

    let run = sim.run_from_source(&mut strategy, &source)?;

    // Four bars never fill a five-bar window.
    assert_eq!(run.snapshots().len(), 4);
    assert!(run.executions().is_empty());
    assert!(run.rejections().is_empty());
    Ok(())
}

#[test]
fn empty_source_refuses_to_run() -> Result<()> {
    let source = InMemorySource::new().with_series("X", series(&[1.0, 2.0]));
    let sim = BacktestSimulator::new(config(1_000.0, &["Y"]))?;
    let mut strategy = MovingAverageCrossover::new(CrossoverConfig::default(), &tickers(&["Y"]))?;

    let err = sim.run_from_source(&mut strategy, &source).unwrap_err();
    assert!(matches!(err, Error::Data(_)));
    Ok(())
}

#[test]
fn intents_apply_sequentially_within_a_step() -> Result<()> {
    init_tracing();

    let bars = vec![
        CombinedBar::new(ts(0))
            .with_bar("A", Bar::from_close(10.0))
            .with_bar("B", Bar::from_close(20.0)),
        CombinedBar::new(ts(1))
            .with_bar("A", Bar::from_close(10.0))
            .with_bar("B", Bar::from_close(20.0)),
    ];
    let sim = BacktestSimulator::new(config(100.0, &["A", "B"]))?;

    // Spend all cash on A, then in one step sell A before buying B.
    let mut sell_first = Scripted::new(vec![
        (0, vec![OrderIntent::buy("A", 10)?]),
        (1, vec![OrderIntent::sell("A", 10)?, OrderIntent::buy("B", 5)?]),
    ]);
    let run = sim.run(&mut sell_first, bars.clone())?;
    assert_eq!(run.executions().len(), 3);
    assert!(run.rejections().is_empty());
    assert_eq!(run.ledger().position("B"), 5);
    assert_abs_diff_eq!(run.ledger().cash(), 0.0);

    // Same intents, reversed: the buy sees no cash yet.
    let mut buy_first = Scripted::new(vec![
        (0, vec![OrderIntent::buy("A", 10)?]),
        (1, vec![OrderIntent::buy("B", 5)?, OrderIntent::sell("A", 10)?]),
    ]);
    let run = sim.run(&mut buy_first, bars)?;
    assert_eq!(run.executions().len(), 2);
    assert_eq!(run.rejections().len(), 1);
    assert_eq!(run.rejections()[0].intent.ticker, "B");
    assert_eq!(run.ledger().position("B"), 0);
    assert_abs_diff_eq!(run.ledger().cash(), 100.0);
    Ok(())
}

#[test]
fn missing_price_policy() -> Result<()> {
    let bars = vec![
        CombinedBar::new(ts(0))
            .with_bar("A", Bar::from_close(10.0))
            .with_bar("B", Bar::from_close(20.0)),
        // B has no bar on day 1.
        CombinedBar::new(ts(1)).with_bar("A", Bar::from_close(11.0)),
    ];
    let sim = BacktestSimulator::new(config(1_000.0, &["A", "B"]))?;
    let mut strategy = Scripted::new(vec![
        (0, vec![OrderIntent::buy("B", 10)?]),
        (1, vec![OrderIntent::sell("B", 5)?]),
    ]);

    let run = sim.run(&mut strategy, bars)?;

    let rejection = &run.rejections()[0];
    assert_eq!(rejection.timestamp, ts(1));
    assert!(matches!(rejection.reason, OrderRejection::MissingPrice { .. }));
    assert_eq!(run.ledger().position("B"), 10);

    // Unpriced holdings contribute nothing to the step's total value.
    let snapshot = &run.snapshots()[1];
    assert_abs_diff_eq!(snapshot.cash, 800.0);
    assert_abs_diff_eq!(snapshot.total_value, 800.0);

    // The final summary values B at its last observed close.
    let summary = run.summary();
    assert_abs_diff_eq!(summary.total_value, 1_000.0);
    assert_abs_diff_eq!(summary.positions[1].last_close, 20.0);
    Ok(())
}

#[test]
fn replay_is_deterministic() -> Result<()> {
    let closes = [
        50.0, 51.0, 49.0, 48.0, 52.0, 55.0, 53.0, 50.0, 47.0, 45.0, 49.0, 54.0, 58.0, 57.0,
    ];
    let bars: Vec<CombinedBar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            CombinedBar::new(ts(i))
                .with_bar("A", Bar::from_close(c))
                .with_bar("B", Bar::from_close(100.0 - c))
        })
        .collect();

    let sim = BacktestSimulator::new(config(5_000.0, &["A", "B"]))?;
    let crossover = CrossoverConfig {
        short_window: 2,
        long_window: 4,
        quantity: 10,
    };

    let mut first = MovingAverageCrossover::new(crossover, &tickers(&["A", "B"]))?;
    let mut second = MovingAverageCrossover::new(crossover, &tickers(&["A", "B"]))?;
    let run1 = sim.run(&mut first, bars.clone())?;
    let run2 = sim.run(&mut second, bars)?;

    assert_eq!(run1.snapshots(), run2.snapshots());
    assert_eq!(run1.executions(), run2.executions());
    assert!(!run1.executions().is_empty());
    Ok(())
}

#[test]
fn independent_runs_in_parallel() -> Result<()> {
    let bars = timeline("X", &RISE_THEN_DECLINE);
    let sim = BacktestSimulator::new(config(1_000.0, &["X"]))?;
    let crossover = CrossoverConfig {
        short_window: 3,
        long_window: 5,
        quantity: 2,
    };

    // Each thread owns its strategy; each run builds its own ledger.
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bars = bars.clone();
                let sim = &sim;
                scope.spawn(move || -> replay_core::Result<_> {
                    let mut strategy = MovingAverageCrossover::new(crossover, &tickers(&["X"]))?;
                    Ok(sim.run(&mut strategy, bars)?.snapshots().to_vec())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("run thread panicked"))
            .collect()
    });

    let first = results[0].as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
    for result in &results[1..] {
        let snapshots = result.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
        assert_eq!(snapshots, first);
    }
    Ok(())
}

#[test]
fn metrics_and_summary_serialize() -> Result<()> {
    let sim = BacktestSimulator::new(config(1_000.0, &["X"]))?;
    let mut strategy = MovingAverageCrossover::new(
        CrossoverConfig {
            short_window: 3,
            long_window: 5,
            quantity: 10,
        },
        &tickers(&["X"]),
    )?;

    let run = sim.run(&mut strategy, timeline("X", &RISE_THEN_DECLINE))?;
    let metrics = run.metrics();

    assert_eq!(metrics.steps, RISE_THEN_DECLINE.len());
    assert_eq!(metrics.buys, 1);
    assert_eq!(metrics.sells, 1);
    assert_eq!(metrics.rejected, 0);
    // Bought 10 @ 12, peaked at 16, sold at 12.
    assert_abs_diff_eq!(metrics.max_drawdown, 40.0);
    assert_abs_diff_eq!(metrics.net_pnl, 0.0);

    let json = serde_json::to_value(run.summary())?;
    assert_eq!(json["initial_capital"], 1_000.0);
    Ok(())
}
