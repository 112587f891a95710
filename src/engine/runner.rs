use crate::config::StrategySpec;
use crate::data::Bar;
use crate::engine::backtest::{BacktestEngine, BacktestResult, EngineConfig};
use crate::metrics::EquityPoint;
use crate::portfolio::ClosedTrade;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;

//runs every strategy over the same bars, each with its own engine
//results come back in the order of `specs`
pub fn run_strategies(bars: &[Bar], specs: &[StrategySpec], config: &EngineConfig) -> Vec<BacktestResult> {
    specs
        .par_iter()
        .map(|spec| {
            let mut strategy = spec.build();
            let mut engine = BacktestEngine::new(config.clone(), bars);
            engine.run(strategy.as_mut())
        })
        .collect()
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}

pub fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).context(format!("Failed to create {:?}", path))?;
    for point in equity_curve {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_trades_csv(trades: &[ClosedTrade], path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).context(format!("Failed to create {:?}", path))?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}
