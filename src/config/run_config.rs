use crate::config::ConfigError;
use crate::engine::EngineConfig;
use crate::series::{DateWindow, Span, Universes};
use crate::strategy::{
    BollingerParams, BollingerStrategy, BollingerTouchParams, BollingerTouchStrategy,
    BollingerTrendParams, BollingerTrendStrategy, CusumParams,
    CusumStrategy, EmaSlopeParams, EmaSlopeStrategy, MaCrossParams, MaCrossStrategy, MaTrendParams,
    MaTrendStrategy, Strategy, ZScoreParams, ZScoreStrategy,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

//a strategy and its parameters, tagged by name in json
//e.g. {"strategy": "zscore", "window": 20}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategySpec {
    MaCross(MaCrossParams),
    EmaSlope(EmaSlopeParams),
    MaTrend(MaTrendParams),
    Bollinger(BollingerParams),
    BollingerTrend(BollingerTrendParams),
    BollingerTouch(BollingerTouchParams),
    #[serde(rename = "zscore")]
    ZScore(ZScoreParams),
    Cusum(CusumParams),
}

impl StrategySpec {
    //every variant with default parameters
    pub fn all() -> Vec<StrategySpec> {
        vec![
            StrategySpec::MaCross(MaCrossParams::default()),
            StrategySpec::EmaSlope(EmaSlopeParams::default()),
            StrategySpec::MaTrend(MaTrendParams::default()),
            StrategySpec::Bollinger(BollingerParams::default()),
            StrategySpec::BollingerTrend(BollingerTrendParams::default()),
            StrategySpec::BollingerTouch(BollingerTouchParams::default()),
            StrategySpec::ZScore(ZScoreParams::default()),
            StrategySpec::Cusum(CusumParams::default()),
        ]
    }

    //parse strategy by name with default parameters
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let spec = match s.trim().to_lowercase().as_str() {
            "ma_cross" | "ma_1" => StrategySpec::MaCross(MaCrossParams::default()),
            "ema_slope" | "ma_2" => StrategySpec::EmaSlope(EmaSlopeParams::default()),
            "ma_trend" | "ma_3" => StrategySpec::MaTrend(MaTrendParams::default()),
            "sta" => StrategySpec::MaTrend(MaTrendParams::all_rising()),
            "bollinger" | "bb1" => StrategySpec::Bollinger(BollingerParams::default()),
            "bollinger_trend" | "bb_ma_1" => {
                StrategySpec::BollingerTrend(BollingerTrendParams::default())
            }
            "bollinger_touch" | "bb_1" => {
                StrategySpec::BollingerTouch(BollingerTouchParams::default())
            }
            "zscore" | "test_1" => StrategySpec::ZScore(ZScoreParams::default()),
            "cusum" | "gpt_1" => StrategySpec::Cusum(CusumParams::default()),
            _ => return Err(ConfigError::UnknownStrategy(s.to_string())),
        };
        Ok(spec)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::MaCross(_) => "ma_cross",
            StrategySpec::EmaSlope(_) => "ema_slope",
            StrategySpec::MaTrend(_) => "ma_trend",
            StrategySpec::Bollinger(_) => "bollinger",
            StrategySpec::BollingerTrend(_) => "bollinger_trend",
            StrategySpec::BollingerTouch(_) => "bollinger_touch",
            StrategySpec::ZScore(_) => "zscore",
            StrategySpec::Cusum(_) => "cusum",
        }
    }

    //builds a fresh strategy instance
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategySpec::MaCross(p) => Box::new(MaCrossStrategy::new(p.clone())),
            StrategySpec::EmaSlope(p) => Box::new(EmaSlopeStrategy::new(p.clone())),
            StrategySpec::MaTrend(p) => Box::new(MaTrendStrategy::new(p.clone())),
            StrategySpec::Bollinger(p) => Box::new(BollingerStrategy::new(p.clone())),
            StrategySpec::BollingerTrend(p) => Box::new(BollingerTrendStrategy::new(p.clone())),
            StrategySpec::BollingerTouch(p) => Box::new(BollingerTouchStrategy::new(p.clone())),
            StrategySpec::ZScore(p) => Box::new(ZScoreStrategy::new(p.clone())),
            StrategySpec::Cusum(p) => Box::new(CusumStrategy::new(p.clone())),
        }
    }
}

//optional output files, one pair per strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    //directory for <strategy>_equity.csv and <strategy>_trades.csv
    pub output_dir: Option<PathBuf>,
}

impl OutputConfig {
    pub fn equity_path(&self, strategy: &str) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_equity.csv", strategy)))
    }

    pub fn trades_path(&self, strategy: &str) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_trades.csv", strategy)))
    }
}

//complete runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    //universe member such as "l1", or a raw ticker
    pub symbol: String,
    //bar size in minutes
    pub timeframe: u32,

    //date window, single tickers only; the whole file when start_year is absent
    pub start_year: Option<i32>,
    pub start_month: u32,
    pub duration: Option<String>,

    //chain every ticker of the symbol's universe
    pub stitch: bool,

    //cleaned csv directory
    pub data_dir: PathBuf,
    pub universes: Universes,

    pub engine: EngineConfig,
    pub strategies: Vec<StrategySpec>,
    pub outputs: OutputConfig,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        RunConfiguration {
            symbol: "l1".to_string(),
            timeframe: 1,
            start_year: None,
            start_month: 1,
            duration: Some("1".to_string()),
            stitch: false,
            data_dir: PathBuf::from("data/clean"),
            universes: Universes::default(),
            engine: EngineConfig::default(),
            strategies: vec![StrategySpec::ZScore(ZScoreParams::default())],
            outputs: OutputConfig::default(),
        }
    }
}

impl RunConfiguration {
    //the configured date window, if any
    pub fn window(&self) -> Result<Option<DateWindow>, ConfigError> {
        let Some(year) = self.start_year else {
            return Ok(None);
        };
        let span = self.duration.as_deref().map(Span::parse).transpose()?;
        DateWindow::from_start(year, self.start_month, span).map(Some)
    }

    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read run config {:?}", path))?;
        let config: RunConfiguration = serde_json::from_str(&contents)
            .context(format!("Invalid run config {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
