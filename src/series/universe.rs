use crate::config::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

//named, ordered ticker lists; a key such as "l3" picks the third member of "l"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Universes(IndexMap<String, Vec<String>>);

//what a symbol key resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub ticker: String,
    //the universe prefix when the key was "<prefix><index>"
    pub universe: Option<String>,
}

impl Default for Universes {
    fn default() -> Self {
        let mut map = IndexMap::new();
        map.insert(
            "s".to_string(),
            to_strings(&["BBAI", "EOSE", "MARA", "RCAT", "RKLB", "SMR", "TMC"]),
        );
        map.insert(
            "l".to_string(),
            to_strings(&["AAPL", "AMD", "GOOG", "MSFT", "NVDA", "PYPL", "TSLA"]),
        );
        map.insert(
            "x".to_string(),
            to_strings(&["X:BTCUSD", "X:ETHUSD", "X:LTCUSD", "X:XRPUSD", "X:BCHUSD"]),
        );
        Universes(map)
    }
}

fn to_strings(tickers: &[&str]) -> Vec<String> {
    tickers.iter().map(|t| t.to_string()).collect()
}

//splits "abc12" into ("abc", 12); anything else is not a universe key
fn split_key(key: &str) -> Option<(&str, usize)> {
    let digits_at = key.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = key.split_at(digits_at);
    if prefix.is_empty()
        || !prefix.chars().all(|c| c.is_ascii_alphabetic())
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok().map(|index| (prefix, index))
}

impl Universes {
    pub fn new() -> Self {
        Universes(IndexMap::new())
    }

    pub fn insert(&mut self, prefix: &str, tickers: Vec<String>) {
        self.0.insert(prefix.to_lowercase(), tickers);
    }

    pub fn get(&self, prefix: &str) -> Option<&[String]> {
        self.0.get(&prefix.to_lowercase()).map(|v| v.as_slice())
    }

    pub fn resolve(&self, key: &str) -> Result<ResolvedSymbol, ConfigError> {
        let key = key.trim();
        let Some((prefix, index)) = split_key(key) else {
            return Ok(ResolvedSymbol {
                ticker: key.to_uppercase(),
                universe: None,
            });
        };

        let prefix = prefix.to_lowercase();
        let members = self
            .get(&prefix)
            .ok_or_else(|| ConfigError::UnknownUniverse(prefix.clone()))?;

        if index == 0 || index > members.len() {
            return Err(ConfigError::UniverseIndex {
                prefix,
                index,
                len: members.len(),
            });
        }

        Ok(ResolvedSymbol {
            ticker: members[index - 1].clone(),
            universe: Some(prefix),
        })
    }
}
