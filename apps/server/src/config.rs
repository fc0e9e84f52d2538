use std::env;

/// One watched fund: its exchange code and the shared Drive folder its
/// issuer publishes holdings snapshots into.
#[derive(Clone, Debug, PartialEq)]
pub struct FundFolder {
    pub code: String,
    pub folder_url: String,
}

pub struct Config {
    pub listen_addr: String,
    pub cache_dir: String,
    pub funds: Vec<FundFolder>,
}

impl Config {
    pub fn from_env() -> Self {
        let listen_addr =
            env::var("ETFWATCH_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let cache_dir =
            env::var("ETFWATCH_CACHE_DIR").unwrap_or_else(|_| "etf_data_cache".to_string());
        let funds = env::var("ETFWATCH_FUNDS")
            .ok()
            .map(|raw| parse_fund_list(&raw))
            .filter(|funds| !funds.is_empty())
            .unwrap_or_else(default_funds);

        Self {
            listen_addr,
            cache_dir,
            funds,
        }
    }
}

/// Parse `ETFWATCH_FUNDS`, a comma-separated list of `code=folder_url`
/// pairs. Malformed entries are dropped.
fn parse_fund_list(raw: &str) -> Vec<FundFolder> {
    raw.split(',')
        .filter_map(|entry| {
            let (code, url) = entry.split_once('=')?;
            let code = code.trim();
            let url = url.trim();
            if code.is_empty() || url.is_empty() {
                return None;
            }
            Some(FundFolder {
                code: code.to_string(),
                folder_url: url.to_string(),
            })
        })
        .collect()
}

/// The actively managed Taiwan ETFs watched out of the box.
fn default_funds() -> Vec<FundFolder> {
    [
        (
            "00981A",
            "https://drive.google.com/drive/folders/1mK6gf2kYPA2Mkh-JqG5J197nJQ8KONOd",
        ),
        (
            "00980A",
            "https://drive.google.com/drive/folders/1OpCjYlQJaO6nE0PTpddXz8AmXN3-hEZF",
        ),
        (
            "00982A",
            "https://drive.google.com/drive/folders/1moHqmiJdPLxfaH7jJjYd_WFRN2fbgwla",
        ),
        (
            "00985A",
            "https://drive.google.com/drive/folders/1DAK6cKsIAKRPB7gjgTrjZ5K9rqXKdhH8",
        ),
    ]
    .into_iter()
    .map(|(code, url)| FundFolder {
        code: code.to_string(),
        folder_url: url.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_list_parses_pairs_and_drops_garbage() {
        let funds = parse_fund_list("0050=https://example.com/a, bad-entry ,0056=https://example.com/b");
        assert_eq!(
            funds,
            vec![
                FundFolder {
                    code: "0050".to_string(),
                    folder_url: "https://example.com/a".to_string(),
                },
                FundFolder {
                    code: "0056".to_string(),
                    folder_url: "https://example.com/b".to_string(),
                },
            ]
        );
    }

    #[test]
    fn default_catalog_is_non_empty() {
        assert!(!default_funds().is_empty());
    }
}
