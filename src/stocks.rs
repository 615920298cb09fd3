use std::collections::HashMap;

use serde_json::Value;

use crate::json::{entries, pick_f64, pick_string, pick_u64};

/// Name, price and benefit caches keyed by the catalog's own string id.
///
/// Loaded once; price refreshes only touch `prices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockCatalog {
    pub names: HashMap<String, String>,
    pub prices: HashMap<String, f64>,
    pub benefits: HashMap<String, String>,
    /// (id, name) sorted by name.
    pub by_name: Vec<(String, String)>,
}

impl StockCatalog {
    pub fn is_loaded(&self) -> bool {
        !self.names.is_empty()
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn price(&self, id: &str) -> Option<f64> {
        self.prices.get(id).copied()
    }

    /// Price-only update; names and ordering are untouched.
    pub fn merge_prices(&mut self, prices: HashMap<String, f64>) -> usize {
        let count = prices.len();
        self.prices.extend(prices);
        count
    }
}

pub fn parse_stock_catalog(value: &Value) -> StockCatalog {
    let mut catalog = StockCatalog::default();
    for (key, stock) in entries(value.get("stocks")) {
        let Some(id) = stock_id(key.as_deref(), stock) else {
            continue;
        };
        if let Some(name) = pick_string(stock, &["name"]) {
            catalog.names.insert(id.clone(), name.clone());
            catalog.by_name.push((id.clone(), name));
        }
        if let Some(price) = pick_f64(stock, &["current_price"]) {
            catalog.prices.insert(id.clone(), price);
        }
        if let Some(benefit) = stock
            .get("benefit")
            .and_then(|b| pick_string(b, &["description"]))
        {
            catalog.benefits.insert(id, benefit);
        }
    }
    catalog
        .by_name
        .sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()));
    catalog
}

pub fn parse_stock_prices(value: &Value) -> HashMap<String, f64> {
    entries(value.get("stocks"))
        .into_iter()
        .filter_map(|(key, stock)| {
            let id = stock_id(key.as_deref(), stock)?;
            Some((id, pick_f64(stock, &["current_price"])?))
        })
        .collect()
}

fn stock_id(key: Option<&str>, stock: &Value) -> Option<String> {
    key.map(str::to_string)
        .or_else(|| pick_u64(stock, &["stock_id", "id"]).map(|id| id.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockHolding {
    pub stock_id: String,
    pub shares: f64,
    pub dividend_ready: bool,
}

/// `total_shares` when present, otherwise the sum over transactions.
pub fn parse_holdings(value: &Value) -> Vec<StockHolding> {
    let mut rows: Vec<StockHolding> = entries(value.get("stocks"))
        .into_iter()
        .filter_map(|(key, stock)| {
            let stock_id = stock_id(key.as_deref(), stock)?;
            let shares = pick_f64(stock, &["total_shares"]).unwrap_or_else(|| {
                entries(stock.get("transactions"))
                    .into_iter()
                    .filter_map(|(_, tx)| pick_f64(tx, &["shares"]))
                    .sum()
            });
            let dividend_ready = stock
                .get("dividend")
                .and_then(|d| pick_u64(d, &["ready"]))
                .is_some_and(|r| r > 0);
            Some(StockHolding {
                stock_id,
                shares,
                dividend_ready,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.stock_id.cmp(&b.stock_id));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRow {
    pub stock_id: String,
    pub name: String,
    pub shares: f64,
    pub price: Option<f64>,
    pub value: Option<f64>,
    pub benefit: Option<String>,
    pub dividend_ready: bool,
}

pub fn portfolio_rows(holdings: &[StockHolding], catalog: &StockCatalog) -> Vec<PortfolioRow> {
    holdings
        .iter()
        .map(|h| {
            let price = catalog.price(&h.stock_id);
            PortfolioRow {
                stock_id: h.stock_id.clone(),
                name: catalog
                    .name(&h.stock_id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Stock #{}", h.stock_id)),
                shares: h.shares,
                price,
                value: price.map(|p| p * h.shares),
                benefit: catalog.benefits.get(&h.stock_id).cloned(),
                dividend_ready: h.dividend_ready,
            }
        })
        .collect()
}

pub fn portfolio_total(rows: &[PortfolioRow]) -> f64 {
    rows.iter().filter_map(|r| r.value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_merge_keeps_names() {
        let mut catalog = parse_stock_catalog(&json!({"stocks": {
            "2": {"name": "Bravo", "current_price": 10.0},
            "1": {"name": "alpha", "current_price": 5.0}
        }}));
        assert_eq!(catalog.by_name[0].1, "alpha");
        let updated = parse_stock_prices(&json!({"stocks": {"1": {"current_price": 7.5}}}));
        catalog.merge_prices(updated);
        assert_eq!(catalog.price("1"), Some(7.5));
        assert_eq!(catalog.price("2"), Some(10.0));
        assert_eq!(catalog.name("1"), Some("alpha"));
    }

    #[test]
    fn holdings_fall_back_to_transactions() {
        let holdings = parse_holdings(&json!({"stocks": {
            "4": {"transactions": {"a": {"shares": 100}, "b": {"shares": 50}}},
            "5": {"total_shares": 10, "dividend": {"ready": 1}}
        }}));
        assert_eq!(holdings[0].shares, 150.0);
        assert!(holdings[1].dividend_ready);
    }
}
