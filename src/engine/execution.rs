use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

//order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    //converts to quantity sign (Buy = +1, Sell = -1)
    pub fn to_qty_sign(&self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

//how much to trade: whole units, or a fraction of available equity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSize {
    Units(u64),
    Fraction(f64),
}

impl Default for OrderSize {
    fn default() -> Self {
        OrderSize::Fraction(0.9999)
    }
}

//what a strategy asks for on one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderRequest {
    Buy(OrderSize),
    Sell(OrderSize),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    Entry { side: OrderSide, size: OrderSize },
    CloseAll,
}

//represents a trading order waiting for its fill price
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub placed_at: NaiveDateTime,
    pub kind: OrderKind,
}

//represents a filled order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub order_id: u64,
    pub timestamp: NaiveDateTime,
    pub qty: i64, //signed: positive buys, negative sells
    pub fill_price: f64,
    pub fees: f64,
}

//per-share plus proportional commission, charged on every fill
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Commission {
    pub per_share: f64,
    pub rate: f64,
}

impl Commission {
    pub fn fee(&self, qty: i64, price: f64) -> f64 {
        let units = qty.unsigned_abs() as f64;
        units * self.per_share + units * price * self.rate
    }

    //cost of one unit including its commission
    pub fn unit_cost(&self, price: f64) -> f64 {
        price + self.per_share + price * self.rate
    }
}

//order book of one run
//with exclusive orders a new entry cancels everything pending and closes open trades first
pub struct ExecutionEngine {
    next_order_id: u64,
    pending_orders: Vec<Order>,
    exclusive: bool,
}

impl ExecutionEngine {
    pub fn new(exclusive: bool) -> Self {
        ExecutionEngine {
            next_order_id: 1,
            pending_orders: Vec::new(),
            exclusive,
        }
    }

    fn push(&mut self, placed_at: NaiveDateTime, kind: OrderKind) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        self.pending_orders.push(Order { id, placed_at, kind });
        id
    }

    //queues one strategy request and returns its order id
    pub fn submit(&mut self, placed_at: NaiveDateTime, request: OrderRequest) -> u64 {
        let kind = match request {
            OrderRequest::Buy(size) => OrderKind::Entry {
                side: OrderSide::Buy,
                size,
            },
            OrderRequest::Sell(size) => OrderKind::Entry {
                side: OrderSide::Sell,
                size,
            },
            OrderRequest::Close => OrderKind::CloseAll,
        };

        if self.exclusive {
            if let OrderKind::Entry { .. } = kind {
                self.pending_orders.clear();
                self.push(placed_at, OrderKind::CloseAll);
            }
        }
        self.push(placed_at, kind)
    }

    //hands the queued orders to the caller, oldest first
    pub fn take_pending(&mut self) -> Vec<Order> {
        std::mem::take(&mut self.pending_orders)
    }

    //returns the number of pending orders
    pub fn pending_order_count(&self) -> usize {
        self.pending_orders.len()
    }

    //cancels all pending orders
    pub fn cancel_all_orders(&mut self) -> usize {
        let cancelled = self.pending_orders.len();
        self.pending_orders.clear();
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn exclusive_entry_replaces_pending_orders() {
        let mut engine = ExecutionEngine::new(true);
        engine.submit(now(), OrderRequest::Close);
        engine.submit(now(), OrderRequest::Sell(OrderSize::Units(3)));
        engine.submit(now(), OrderRequest::Buy(OrderSize::Units(5)));

        let orders = engine.take_pending();
        let kinds: Vec<OrderKind> = orders.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OrderKind::CloseAll,
                OrderKind::Entry {
                    side: OrderSide::Buy,
                    size: OrderSize::Units(5)
                }
            ]
        );
        assert_eq!(engine.pending_order_count(), 0);
    }

    #[test]
    fn non_exclusive_keeps_every_order() {
        let mut engine = ExecutionEngine::new(false);
        engine.submit(now(), OrderRequest::Buy(OrderSize::Units(1)));
        engine.submit(now(), OrderRequest::Sell(OrderSize::Units(1)));
        assert_eq!(engine.pending_order_count(), 2);
        assert_eq!(engine.cancel_all_orders(), 2);
    }

    #[test]
    fn commission_model() {
        let c = Commission {
            per_share: 0.01,
            rate: 0.001,
        };
        assert!((c.fee(-100, 50.0) - (1.0 + 5.0)).abs() < 1e-9);
        assert!((c.unit_cost(50.0) - 50.06).abs() < 1e-9);
        assert_eq!(Commission::default().fee(10, 10.0), 0.0);
    }
}
