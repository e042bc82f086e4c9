//! Position ledger — the single owner of all open positions.
//!
//! Policies never hold a `Position` beyond one decision call; they query the
//! ledger, act through the executor primitives, and the ledger is updated as
//! a side effect.

use crate::domain::{Position, PositionId, PositionTag};

/// Open positions in insertion order.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: Vec<Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn ids(&self) -> Vec<PositionId> {
        self.positions.iter().map(|p| p.id).collect()
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Record a freshly minted position.
    pub fn insert(&mut self, position: Position) {
        debug_assert!(position.lower_price < position.upper_price);
        self.positions.push(position);
    }

    /// Oldest open position (insertion order), if any.
    pub fn first(&self) -> Option<&Position> {
        self.positions.first()
    }

    /// Most recently opened position, if any.
    pub fn last(&self) -> Option<&Position> {
        self.positions.last()
    }

    /// Position with the lowest lower bound.
    pub fn lowest(&self) -> Option<&Position> {
        self.positions
            .iter()
            .min_by(|a, b| a.lower_price.total_cmp(&b.lower_price))
    }

    /// Position with the highest lower bound.
    pub fn highest(&self) -> Option<&Position> {
        self.positions
            .iter()
            .max_by(|a, b| a.lower_price.total_cmp(&b.lower_price))
    }

    /// Middle position when sorted by lower bound — the active block of a
    /// ladder layout.
    pub fn middle(&self) -> Option<&Position> {
        if self.positions.is_empty() {
            return None;
        }
        let mut sorted: Vec<&Position> = self.positions.iter().collect();
        sorted.sort_by(|a, b| a.lower_price.total_cmp(&b.lower_price));
        Some(sorted[(sorted.len() - 1) / 2])
    }

    /// Widest open range (upper − lower), used for charting overlapped sets.
    pub fn widest(&self) -> Option<&Position> {
        self.positions.iter().max_by(|a, b| {
            (a.upper_price - a.lower_price).total_cmp(&(b.upper_price - b.lower_price))
        })
    }

    /// Reduce a position's liquidity after a partial withdrawal. The position
    /// must retain some liquidity — zero-liquidity positions are removed via
    /// [`PositionLedger::remove`] instead.
    pub fn reduce(&mut self, id: PositionId, burned: u128) -> Option<&Position> {
        let pos = self.positions.iter_mut().find(|p| p.id == id)?;
        debug_assert!(burned < pos.liquidity, "full withdrawals must use remove()");
        pos.liquidity = pos.liquidity.saturating_sub(burned);
        Some(pos)
    }

    /// Drop a fully withdrawn position.
    pub fn remove(&mut self, id: PositionId) -> Option<Position> {
        let index = self.positions.iter().position(|p| p.id == id)?;
        Some(self.positions.remove(index))
    }

    /// Symmetric range tag of a position, if it was opened with one.
    pub fn range_tag(&self, id: PositionId) -> Option<f64> {
        match self.get(id)?.tag {
            Some(PositionTag::Range(pct)) => Some(pct),
            _ => None,
        }
    }
}
