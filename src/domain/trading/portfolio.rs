use crate::domain::trading::position::Position;
use serde::{Deserialize, Serialize};

/// Ordered collection of positions, at most one per ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    positions: Vec<Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions in the order they were first bought.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn tickers(&self) -> Vec<String> {
        self.positions
            .iter()
            .map(|p| p.ticker().to_string())
            .collect()
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker() == ticker)
    }

    pub fn position_mut(&mut self, ticker: &str) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.ticker() == ticker)
    }

    /// Existing position for `ticker`, or a new empty one appended at the end.
    pub fn position_or_insert(&mut self, ticker: &str) -> &mut Position {
        let idx = match self.positions.iter().position(|p| p.ticker() == ticker) {
            Some(idx) => idx,
            None => {
                self.positions.push(Position::new(ticker));
                self.positions.len() - 1
            }
        };
        &mut self.positions[idx]
    }

    /// Insert a fully built position (snapshot restore). Replaces any
    /// position already held for the same ticker.
    pub fn insert(&mut self, position: Position) {
        match self.position_mut(position.ticker()) {
            Some(existing) => *existing = position,
            None => self.positions.push(position),
        }
    }

    pub fn remove(&mut self, ticker: &str) -> Option<Position> {
        let idx = self.positions.iter().position(|p| p.ticker() == ticker)?;
        Some(self.positions.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
