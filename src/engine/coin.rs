//! Outcome sources for the coin.
//!
//! The engine never reaches for an ambient RNG. It draws from whatever
//! `CoinSource` it was built with: a `FairCoin` over a caller-supplied
//! generator in production, or a `ScriptedCoin` when a test or demo
//! needs to force the landing side.

use rand::Rng;
use std::collections::VecDeque;

use crate::types::Side;

/// Something that can produce the side a flipped coin lands on.
pub trait CoinSource: Send {
    fn draw(&mut self) -> Side;
}

/// Uniform 50/50 coin over any random-number generator.
#[derive(Debug, Clone)]
pub struct FairCoin<R> {
    rng: R,
}

impl<R: Rng + Send> FairCoin<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> CoinSource for FairCoin<R> {
    fn draw(&mut self) -> Side {
        if self.rng.gen_bool(0.5) {
            Side::Head
        } else {
            Side::Tail
        }
    }
}

/// Replays a fixed sequence of sides, wrapping around when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedCoin {
    script: VecDeque<Side>,
}

impl ScriptedCoin {
    /// Panics on an empty script: a coin with no faces cannot land.
    pub fn new(sides: impl IntoIterator<Item = Side>) -> Self {
        let script: VecDeque<Side> = sides.into_iter().collect();
        assert!(!script.is_empty(), "ScriptedCoin needs at least one side");
        Self { script }
    }

    /// Always lands on `side`.
    pub fn always(side: Side) -> Self {
        Self::new([side])
    }
}

impl CoinSource for ScriptedCoin {
    fn draw(&mut self) -> Side {
        let side = self.script[0];
        self.script.rotate_left(1);
        side
    }
}

impl<C: CoinSource + ?Sized> CoinSource for Box<C> {
    fn draw(&mut self) -> Side {
        (**self).draw()
    }
}
