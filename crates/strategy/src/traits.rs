//! Strategy contract.

use replay_core::{CombinedBar, OrderIntent};

/// A pluggable trading strategy.
///
/// The simulator calls [`on_bar`](Strategy::on_bar) exactly once per step with
/// every ticker's bar at that timestamp. A strategy never touches the ledger;
/// it only returns intents, which the simulator applies in the order given.
///
/// Implementations may keep internal state between calls but must be
/// deterministic: replaying the same bars yields the same intents.
pub trait Strategy {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Consume one combined bar and return zero or more order intents.
    fn on_bar(&mut self, bar: &CombinedBar) -> Vec<OrderIntent>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_bar(&mut self, bar: &CombinedBar) -> Vec<OrderIntent> {
        (**self).on_bar(bar)
    }
}
