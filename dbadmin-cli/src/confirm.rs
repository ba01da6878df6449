//! Confirmation gate for destructive mutations.
//!
//! `Closed --request--> Open(target) --confirm--> Closed` (target released as
//! a [`Confirmed`] token) or `Open --cancel--> Closed` (target dropped).
//! A [`Confirmed`] value can only be produced by confirming an open gate.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState<T> {
    Closed,
    Open { pending: T },
}

/// Proof that the operator confirmed `T`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed<T>(T);

impl<T> Confirmed<T> {
    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationGate<T> {
    state: GateState<T>,
}

impl<T> Default for ConfirmationGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConfirmationGate<T> {
    pub fn new() -> Self {
        Self {
            state: GateState::Closed,
        }
    }

    pub fn state(&self) -> &GateState<T> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, GateState::Open { .. })
    }

    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            GateState::Open { pending } => Some(pending),
            GateState::Closed => None,
        }
    }

    /// Open the gate for `target`, replacing any target already pending
    pub fn request(&mut self, target: T) {
        self.state = GateState::Open { pending: target };
    }

    /// Close the gate without releasing anything
    pub fn cancel(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::Open { pending } => Some(pending),
            GateState::Closed => None,
        }
    }

    /// Close the gate and release the pending target; `None` when closed
    pub fn confirm(&mut self) -> Option<Confirmed<T>> {
        match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::Open { pending } => Some(Confirmed(pending)),
            GateState::Closed => None,
        }
    }
}
