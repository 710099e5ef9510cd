use tokio_util::sync::CancellationToken;

/// Scope of decode work belonging to one session.
///
/// Superseding the scope cancels every task spawned under it and bumps the
/// generation, so results that already left their task are rejected on receipt.
#[derive(Debug)]
pub struct DecodeScope {
    generation: u64,
    token: CancellationToken,
}

impl DecodeScope {
    pub fn new() -> Self {
        Self {
            generation: 0,
            token: CancellationToken::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token handed to a spawned task. Cancelled when the scope is superseded.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && !self.token.is_cancelled()
    }

    pub fn supersede(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.generation += 1;
    }
}

impl Default for DecodeScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DecodeScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
