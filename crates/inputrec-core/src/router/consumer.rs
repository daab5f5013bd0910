//! Input consumers: bound sets of input actions that the router switches on and off.

/// Role of a consumer, deciding its priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerKind {
    /// Debug bindings. Always live regardless of the priority watermark.
    Debug,
    /// Ordinary gameplay bindings.
    Gameplay,
    /// UI navigation bindings.
    Ui,
}

impl ConsumerKind {
    pub fn is_always_on(self) -> bool {
        matches!(self, ConsumerKind::Debug)
    }
}

/// Something the router can enable and disable.
pub trait InputConsumer: Send {
    fn name(&self) -> &str;
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
    /// `true` if `action` is bound to this consumer *and* the consumer is enabled.
    fn accepts(&self, action: &str) -> bool;
}

/// A named set of input actions.
///
/// Disabling the set does not forget its bindings; re-enabling resumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    name: String,
    actions: Vec<String>,
    enabled: bool,
}

impl ActionSet {
    /// Creates a disabled action set.
    pub fn new<I, S>(name: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            enabled: false,
        }
    }
}

impl InputConsumer for ActionSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn accepts(&self, action: &str) -> bool {
        self.enabled && self.actions.iter().any(|a| a == action)
    }
}
