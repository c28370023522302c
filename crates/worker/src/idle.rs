/// Reports whether the host is idle enough to run deferred work.
pub trait IdleProbe: Send + Sync + 'static {
	fn is_idle(&self) -> bool;
}

/// Probe for hosts without a busy signal; always reports idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysIdle;

impl IdleProbe for AlwaysIdle {
	fn is_idle(&self) -> bool {
		true
	}
}
