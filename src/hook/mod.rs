//! Redirects an exported function of an already loaded library to a shim,
//! while keeping the original implementation callable.
pub mod detour;

#[cfg(test)]
mod hook_test;

use std::{
    any::Any,
    mem::size_of,
    sync::atomic::{AtomicBool, Ordering},
};

use thiserror::Error;

use crate::config::HookConfig;

/// Possible errors installing a hook. None of these are fatal to the plugin,
/// translation simply stays inactive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Module '{0}' is not loaded")]
    ModuleNotFound(String),
    #[error("Symbol '{0}' not found")]
    SymbolNotFound(String),
    #[error("Unable to redirect target: {0}")]
    PatchRejected(String),
    #[error("Invalid module or symbol name: '{0}'")]
    InvalidName(String),
}

/// An installed code redirect. The original implementation stays callable
/// through [Redirect::original] for as long as the redirect exists.
pub trait Redirect: Send + Sync {
    /// Address that calls the original implementation
    fn original(&self) -> *const ();

    /// Start sending calls to the target to the shim.
    ///
    /// # Safety
    /// Patches executable code that other threads may be running.
    unsafe fn enable(&self) -> Result<(), HookError>;

    /// Restore the target.
    ///
    /// # Safety
    /// Patches executable code that other threads may be running.
    unsafe fn disable(&self) -> Result<(), HookError>;
}

/// Capability to find functions in loaded modules and redirect them
pub trait Patcher {
    /// Keeps a module loaded while it is held
    type Module: Send + Sync + 'static;

    fn load_module(&self, name: &str) -> Result<Self::Module, HookError>;
    fn resolve_symbol(&self, module: &Self::Module, name: &str) -> Result<*const (), HookError>;

    /// Build a redirect from `target` to `shim`. The redirect starts out
    /// disabled.
    ///
    /// # Safety
    /// `target` and `shim` must be functions with the same signature.
    unsafe fn redirect(
        &self,
        target: *const (),
        shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError>;
}

/// Redirect from an original function to a shim of type `F`, which must be a
/// function pointer type.
pub struct HookBinding<F: Copy> {
    symbol: String,
    target: usize,
    original: F,
    redirect: Box<dyn Redirect>,
    enabled: AtomicBool,
    _module: Box<dyn Any + Send + Sync>,
}

impl<F: Copy> HookBinding<F> {
    /// Resolve the configured symbol and build a redirect to the given shim
    /// without enabling it. The original is callable as soon as this returns.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the signature of the
    /// configured symbol.
    pub unsafe fn prepare<P: Patcher>(
        patcher: &P,
        config: &HookConfig,
        shim: F,
    ) -> Result<Self, HookError> {
        if size_of::<F>() != size_of::<*const ()>() {
            return Err(HookError::PatchRejected(
                "shim is not a function pointer".to_string(),
            ));
        }
        validate_name(&config.module)?;
        validate_name(&config.symbol)?;

        let module = patcher.load_module(&config.module)?;
        let target = patcher.resolve_symbol(&module, &config.symbol)?;
        if target.is_null() {
            return Err(HookError::SymbolNotFound(config.symbol.clone()));
        }
        log::debug!("Resolved {} at {target:p}", config.symbol);

        let shim_ptr: *const () = std::mem::transmute_copy(&shim);
        let redirect = patcher.redirect(target, shim_ptr)?;
        let original: F = std::mem::transmute_copy(&redirect.original());

        Ok(Self {
            symbol: config.symbol.clone(),
            target: target as usize,
            original,
            redirect,
            enabled: AtomicBool::new(false),
            _module: Box::new(module),
        })
    }

    /// Prepare and enable a redirect in one step.
    ///
    /// # Safety
    /// See [HookBinding::prepare] and [HookBinding::enable].
    pub unsafe fn install<P: Patcher>(
        patcher: &P,
        config: &HookConfig,
        shim: F,
    ) -> Result<Self, HookError> {
        let binding = Self::prepare(patcher, config, shim)?;
        binding.enable()?;
        Ok(binding)
    }

    /// Start redirecting calls to the shim. Enabling twice does nothing.
    ///
    /// # Safety
    /// The shim must be ready to be called from any thread.
    pub unsafe fn enable(&self) -> Result<(), HookError> {
        if self
            .enabled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        if let Err(e) = self.redirect.enable() {
            self.enabled.store(false, Ordering::Release);
            return Err(e);
        }
        log::info!("Hooked {} at {:#x}", self.symbol, self.target);

        Ok(())
    }

    /// Stop redirecting calls. Errors are logged.
    pub fn release(&self) {
        if !self.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        // SAFETY: the redirect was enabled by this binding, so the target
        // holds our patch and restoring it puts back the original code.
        if let Err(e) = unsafe { self.redirect.disable() } {
            log::warn!("Unable to unhook {}: {e}", self.symbol);
            return;
        }
        log::info!("Unhooked {}", self.symbol);
    }

    /// Returns true while calls are redirected
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Callable original implementation
    pub fn original(&self) -> F {
        self.original
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl<F: Copy> Drop for HookBinding<F> {
    fn drop(&mut self) {
        self.release();
    }
}

fn validate_name(name: &str) -> Result<(), HookError> {
    if name.is_empty() || name.contains('\0') {
        return Err(HookError::InvalidName(name.to_string()));
    }
    Ok(())
}
