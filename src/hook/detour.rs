//! Default [Patcher] that looks up functions with the dynamic loader and
//! patches them with an inline detour.
use super::{HookError, Patcher, Redirect};

/// Finds modules that are already loaded in the process and redirects their
/// functions with an inline jump.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetourPatcher;

#[cfg(unix)]
impl Patcher for DetourPatcher {
    type Module = libloading::os::unix::Library;

    fn load_module(&self, name: &str) -> Result<Self::Module, HookError> {
        // Only look at modules the host has loaded, never load a new one
        let flags = libloading::os::unix::RTLD_NOW | nix::libc::RTLD_NOLOAD;
        // SAFETY: with RTLD_NOLOAD no initializers are run
        let module = unsafe { libloading::os::unix::Library::open(Some(name), flags) };
        module.map_err(|e| {
            log::debug!("Unable to open {name}: {e}");
            HookError::ModuleNotFound(name.to_string())
        })
    }

    fn resolve_symbol(&self, module: &Self::Module, name: &str) -> Result<*const (), HookError> {
        // SAFETY: only the address is read, nothing is called through it
        let symbol = unsafe { module.get::<*const ()>(name.as_bytes()) };
        match symbol {
            Ok(symbol) => Ok(*symbol),
            Err(e) => {
                log::debug!("Unable to resolve {name}: {e}");
                Err(HookError::SymbolNotFound(name.to_string()))
            }
        }
    }

    unsafe fn redirect(
        &self,
        target: *const (),
        shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError> {
        inline::redirect(target, shim)
    }
}

#[cfg(all(unix, any(target_arch = "x86", target_arch = "x86_64")))]
mod inline {
    use retour::RawDetour;

    use super::{HookError, Redirect};

    struct InlineRedirect {
        detour: RawDetour,
    }

    // SAFETY: the detour only holds addresses of code and its trampoline,
    // which are valid from any thread.
    unsafe impl Send for InlineRedirect {}
    unsafe impl Sync for InlineRedirect {}

    impl Redirect for InlineRedirect {
        fn original(&self) -> *const () {
            self.detour.trampoline() as *const ()
        }

        unsafe fn enable(&self) -> Result<(), HookError> {
            self.detour
                .enable()
                .map_err(|e| HookError::PatchRejected(e.to_string()))
        }

        unsafe fn disable(&self) -> Result<(), HookError> {
            self.detour
                .disable()
                .map_err(|e| HookError::PatchRejected(e.to_string()))
        }
    }

    pub unsafe fn redirect(
        target: *const (),
        shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError> {
        let detour =
            RawDetour::new(target, shim).map_err(|e| HookError::PatchRejected(e.to_string()))?;
        Ok(Box::new(InlineRedirect { detour }))
    }
}

#[cfg(all(unix, not(any(target_arch = "x86", target_arch = "x86_64"))))]
mod inline {
    use super::{HookError, Redirect};

    pub unsafe fn redirect(
        _target: *const (),
        _shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError> {
        Err(HookError::PatchRejected(format!(
            "inline hooks are not supported on {}",
            std::env::consts::ARCH
        )))
    }
}

#[cfg(not(unix))]
impl Patcher for DetourPatcher {
    type Module = ();

    fn load_module(&self, name: &str) -> Result<Self::Module, HookError> {
        Err(HookError::ModuleNotFound(name.to_string()))
    }

    fn resolve_symbol(&self, _module: &Self::Module, name: &str) -> Result<*const (), HookError> {
        Err(HookError::SymbolNotFound(name.to_string()))
    }

    unsafe fn redirect(
        &self,
        _target: *const (),
        _shim: *const (),
    ) -> Result<Box<dyn Redirect>, HookError> {
        Err(HookError::PatchRejected(
            "inline hooks are not supported on this platform".to_string(),
        ))
    }
}
